//! Prompt assembly.
//!
//! [`build`] is a pure function: the same [`GenerationRequest`] always
//! yields the same prompt text.

use crate::error::InputError;

pub const DEFAULT_STYLE: &str = "Professional, clear, and engaging writing style.";
pub const DEFAULT_AUDIENCE: &str = "general public";
pub const DEFAULT_DOC_TYPE: &str = "article";
pub const DEFAULT_SIZE: &str = "2 pages";

const FORMAT_INSTRUCTIONS: &str = "\
FORMAT: Use Markdown formatting:
- Use # for the main title (only once at the beginning)
- Use ## for major section headings
- Use ### for subsection headings
- Use **bold** and *italic* sparingly for emphasis
- Use bullet points with - and numbered lists with 1., 2., 3.";

const HUMAN_VOICE_INSTRUCTIONS: &str = "\
WRITE LIKE A PERSON, NOT A MODEL:

Avoid:
- Generic openings (\"In today's world...\", \"In an era of...\")
- Piled-up hedging (\"may\", \"might\", \"could potentially\", \"arguably\")
- Formulaic transitions (\"Moreover\", \"Furthermore\", \"In conclusion\")
- Promotional or breathless tone
- Abstract lists with no concrete example behind them
- Announcing what the text is about to do (\"Let's explore...\")
- Commentary about the document itself

Instead:
- Open with substance or a specific observation
- Make confident statements where the material supports them
- Mix short and long sentences
- Use concrete examples, anecdotes and details
- Keep a clear point of view";

/// Everything the prompt is built from.
///
/// `topic_text` is guaranteed non-empty; optional fields fall back to the
/// defaults at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    style_text: String,
    topic_text: String,
    audience: Option<String>,
    doc_type: Option<String>,
    size: Option<String>,
}

impl GenerationRequest {
    pub fn new(style_text: Option<String>, topic_text: String) -> Result<Self, InputError> {
        if topic_text.trim().is_empty() {
            return Err(InputError::MissingTopic);
        }
        let style_text = style_text
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STYLE.to_string());

        Ok(Self {
            style_text,
            topic_text,
            audience: None,
            doc_type: None,
            size: None,
        })
    }

    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    pub fn with_doc_type(mut self, doc_type: Option<String>) -> Self {
        self.doc_type = doc_type;
        self
    }

    pub fn with_size(mut self, size: Option<String>) -> Self {
        self.size = size;
        self
    }

    pub fn style_text(&self) -> &str {
        &self.style_text
    }

    pub fn topic_text(&self) -> &str {
        &self.topic_text
    }

    pub fn audience(&self) -> &str {
        or_default(&self.audience, DEFAULT_AUDIENCE)
    }

    pub fn doc_type(&self) -> &str {
        or_default(&self.doc_type, DEFAULT_DOC_TYPE)
    }

    pub fn size(&self) -> &str {
        or_default(&self.size, DEFAULT_SIZE)
    }
}

fn or_default<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

/// Assembles the instruction sent to the generation service.
pub fn build(req: &GenerationRequest) -> String {
    let doc_type = req.doc_type();
    let audience = req.audience();
    let size = req.size();

    format!(
        "You are a professional content writer asked to generate a draft document: a {doc_type}.

WRITING STYLE & VOICE:
{style}

Study the writing style above before you write. Match its sentence rhythm, \
vocabulary, tone, paragraph structure and its use of examples or metaphors.

TARGET AUDIENCE:
{audience}

TOPIC, INSIGHTS & QUOTES:
{topic}

DOCUMENT REQUIREMENTS:
- Type: {doc_type}
- Length: {size}
- Audience: {audience}

{FORMAT_INSTRUCTIONS}

{HUMAN_VOICE_INSTRUCTIONS}

Write the complete {doc_type} now. It must match the style above, speak to \
{audience}, work in the topic material naturally and run to about {size}.",
        style = req.style_text(),
        topic = req.topic_text(),
    )
}

/// Lowercase, hyphen-separated form of `text` for use in file names.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Base name (without extension) of the saved document.
pub fn suggested_name(req: &GenerationRequest) -> String {
    match slugify(req.doc_type()).as_str() {
        "" => "generated_document".to_string(),
        slug => format!("generated_{}", slug),
    }
}
