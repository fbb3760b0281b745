//! Terminal interaction: the interactive questionnaire, the pre-run summary
//! and the post-run report.
//!
//! Every method has a `_with_io` form taking explicit reader and writer so it
//! can be driven from tests; the plain forms wrap stdin and stdout.

use crate::error::{PipelineError, ReadError};
use crate::llm_generator::{ModelSpec, Provider};
use crate::pipeline::{DocumentRequest, PipelineOutcome};
use crate::prompt::{DEFAULT_AUDIENCE, DEFAULT_DOC_TYPE, DEFAULT_SIZE};
use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Answers gathered in interactive mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractiveAnswers {
    pub model: &'static ModelSpec,
    pub request: DocumentRequest,
}

/// Handles everything the user sees on stdout.
///
/// # Example
///
/// ```no_run
/// use docdraft::draft_ui::DraftUi;
/// use docdraft::llm_generator::{ModelSpec, DEFAULT_MODEL};
///
/// let ui = DraftUi::new(ModelSpec::find(DEFAULT_MODEL)?);
/// let answers = ui.collect_request()?;
/// if ui.confirm()? {
///     println!("generating with {}", answers.model.name);
/// }
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct DraftUi {
    default_model: &'static ModelSpec,
}

impl DraftUi {
    pub fn new(default_model: &'static ModelSpec) -> Self {
        Self { default_model }
    }

    // =========================================================================
    // Core methods with I/O injection (testable)
    // =========================================================================

    /// Asks for every run parameter in turn. Blank answers take the default;
    /// a blank topic is an error since there is nothing to write about.
    pub fn collect_request_with_io<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> Result<InteractiveAnswers> {
        writeln!(output, "\n{}", "=".repeat(60))?;
        writeln!(output, "📝 DOCUMENT GENERATOR")?;
        writeln!(output, "{}", "=".repeat(60))?;
        writeln!(output, "Inputs may be a file path, a Google Docs/Drive link or plain text.")?;

        let model = self.ask_model(input, output)?;
        let style = ask(input, output, "🎨 Writing style (blank for default)", None)?;
        let topic = ask(input, output, "💡 Topic, insights and quotes", None)?;
        if topic.is_empty() {
            return Err(ReadError::EmptyInput.into());
        }
        let audience = ask(input, output, "👥 Target audience", Some(DEFAULT_AUDIENCE))?;
        let doc_type = ask(input, output, "📄 Document type", Some(DEFAULT_DOC_TYPE))?;
        let size = ask(input, output, "📏 Length", Some(DEFAULT_SIZE))?;
        let destination = ask(
            input,
            output,
            "💾 Output (directory, 'docs' or Drive folder link)",
            Some("."),
        )?;

        Ok(InteractiveAnswers {
            model,
            request: DocumentRequest {
                style,
                topic,
                audience: Some(audience),
                doc_type: Some(doc_type),
                size: Some(size),
                output: destination,
            },
        })
    }

    fn ask_model<R: BufRead, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> Result<&'static ModelSpec> {
        loop {
            let key = ask(input, output, "🤖 Model", Some(self.default_model.key))?;
            match ModelSpec::find(&key) {
                Ok(model) => return Ok(model),
                Err(e) => {
                    writeln!(output, "{}", e)?;
                }
            }
        }
    }

    /// Returns true only for an explicit `yes` or `y`.
    pub fn confirm_with_io<R: BufRead, W: Write>(&self, input: &mut R, output: &mut W) -> Result<bool> {
        write!(output, "\nProceed? (yes/no): ")?;
        output.flush()?;

        let mut line = String::new();
        input.read_line(&mut line)?;
        let confirmed = matches!(line.trim().to_lowercase().as_str(), "yes" | "y");
        info!("User {} the run", if confirmed { "confirmed" } else { "cancelled" });
        Ok(confirmed)
    }

    pub fn show_summary_with_io<W: Write>(
        &self,
        generator_name: &str,
        req: &DocumentRequest,
        output: &mut W,
    ) -> Result<()> {
        let or = |value: &Option<String>, default: &'static str| -> String {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        };

        writeln!(output, "\n{}", "-".repeat(60))?;
        writeln!(output, "🤖 Model: {}", generator_name)?;
        writeln!(output, "🎨 Style: {}", describe_input(&req.style, "default style"))?;
        writeln!(output, "💡 Topic: {}", describe_input(&req.topic, "(none)"))?;
        writeln!(output, "👥 Audience: {}", or(&req.audience, DEFAULT_AUDIENCE))?;
        writeln!(output, "📄 Type: {}", or(&req.doc_type, DEFAULT_DOC_TYPE))?;
        writeln!(output, "📏 Length: {}", or(&req.size, DEFAULT_SIZE))?;
        writeln!(output, "💾 Output: {}", describe_input(&req.output, "current directory"))?;
        writeln!(output, "{}", "-".repeat(60))?;
        Ok(())
    }

    pub fn show_outcome_with_io<W: Write>(&self, outcome: &PipelineOutcome, output: &mut W) -> Result<()> {
        writeln!(output, "\n✅ Document generated successfully")?;
        writeln!(output, "📍 Saved to: {}", outcome.location.descriptor)?;
        if let Some(title) = &outcome.title {
            writeln!(output, "🏷️  Title: {}", title)?;
        }
        writeln!(output, "📊 Size: {} characters", outcome.result.character_count)?;
        Ok(())
    }

    /// Reports a failed run. When the document was generated but not saved
    /// the full content is printed so it is not lost.
    pub fn show_failure_with_io<W: Write>(&self, err: &PipelineError, output: &mut W) -> Result<()> {
        writeln!(output, "\n❌ {}", err)?;
        if let Some(content) = err.unsaved_content() {
            writeln!(output, "\n{}", "=".repeat(60))?;
            writeln!(output, "GENERATED CONTENT (copy it before closing this window)")?;
            writeln!(output, "{}", "=".repeat(60))?;
            writeln!(output, "{}", content)?;
            writeln!(output, "{}", "=".repeat(60))?;
        }
        Ok(())
    }

    pub fn show_models_with_io<W: Write>(&self, output: &mut W) -> Result<()> {
        writeln!(output, "Available models:")?;
        for provider in Provider::ALL {
            writeln!(output, "\n{} (needs {}):", provider.display_name(), provider.env_var())?;
            for model in ModelSpec::by_provider(provider) {
                let marker = if model.key == self.default_model.key { " (default)" } else { "" };
                writeln!(output, "  {:<20} {}{}", model.key, model.name, marker)?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Convenience methods using standard I/O
    // =========================================================================

    pub fn collect_request(&self) -> Result<InteractiveAnswers> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        self.collect_request_with_io(&mut input, &mut output)
    }

    pub fn confirm(&self) -> Result<bool> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        self.confirm_with_io(&mut input, &mut output)
    }

    pub fn show_summary(&self, generator_name: &str, req: &DocumentRequest) {
        let _ = self.show_summary_with_io(generator_name, req, &mut io::stdout());
    }

    pub fn show_outcome(&self, outcome: &PipelineOutcome) {
        let _ = self.show_outcome_with_io(outcome, &mut io::stdout());
    }

    pub fn show_failure(&self, err: &PipelineError) -> Result<()> {
        let mut output = io::stdout();
        self.show_failure_with_io(err, &mut output)?;
        output.flush()?;
        Ok(())
    }

    /// Writes content that could not be saved to a fresh file in the system
    /// temp directory and returns its path. The file is never removed.
    pub fn keep_unsaved(&self, content: &str) -> io::Result<PathBuf> {
        keep_unsaved_in(&std::env::temp_dir(), content)
    }

    pub fn show_models(&self) {
        let _ = self.show_models_with_io(&mut io::stdout());
    }
}

/// Reads one trimmed answer. End of input counts as a blank answer.
fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
    default: Option<&str>,
) -> Result<String> {
    match default {
        Some(default) => write!(output, "{} [{}]: ", label, default)?,
        None => write!(output, "{}: ", label)?,
    }
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();
    Ok(match (answer.is_empty(), default) {
        (true, Some(default)) => default.to_string(),
        _ => answer.to_string(),
    })
}

pub fn keep_unsaved_in(dir: &Path, content: &str) -> io::Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("docdraft-unsaved-")
        .suffix(".md")
        .tempfile_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    Ok(path)
}

/// Shortens long literal inputs for display.
fn describe_input(raw: &str, empty: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return empty.to_string();
    }
    let first_line = raw.lines().next().unwrap_or(raw);
    if first_line.chars().count() > 60 || first_line.len() < raw.len() {
        let preview: String = first_line.chars().take(57).collect();
        format!("{}...", preview)
    } else {
        first_line.to_string()
    }
}
