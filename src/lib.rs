//! Docdraft - drafts documents in a given writing style with a language model.
//!
//! A run takes a writing style and a topic, each of which may be a local
//! file, a Google Docs/Drive link or literal text, asks a language model for
//! a Markdown draft and saves it to a local directory, a new Google Doc or a
//! Google Drive folder.
//!
//! # Architecture
//!
//! - [`source`] - Classifies and reads style/topic inputs
//! - [`prompt`] - Builds the generation prompt from a [`prompt::GenerationRequest`]
//! - [`llm_generator`] - Model catalog and provider clients (Anthropic, OpenAI, Gemini)
//! - [`sink`] - Classifies destinations and saves the result
//! - [`pipeline`] - Runs the stages in order and preserves unsaved content
//! - [`cloud`] - Google Docs/Drive link parsing and REST client
//! - [`http_client`] - HTTP client abstraction shared by the network clients
//! - [`config`] - Configuration file, environment overrides, credentials
//! - [`draft_ui`] - Interactive questionnaire and terminal reports
//! - [`error`] - Error types for each stage
//!
//! # Example
//!
//! ```ignore
//! use docdraft::llm_generator::MockGenerator;
//! use docdraft::pipeline::{DocumentPipeline, DocumentRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = DocumentPipeline::new(Box::new(MockGenerator::new()), None);
//!     let outcome = pipeline
//!         .run(&DocumentRequest {
//!             style: "~/writing/my_voice.md".to_string(),
//!             topic: "Why small teams should write things down".to_string(),
//!             doc_type: Some("blog post".to_string()),
//!             output: "./output".to_string(),
//!             ..DocumentRequest::default()
//!         })
//!         .await?;
//!     println!("saved to {}", outcome.location.descriptor);
//!     Ok(())
//! }
//! ```
//!
//! # Saving to Google
//!
//! Google inputs and destinations need an OAuth access token, taken from
//! `DOCDRAFT_GOOGLE_TOKEN` or the token file (`~/.docdraft/google_token.json`
//! by default). Without one, local inputs and outputs keep working.
//!
//! ```bash
//! docdraft -t notes.md -s ~/style.md --type "blog post" -o docs
//! docdraft -t "https://docs.google.com/document/d/<id>/edit" \
//!          -o "https://drive.google.com/drive/folders/<folder-id>"
//! ```

pub mod cloud;
pub mod config;
pub mod draft_ui;
pub mod error;
pub mod http_client;
pub mod llm_generator;
pub mod pipeline;
pub mod prompt;
pub mod sink;
pub mod source;
