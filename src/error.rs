//! Error taxonomy for the document pipeline.
//!
//! Each stage returns its own error type so callers can tell a bad input
//! apart from a failed read, a failed generation call or a failed save.
//! [`PipelineError`] wraps them for the end-to-end run.

use std::path::PathBuf;
use thiserror::Error;

/// Bad or missing user input detected before any I/O happens.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Topic content is required")]
    MissingTopic,

    #[error("Unknown model '{key}'. Run `docdraft --list-models` to see the available models")]
    UnknownModel { key: String },

    #[error("Unsupported destination '{destination}': use a directory path, 'docs', or a Google Drive folder link")]
    UnsupportedDestination { destination: String },
}

/// Failure while reading a style or topic source.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Input is empty; topic information is required")]
    EmptyInput,

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("File {} is not valid UTF-8 text (convert it to .txt or .md first)", path.display())]
    NotUtf8 { path: PathBuf },

    #[error("Could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Google Drive link given but Google Drive is not configured: {reason}")]
    CloudAuthUnavailable { reason: String },

    #[error("Google Drive folder links cannot be used as input; link a document or file instead")]
    FolderNotReadable,

    #[error("Google Drive file is not valid UTF-8 text (convert it to .txt or .md first)")]
    CloudNotUtf8,

    #[error("Failed to read from Google Drive: {message}")]
    CloudReadFailure { message: String },
}

/// Failure while calling the text-generation service.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("No {provider} API key found. Set {env_var} or run `docdraft --set-api-key <KEY>`")]
    MissingApiKey {
        provider: String,
        env_var: &'static str,
    },

    #[error("{model} returned an error: {message}")]
    Service { model: String, message: String },

    #[error("Request to {model} timed out")]
    Timeout { model: String },
}

/// Failure while persisting generated content.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Permission denied writing to {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("Could not write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Google Drive destination given but Google Drive is not configured: {reason}")]
    CloudAuthUnavailable { reason: String },

    #[error("No write access to the Google Drive destination: {message}")]
    CloudPermissionDenied { message: String },

    #[error("Failed to save to Google Drive: {message}")]
    CloudWriteFailure { message: String },
}

/// Configuration could not be located, read or written.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not find home directory")]
    HomeDirUnavailable,

    #[error("Could not access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid Google token file {}: {message}", path.display())]
    Token { path: PathBuf, message: String },
}

/// End-to-end failure of a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The document was generated but could not be saved. The content is
    /// carried back so the caller can still hand it to the user.
    #[error("Document was generated but NOT saved: {error}")]
    Save {
        #[source]
        error: WriteError,
        content: String,
    },
}

impl PipelineError {
    /// Generated content that did not reach its destination, if any.
    pub fn unsaved_content(&self) -> Option<&str> {
        match self {
            PipelineError::Save { content, .. } => Some(content),
            _ => None,
        }
    }
}
