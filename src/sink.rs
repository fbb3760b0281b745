//! Sink resolution: where the generated document ends up.
//!
//! A destination string is classified into an [`OutputSpec`] before anything
//! is generated, then [`SinkResolver::save`] persists the content. A failed
//! cloud save never falls back to a local write; the caller decides.

use crate::cloud::{self, CloudError, CloudKind, CloudLink, CloudStorage};
use crate::error::{InputError, WriteError};
use crate::source::expand_home;
use regex::Regex;
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};

const MAX_TITLE_LEN: usize = 80;

static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#\s+(.+)$").expect("valid regex"));
static TITLE_JUNK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Classified destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSpec {
    LocalDirectory(PathBuf),
    CloudDocumentTarget,
    CloudFolderTarget(String),
}

impl OutputSpec {
    /// Classifies a raw destination string. Empty means the current directory.
    pub fn classify(raw: &str) -> Result<Self, InputError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(OutputSpec::LocalDirectory(PathBuf::from(".")));
        }
        if trimmed.eq_ignore_ascii_case("docs") || cloud::is_docs_url(trimmed) {
            return Ok(OutputSpec::CloudDocumentTarget);
        }
        if cloud::is_google_url(trimmed) {
            return match CloudLink::parse(trimmed) {
                Some(CloudLink { id, kind: CloudKind::Folder }) => Ok(OutputSpec::CloudFolderTarget(id)),
                _ => Err(InputError::UnsupportedDestination {
                    destination: trimmed.to_string(),
                }),
            };
        }
        Ok(OutputSpec::LocalDirectory(expand_home(trimmed)))
    }
}

impl fmt::Display for OutputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSpec::LocalDirectory(path) => write!(f, "{}", path.display()),
            OutputSpec::CloudDocumentTarget => write!(f, "new Google Doc"),
            OutputSpec::CloudFolderTarget(id) => write!(f, "Google Drive folder {}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    Local,
    Cloud,
}

/// Where a document was saved: an absolute path or a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedLocation {
    pub descriptor: String,
    pub kind: LocationKind,
}

/// Title from the first `# ` heading of Markdown `content`, cleaned for use
/// as a document or file title.
pub fn extract_title(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let caps = HEADING.captures(line.trim())?;
        let title = TITLE_JUNK.replace_all(&caps[1], "");
        let title = SPACES.replace_all(&title, " ");
        let title: String = title.trim().chars().take(MAX_TITLE_LEN).collect();
        let title = title.trim_end().to_string();
        (!title.is_empty()).then_some(title)
    })
}

/// Persists generated content to a classified destination.
pub struct SinkResolver<'a> {
    cloud: Option<&'a dyn CloudStorage>,
}

impl<'a> SinkResolver<'a> {
    pub fn new(cloud: Option<&'a dyn CloudStorage>) -> Self {
        Self { cloud }
    }

    pub async fn save(
        &self,
        content: &str,
        dest: &OutputSpec,
        suggested_name: &str,
    ) -> Result<SavedLocation, WriteError> {
        debug!("Saving {} characters to {}", content.chars().count(), dest);
        match dest {
            OutputSpec::LocalDirectory(dir) => save_local(content, dir, suggested_name),
            OutputSpec::CloudDocumentTarget => {
                let cloud = self.cloud()?;
                let title = extract_title(content).unwrap_or_else(|| suggested_name.to_string());
                let url = cloud
                    .create_document(&title, content)
                    .await
                    .map_err(write_error)?;
                Ok(SavedLocation {
                    descriptor: url,
                    kind: LocationKind::Cloud,
                })
            }
            OutputSpec::CloudFolderTarget(folder_id) => {
                let cloud = self.cloud()?;
                let staged = stage_upload(content, suggested_name)?;
                let url = cloud
                    .upload_file(folder_id, staged.path())
                    .await
                    .map_err(write_error)?;
                // Dropping `staged` removes the temporary directory.
                Ok(SavedLocation {
                    descriptor: url,
                    kind: LocationKind::Cloud,
                })
            }
        }
    }

    fn cloud(&self) -> Result<&'a dyn CloudStorage, WriteError> {
        self.cloud.ok_or_else(|| WriteError::CloudAuthUnavailable {
            reason: "no Google access token found; set DOCDRAFT_GOOGLE_TOKEN or create ~/.docdraft/google_token.json"
                .to_string(),
        })
    }
}

fn write_error(err: CloudError) -> WriteError {
    match err {
        CloudError::Unauthorized { .. } => WriteError::CloudAuthUnavailable {
            reason: err.to_string(),
        },
        CloudError::Forbidden(message) => WriteError::CloudPermissionDenied { message },
        CloudError::NotUtf8 => WriteError::CloudWriteFailure {
            message: err.to_string(),
        },
        CloudError::Request(message) => WriteError::CloudWriteFailure { message },
    }
}

fn io_write_error(path: &Path, source: std::io::Error) -> WriteError {
    match source.kind() {
        ErrorKind::PermissionDenied => WriteError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => WriteError::Io {
            path: path.to_path_buf(),
            source,
        },
    }
}

fn save_local(content: &str, dir: &Path, suggested_name: &str) -> Result<SavedLocation, WriteError> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| io_write_error(dir, e))?;
        info!("Created output directory {}", dir.display());
    }

    let path = dir.join(format!("{}.md", suggested_name));
    fs::write(&path, content).map_err(|e| io_write_error(&path, e))?;

    let absolute = path.canonicalize().map_err(|e| io_write_error(&path, e))?;
    info!("Saved document to {}", absolute.display());
    Ok(SavedLocation {
        descriptor: absolute.display().to_string(),
        kind: LocationKind::Local,
    })
}

/// A temporary file holding content bound for upload, named after the
/// document so the uploaded file keeps a sensible name.
struct StagedUpload {
    _dir: tempfile::TempDir,
    path: PathBuf,
}

impl StagedUpload {
    fn path(&self) -> &Path {
        &self.path
    }
}

fn stage_upload(content: &str, suggested_name: &str) -> Result<StagedUpload, WriteError> {
    let dir = tempfile::Builder::new()
        .prefix("docdraft-")
        .tempdir()
        .map_err(|e| io_write_error(&std::env::temp_dir(), e))?;
    let path = dir.path().join(format!("{}.md", suggested_name));

    let mut file = fs::File::create(&path).map_err(|e| io_write_error(&path, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| io_write_error(&path, e))?;
    debug!("Staged upload at {}", path.display());

    Ok(StagedUpload { _dir: dir, path })
}
