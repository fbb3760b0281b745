//! Google Docs / Drive collaborator.
//!
//! The pipeline only needs four remote operations, captured by
//! [`CloudStorage`]. [`GoogleDrive`] implements them over the REST APIs using
//! a cached OAuth access token; obtaining that token is left to the user.

use crate::http_client::{HttpClient, HttpError, HttpResponse};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, info};

const DOCS_API: &str = "https://docs.googleapis.com/v1/documents";
const DRIVE_API: &str = "https://www.googleapis.com/drive/v3/files";
const DRIVE_UPLOAD_API: &str = "https://www.googleapis.com/upload/drive/v3/files";
const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";
const UPLOAD_BOUNDARY: &str = "docdraft_upload_boundary_7f3a";

static PATH_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/d/([A-Za-z0-9_-]+)").expect("valid regex"));
static FOLDER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/folders/([A-Za-z0-9_-]+)").expect("valid regex"));
static ID_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

/// What a Google link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudKind {
    Doc,
    File,
    Folder,
}

/// A recognised Google Docs / Drive link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudLink {
    pub id: String,
    pub kind: CloudKind,
}

/// Returns true when `raw` is an http(s) URL on a Google Docs or Drive host.
pub fn is_google_url(raw: &str) -> bool {
    google_host(raw).is_some()
}

/// Returns true when `raw` points at the Google Docs host.
pub fn is_docs_url(raw: &str) -> bool {
    google_host(raw).as_deref() == Some("docs.google.com")
}

fn google_host(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();
    matches!(host.as_str(), "docs.google.com" | "drive.google.com").then_some(host)
}

impl CloudLink {
    /// Classifies a Google Docs / Drive URL. Returns `None` for anything
    /// else, including Google URLs with no recognisable id.
    pub fn parse(raw: &str) -> Option<Self> {
        let url = Url::parse(raw.trim()).ok()?;
        let host = google_host(raw)?;
        let path = url.path();

        if host == "docs.google.com" {
            if !path.starts_with("/document/") {
                // Sheets and Slides are not readable as plain documents.
                return None;
            }
            let id = capture(&PATH_ID, path)?;
            return Some(Self { id, kind: CloudKind::Doc });
        }

        if let Some(id) = capture(&FOLDER_ID, path) {
            return Some(Self { id, kind: CloudKind::Folder });
        }
        if let Some(id) = capture(&PATH_ID, path) {
            return Some(Self { id, kind: CloudKind::File });
        }
        url.query_pairs()
            .find(|(key, _)| key == "id")
            .map(|(_, value)| value.into_owned())
            .filter(|id| ID_CHARS.is_match(id))
            .map(|id| Self { id, kind: CloudKind::File })
    }
}

fn capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Failure reported by the cloud collaborator.
#[derive(Error, Debug)]
pub enum CloudError {
    /// The token was rejected (expired or revoked).
    #[error("Google rejected the access token (HTTP {status}); re-authorize and refresh the token file")]
    Unauthorized { status: u16 },

    /// The token is valid but lacks access to this document or folder.
    #[error("Google denied access (HTTP 403): {0}")]
    Forbidden(String),

    #[error("Drive file is not UTF-8 text; export it as .txt or .md first")]
    NotUtf8,

    #[error("{0}")]
    Request(String),
}

impl From<HttpError> for CloudError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::NotUtf8 { .. } => CloudError::NotUtf8,
            other => CloudError::Request(other.to_string()),
        }
    }
}

/// Remote document operations the pipeline depends on.
#[async_trait]
pub trait CloudStorage: Send + Sync {
    /// Plain text of a Google Doc.
    async fn read_document(&self, id: &str) -> Result<String, CloudError>;

    /// Text of any Drive file; Google Docs are exported as plain text.
    async fn read_file(&self, id: &str) -> Result<String, CloudError>;

    /// Creates a Google Doc and returns its URL.
    async fn create_document(&self, title: &str, text: &str) -> Result<String, CloudError>;

    /// Uploads the file at `local_path` into `folder_id` and returns its URL.
    async fn upload_file(&self, folder_id: &str, local_path: &Path) -> Result<String, CloudError>;
}

/// [`CloudStorage`] backed by the Google Docs and Drive REST APIs.
pub struct GoogleDrive {
    http: Box<dyn HttpClient>,
    access_token: String,
}

impl GoogleDrive {
    pub fn new(http: Box<dyn HttpClient>, access_token: String) -> Self {
        Self { http, access_token }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    fn check(response: HttpResponse, action: &str) -> Result<HttpResponse, CloudError> {
        match response.status {
            s if (200..300).contains(&s) => Ok(response),
            401 => Err(CloudError::Unauthorized { status: response.status }),
            403 => Err(CloudError::Forbidden(format!("{}: {}", action, response.body))),
            status => Err(CloudError::Request(format!(
                "{} failed with HTTP {}: {}",
                action, status, response.body
            ))),
        }
    }

    fn parse_json(response: &HttpResponse, action: &str) -> Result<Value, CloudError> {
        serde_json::from_str(&response.body)
            .map_err(|e| CloudError::Request(format!("{} returned malformed JSON: {}", action, e)))
    }

    fn string_field(value: &Value, field: &str, action: &str) -> Result<String, CloudError> {
        value
            .get(field)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| CloudError::Request(format!("{} response has no '{}'", action, field)))
    }

    async fn get(&self, url: &str, action: &str) -> Result<HttpResponse, CloudError> {
        let bearer = self.bearer();
        let response = self.http.get(url, &[("authorization", bearer.as_str())]).await?;
        Self::check(response, action)
    }

    async fn post(&self, url: &str, body: &Value, action: &str) -> Result<Value, CloudError> {
        let bearer = self.bearer();
        let response = self
            .http
            .post_json(
                url,
                &[
                    ("authorization", bearer.as_str()),
                    ("content-type", "application/json"),
                ],
                body,
            )
            .await?;
        let response = Self::check(response, action)?;
        Self::parse_json(&response, action)
    }
}

/// Drive `multipart/related` body: JSON metadata part, then the media part.
fn multipart_body(metadata: &Value, media: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(media.len() + 256);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n\
             --{b}\r\nContent-Type: text/markdown; charset=UTF-8\r\n\r\n",
            b = UPLOAD_BOUNDARY
        )
        .as_bytes(),
    );
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{}--\r\n", UPLOAD_BOUNDARY).as_bytes());
    body
}

/// Concatenates the text runs of a Docs API document body.
fn document_text(document: &Value) -> String {
    let Some(content) = document.pointer("/body/content").and_then(|c| c.as_array()) else {
        return String::new();
    };
    content
        .iter()
        .filter_map(|element| element.pointer("/paragraph/elements").and_then(|e| e.as_array()))
        .flatten()
        .filter_map(|run| run.pointer("/textRun/content").and_then(|t| t.as_str()))
        .collect()
}

#[async_trait]
impl CloudStorage for GoogleDrive {
    async fn read_document(&self, id: &str) -> Result<String, CloudError> {
        let response = self.get(&format!("{}/{}", DOCS_API, id), "Reading Google Doc").await?;
        let document = Self::parse_json(&response, "Reading Google Doc")?;
        let text = document_text(&document);
        info!("Read {} characters from Google Doc {}", text.chars().count(), id);
        Ok(text)
    }

    async fn read_file(&self, id: &str) -> Result<String, CloudError> {
        let action = "Reading Drive file";
        let response = self
            .get(&format!("{}/{}?fields=name,mimeType", DRIVE_API, id), action)
            .await?;
        let metadata = Self::parse_json(&response, action)?;
        let mime_type = metadata.get("mimeType").and_then(|m| m.as_str()).unwrap_or("");
        debug!("Drive file {} has MIME type '{}'", id, mime_type);

        if mime_type == GOOGLE_DOC_MIME {
            return self.read_document(id).await;
        }

        let url = if mime_type.starts_with("application/vnd.google-apps.") {
            format!("{}/{}/export?mimeType=text/plain", DRIVE_API, id)
        } else {
            format!("{}/{}?alt=media", DRIVE_API, id)
        };
        let text = self.get(&url, action).await?.body;
        info!("Read {} characters from Drive file {}", text.chars().count(), id);
        Ok(text)
    }

    async fn create_document(&self, title: &str, text: &str) -> Result<String, CloudError> {
        let action = "Creating Google Doc";
        let created = self.post(DOCS_API, &json!({ "title": title }), action).await?;
        let doc_id = Self::string_field(&created, "documentId", action)?;

        let insert = json!({
            "requests": [{
                "insertText": { "location": { "index": 1 }, "text": text }
            }]
        });
        self.post(&format!("{}/{}:batchUpdate", DOCS_API, doc_id), &insert, "Writing Google Doc")
            .await?;

        let url = format!("https://docs.google.com/document/d/{}/edit", doc_id);
        info!("Created Google Doc: {}", url);
        Ok(url)
    }

    async fn upload_file(&self, folder_id: &str, local_path: &Path) -> Result<String, CloudError> {
        let action = "Uploading to Google Drive";
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| CloudError::Request(format!("Could not read {}: {}", local_path.display(), e)))?;
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.md".to_string());

        let metadata = json!({
            "name": name,
            "parents": [folder_id],
            "mimeType": "text/markdown"
        });
        let body = multipart_body(&metadata, &bytes);
        let content_type = format!("multipart/related; boundary={}", UPLOAD_BOUNDARY);

        let bearer = self.bearer();
        let response = self
            .http
            .post_bytes(
                &format!("{}?uploadType=multipart&fields=id,webViewLink", DRIVE_UPLOAD_API),
                &[
                    ("authorization", bearer.as_str()),
                    ("content-type", content_type.as_str()),
                ],
                body,
            )
            .await?;
        let response = Self::check(response, action)?;
        let uploaded = Self::parse_json(&response, action)?;
        let file_id = Self::string_field(&uploaded, "id", action)?;

        let url = uploaded
            .get("webViewLink")
            .and_then(|l| l.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://drive.google.com/file/d/{}/view", file_id));
        info!("Uploaded to Google Drive: {}", url);
        Ok(url)
    }
}
