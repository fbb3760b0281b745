//! Source resolution for style and topic inputs.
//!
//! A raw user string is classified into an [`InputSpec`] and read. The
//! precedence is fixed: empty input, then Google links, then local files,
//! then literal text. Link patterns are checked first so an obviously remote
//! string never touches the filesystem.

use crate::cloud::{CloudError, CloudKind, CloudLink, CloudStorage};
use crate::error::ReadError;
use crate::prompt::DEFAULT_STYLE;
use dirs::home_dir;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extensions that mark a bare token as a file name rather than text.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "text"];

/// Which input is being resolved; only affects empty-input handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRole {
    Style,
    Topic,
}

/// Classified form of a raw input string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSpec {
    Empty,
    CloudLink(CloudLink),
    FilePath(PathBuf),
    LiteralText(String),
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = home_dir() {
            return home;
        }
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

/// True when `raw` reads as a path even though nothing may exist there.
fn looks_like_path(raw: &str) -> bool {
    if raw.contains(char::is_whitespace) {
        return false;
    }
    if ["~/", "/", "./", "../"].iter().any(|prefix| raw.starts_with(prefix)) {
        return true;
    }
    Path::new(raw)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

impl InputSpec {
    /// Classifies `raw`. Only the final existence check touches the filesystem.
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return InputSpec::Empty;
        }

        if let Some(link) = CloudLink::parse(trimmed) {
            return InputSpec::CloudLink(link);
        }

        let path = expand_home(trimmed);
        if path.is_file() || looks_like_path(trimmed) {
            return InputSpec::FilePath(path);
        }

        InputSpec::LiteralText(raw.to_string())
    }
}

/// Reads style and topic content from whatever the user pointed at.
pub struct SourceResolver<'a> {
    cloud: Option<&'a dyn CloudStorage>,
}

impl<'a> SourceResolver<'a> {
    pub fn new(cloud: Option<&'a dyn CloudStorage>) -> Self {
        Self { cloud }
    }

    /// Resolves `raw` to its textual content.
    pub async fn resolve(&self, raw: &str, role: InputRole) -> Result<String, ReadError> {
        let spec = InputSpec::classify(raw);
        debug!("Classified {:?} input as {:?}", role, spec);

        match spec {
            InputSpec::Empty => match role {
                InputRole::Style => {
                    info!("No style given, using default style");
                    Ok(DEFAULT_STYLE.to_string())
                }
                InputRole::Topic => Err(ReadError::EmptyInput),
            },
            InputSpec::CloudLink(link) => self.read_cloud(&link).await,
            InputSpec::FilePath(path) => read_local(&path),
            InputSpec::LiteralText(text) => Ok(text),
        }
    }

    async fn read_cloud(&self, link: &CloudLink) -> Result<String, ReadError> {
        let cloud = self.cloud.ok_or_else(|| ReadError::CloudAuthUnavailable {
            reason: "no Google access token found; set DOCDRAFT_GOOGLE_TOKEN or create ~/.docdraft/google_token.json"
                .to_string(),
        })?;

        let result = match link.kind {
            CloudKind::Doc => cloud.read_document(&link.id).await,
            CloudKind::File => cloud.read_file(&link.id).await,
            CloudKind::Folder => return Err(ReadError::FolderNotReadable),
        };

        result.map_err(|e| match e {
            CloudError::Unauthorized { .. } => ReadError::CloudAuthUnavailable {
                reason: e.to_string(),
            },
            CloudError::NotUtf8 => ReadError::CloudNotUtf8,
            CloudError::Forbidden(message) | CloudError::Request(message) => {
                ReadError::CloudReadFailure { message }
            }
        })
    }
}

fn read_local(path: &Path) -> Result<String, ReadError> {
    let bytes = fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ReadError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => ReadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let content = String::from_utf8(bytes).map_err(|_| ReadError::NotUtf8 {
        path: path.to_path_buf(),
    })?;
    info!(
        "Read {} characters from {}",
        content.chars().count(),
        path.display()
    );
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Fake cloud reader that records which operation was called.
    #[derive(Default)]
    struct FakeCloud {
        calls: Mutex<Vec<String>>,
        fail_with: Option<fn() -> CloudError>,
    }

    impl FakeCloud {
        fn failing(make: fn() -> CloudError) -> Self {
            Self {
                fail_with: Some(make),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl CloudStorage for FakeCloud {
        async fn read_document(&self, id: &str) -> Result<String, CloudError> {
            self.calls.lock().unwrap().push(format!("doc:{}", id));
            match self.fail_with {
                Some(make) => Err(make()),
                None => Ok(format!("document {}", id)),
            }
        }

        async fn read_file(&self, id: &str) -> Result<String, CloudError> {
            self.calls.lock().unwrap().push(format!("file:{}", id));
            Ok(format!("file {}", id))
        }

        async fn create_document(&self, _title: &str, _text: &str) -> Result<String, CloudError> {
            unreachable!("reader never creates documents")
        }

        async fn upload_file(&self, _folder_id: &str, _local_path: &Path) -> Result<String, CloudError> {
            unreachable!("reader never uploads")
        }
    }

    #[tokio::test]
    async fn test_local_file_returns_exact_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("style.txt");
        let content = "Line one.\n\nLine two, with ünïcödé.\n";
        fs::write(&path, content).unwrap();

        let resolver = SourceResolver::new(None);
        let resolved = resolver
            .resolve(path.to_str().unwrap(), InputRole::Topic)
            .await
            .unwrap();
        assert_eq!(resolved, content);
    }

    #[tokio::test]
    async fn test_empty_style_returns_default() {
        let resolver = SourceResolver::new(None);
        assert_eq!(
            resolver.resolve("", InputRole::Style).await.unwrap(),
            crate::prompt::DEFAULT_STYLE
        );
        assert_eq!(
            resolver.resolve("   \n", InputRole::Style).await.unwrap(),
            crate::prompt::DEFAULT_STYLE
        );
    }

    #[tokio::test]
    async fn test_empty_topic_is_error() {
        let resolver = SourceResolver::new(None);
        assert!(matches!(
            resolver.resolve("", InputRole::Topic).await,
            Err(ReadError::EmptyInput)
        ));
    }

    #[tokio::test]
    async fn test_literal_text_is_returned_verbatim() {
        let resolver = SourceResolver::new(None);
        let text = "Write about the benefits of remote work for small businesses";
        assert_eq!(resolver.resolve(text, InputRole::Topic).await.unwrap(), text);
    }

    #[tokio::test]
    async fn test_missing_path_shaped_input_is_file_not_found() {
        let resolver = SourceResolver::new(None);
        for raw in ["/definitely/not/here.txt", "./missing.md", "notes.txt"] {
            assert!(
                matches!(
                    resolver.resolve(raw, InputRole::Topic).await,
                    Err(ReadError::FileNotFound { .. })
                ),
                "{} should be treated as a missing file",
                raw
            );
        }
    }

    #[tokio::test]
    async fn test_non_utf8_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        fs::write(&path, [0x25, 0x50, 0x44, 0x46, 0xff, 0xfe, 0x00]).unwrap();

        let resolver = SourceResolver::new(None);
        assert!(matches!(
            resolver.resolve(path.to_str().unwrap(), InputRole::Style).await,
            Err(ReadError::NotUtf8 { .. })
        ));
    }

    #[tokio::test]
    async fn test_cloud_link_without_credentials_degrades() {
        let resolver = SourceResolver::new(None);
        let result = resolver
            .resolve("https://docs.google.com/document/d/abc/edit", InputRole::Style)
            .await;
        match result {
            Err(ReadError::CloudAuthUnavailable { reason }) => {
                assert!(reason.contains("DOCDRAFT_GOOGLE_TOKEN"))
            }
            other => panic!("expected CloudAuthUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_doc_and_file_links_dispatch_to_matching_reader() {
        let cloud = FakeCloud::default();
        let resolver = SourceResolver::new(Some(&cloud));

        let doc = resolver
            .resolve("https://docs.google.com/document/d/DOC1/edit", InputRole::Style)
            .await
            .unwrap();
        let file = resolver
            .resolve("https://drive.google.com/file/d/FILE1/view", InputRole::Topic)
            .await
            .unwrap();

        assert_eq!(doc, "document DOC1");
        assert_eq!(file, "file FILE1");
        assert_eq!(*cloud.calls.lock().unwrap(), vec!["doc:DOC1", "file:FILE1"]);
    }

    #[tokio::test]
    async fn test_folder_link_is_not_readable() {
        let cloud = FakeCloud::default();
        let resolver = SourceResolver::new(Some(&cloud));
        assert!(matches!(
            resolver
                .resolve("https://drive.google.com/drive/folders/F1", InputRole::Topic)
                .await,
            Err(ReadError::FolderNotReadable)
        ));
        assert!(cloud.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cloud_failures_map_to_read_errors() {
        let failing = FakeCloud {
            fail_with: Some(|| CloudError::Request("HTTP 500".to_string())),
            ..FakeCloud::default()
        };
        let resolver = SourceResolver::new(Some(&failing));
        assert!(matches!(
            resolver
                .resolve("https://docs.google.com/document/d/X/edit", InputRole::Topic)
                .await,
            Err(ReadError::CloudReadFailure { .. })
        ));

        let expired = FakeCloud {
            fail_with: Some(|| CloudError::Unauthorized { status: 401 }),
            ..FakeCloud::default()
        };
        let resolver = SourceResolver::new(Some(&expired));
        assert!(matches!(
            resolver
                .resolve("https://docs.google.com/document/d/X/edit", InputRole::Topic)
                .await,
            Err(ReadError::CloudAuthUnavailable { .. })
        ));

        let forbidden = FakeCloud::failing(|| CloudError::Forbidden("not shared".to_string()));
        let resolver = SourceResolver::new(Some(&forbidden));
        assert!(matches!(
            resolver
                .resolve("https://docs.google.com/document/d/X/edit", InputRole::Topic)
                .await,
            Err(ReadError::CloudReadFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_binary_cloud_file_is_rejected() {
        let binary = FakeCloud::failing(|| CloudError::NotUtf8);
        let resolver = SourceResolver::new(Some(&binary));
        assert!(matches!(
            resolver
                .resolve("https://docs.google.com/document/d/PDF/edit", InputRole::Style)
                .await,
            Err(ReadError::CloudNotUtf8)
        ));
    }

    #[test]
    fn test_classify_precedence() {
        assert_eq!(InputSpec::classify("  "), InputSpec::Empty);
        assert!(matches!(
            InputSpec::classify("https://docs.google.com/document/d/abc"),
            InputSpec::CloudLink(CloudLink { kind: CloudKind::Doc, .. })
        ));
        assert!(matches!(
            InputSpec::classify("~/notes/topic.md"),
            InputSpec::FilePath(_)
        ));
        assert!(matches!(
            InputSpec::classify("A short paragraph about remote work."),
            InputSpec::LiteralText(_)
        ));
        // Non-Google URLs are plain text.
        assert!(matches!(
            InputSpec::classify("https://example.com/post"),
            InputSpec::LiteralText(_)
        ));
    }

    #[test]
    fn test_sentence_starting_with_slash_is_text() {
        assert_eq!(
            InputSpec::classify("/tmp cleanup tips for admins"),
            InputSpec::LiteralText("/tmp cleanup tips for admins".to_string())
        );
        assert_eq!(
            InputSpec::classify("./deploy script walkthrough.md"),
            InputSpec::LiteralText("./deploy script walkthrough.md".to_string())
        );
        assert!(matches!(
            InputSpec::classify("/tmp/missing-topic.md"),
            InputSpec::FilePath(_)
        ));
    }

    #[test]
    fn test_classify_existing_file_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("TOPIC");
        fs::write(&path, "x").unwrap();
        assert_eq!(
            InputSpec::classify(path.to_str().unwrap()),
            InputSpec::FilePath(path.clone())
        );
    }

    #[test]
    fn test_expand_home() {
        let home = home_dir().unwrap();
        assert_eq!(expand_home("~/docs/a.txt"), home.join("docs/a.txt"));
        assert_eq!(expand_home("~"), home);
        assert_eq!(expand_home("relative/a.txt"), PathBuf::from("relative/a.txt"));
        assert_eq!(expand_home("~user/a.txt"), PathBuf::from("~user/a.txt"));
    }
}
