//! Orchestrates one document run: classify the destination, resolve the
//! inputs, build the prompt, generate and save.
//!
//! Stages run strictly in sequence and the first failure aborts the run. A
//! save failure is the one exception to "nothing comes back": the generated
//! content travels inside [`PipelineError::Save`].

use crate::cloud::CloudStorage;
use crate::error::PipelineError;
use crate::llm_generator::{GenerationResult, TextGenerator};
use crate::prompt::{self, GenerationRequest};
use crate::sink::{self, OutputSpec, SavedLocation, SinkResolver};
use crate::source::{InputRole, SourceResolver};
use tracing::{info, warn};

/// Raw user inputs for one run, before any classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentRequest {
    pub style: String,
    pub topic: String,
    pub audience: Option<String>,
    pub doc_type: Option<String>,
    pub size: Option<String>,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub result: GenerationResult,
    pub location: SavedLocation,
    pub title: Option<String>,
}

pub struct DocumentPipeline {
    generator: Box<dyn TextGenerator>,
    cloud: Option<Box<dyn CloudStorage>>,
}

impl DocumentPipeline {
    pub fn new(generator: Box<dyn TextGenerator>, cloud: Option<Box<dyn CloudStorage>>) -> Self {
        Self { generator, cloud }
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    pub fn has_cloud(&self) -> bool {
        self.cloud.is_some()
    }

    pub async fn run(&self, req: &DocumentRequest) -> Result<PipelineOutcome, PipelineError> {
        // Destination is validated before any input is read.
        let destination = OutputSpec::classify(&req.output)?;
        info!("Output destination: {}", destination);

        let sources = SourceResolver::new(self.cloud.as_deref());
        let style = sources.resolve(&req.style, InputRole::Style).await?;
        let topic = sources.resolve(&req.topic, InputRole::Topic).await?;

        let request = GenerationRequest::new(Some(style), topic)?
            .with_audience(req.audience.clone())
            .with_doc_type(req.doc_type.clone())
            .with_size(req.size.clone());
        let prompt_text = prompt::build(&request);
        info!(
            "Generating {} with {} ({} character prompt)",
            request.doc_type(),
            self.generator.name(),
            prompt_text.chars().count()
        );

        let result = self.generator.generate(&prompt_text).await?;

        let name = prompt::suggested_name(&request);
        let sinks = SinkResolver::new(self.cloud.as_deref());
        match sinks.save(&result.content, &destination, &name).await {
            Ok(location) => Ok(PipelineOutcome {
                title: sink::extract_title(&result.content),
                result,
                location,
            }),
            Err(error) => {
                warn!("Save to {} failed: {}", destination, error);
                Err(PipelineError::Save {
                    error,
                    content: result.content,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::CloudError;
    use crate::error::{GenerationError, InputError, ReadError, WriteError};
    use crate::prompt::DEFAULT_STYLE;
    use crate::sink::LocationKind;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    /// Generator fake that records prompts and either echoes a canned
    /// document or fails like a rejected service call.
    #[derive(Default)]
    struct FakeGenerator {
        prompts: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        async fn generate(&self, prompt: &str) -> Result<GenerationResult, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                return Err(GenerationError::Service {
                    model: "fake".to_string(),
                    message: "HTTP 500: overloaded".to_string(),
                });
            }
            Ok(GenerationResult::new(
                "# Remote Work Pays Off\n\nSmall teams save on rent.\n".to_string(),
            ))
        }

        fn name(&self) -> &str {
            "Fake"
        }
    }

    struct FailingCloud;

    #[async_trait]
    impl CloudStorage for FailingCloud {
        async fn read_document(&self, _id: &str) -> Result<String, CloudError> {
            Err(CloudError::Request("unused".to_string()))
        }

        async fn read_file(&self, _id: &str) -> Result<String, CloudError> {
            Err(CloudError::Request("unused".to_string()))
        }

        async fn create_document(&self, _title: &str, _text: &str) -> Result<String, CloudError> {
            Err(CloudError::Request("HTTP 503: backend unavailable".to_string()))
        }

        async fn upload_file(&self, _folder_id: &str, _local_path: &Path) -> Result<String, CloudError> {
            Err(CloudError::Request("HTTP 503: backend unavailable".to_string()))
        }
    }

    fn remote_work_request(output: &Path) -> DocumentRequest {
        DocumentRequest {
            style: String::new(),
            topic: "Write about the benefits of remote work for small businesses".to_string(),
            audience: Some("small business owners".to_string()),
            doc_type: Some("blog post".to_string()),
            size: Some("500 words".to_string()),
            output: output.display().to_string(),
        }
    }

    #[tokio::test]
    async fn test_remote_work_blog_post_saved_locally() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("output");
        let generator = FakeGenerator::default();
        let prompts = generator.prompts.clone();
        let pipeline = DocumentPipeline::new(Box::new(generator), None);

        let outcome = pipeline.run(&remote_work_request(&output)).await.unwrap();

        let saved = PathBuf::from(&outcome.location.descriptor);
        assert_eq!(outcome.location.kind, LocationKind::Local);
        assert!(saved.is_absolute());
        assert_eq!(saved.file_name().unwrap(), "generated_blog-post.md");
        assert!(!std::fs::read_to_string(&saved).unwrap().is_empty());
        assert_eq!(outcome.title.as_deref(), Some("Remote Work Pays Off"));
        assert_eq!(outcome.result.character_count, outcome.result.content.chars().count());

        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("- Type: blog post"));
        assert!(prompts[0].contains("- Audience: small business owners"));
        assert!(prompts[0].contains(DEFAULT_STYLE));
    }

    #[tokio::test]
    async fn test_sample_topic_file_with_default_style() {
        let dir = tempfile::tempdir().unwrap();
        let topic_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/sample_topic.txt");
        let topic = std::fs::read_to_string(&topic_path).unwrap();
        let generator = FakeGenerator::default();
        let prompts = generator.prompts.clone();
        let pipeline = DocumentPipeline::new(Box::new(generator), None);

        let req = DocumentRequest {
            topic: topic_path.display().to_string(),
            output: dir.path().display().to_string(),
            ..DocumentRequest::default()
        };
        let outcome = pipeline.run(&req).await.unwrap();

        assert!(outcome.location.descriptor.ends_with("generated_article.md"));
        let prompts = prompts.lock().unwrap();
        assert!(prompts[0].contains(DEFAULT_STYLE));
        assert!(prompts[0].contains(topic.as_str()));
    }

    #[tokio::test]
    async fn test_generation_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("output");
        let generator = FakeGenerator {
            fail: true,
            ..FakeGenerator::default()
        };
        let pipeline = DocumentPipeline::new(Box::new(generator), None);

        let err = pipeline.run(&remote_work_request(&output)).await.unwrap_err();

        assert!(matches!(err, PipelineError::Generation(GenerationError::Service { .. })));
        assert!(err.unsaved_content().is_none());
        assert!(!output.join("generated_blog-post.md").exists());
    }

    #[tokio::test]
    async fn test_empty_topic_aborts_before_generation() {
        let generator = FakeGenerator::default();
        let prompts = generator.prompts.clone();
        let pipeline = DocumentPipeline::new(Box::new(generator), None);

        let err = pipeline
            .run(&DocumentRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Read(ReadError::EmptyInput)));
        assert!(prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_destination_aborts_before_generation() {
        let generator = FakeGenerator::default();
        let prompts = generator.prompts.clone();
        let pipeline = DocumentPipeline::new(Box::new(generator), None);

        let req = DocumentRequest {
            topic: "anything".to_string(),
            output: "https://drive.google.com/drive/my-drive".to_string(),
            ..DocumentRequest::default()
        };
        let err = pipeline.run(&req).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Input(InputError::UnsupportedDestination { .. })
        ));
        assert!(prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cloud_save_failure_returns_content() {
        let pipeline = DocumentPipeline::new(
            Box::new(FakeGenerator::default()),
            Some(Box::new(FailingCloud)),
        );
        let req = DocumentRequest {
            topic: "anything".to_string(),
            output: "docs".to_string(),
            ..DocumentRequest::default()
        };

        let err = pipeline.run(&req).await.unwrap_err();

        match &err {
            PipelineError::Save { error, content } => {
                assert!(matches!(error, WriteError::CloudWriteFailure { .. }));
                assert!(content.starts_with("# Remote Work Pays Off"));
            }
            other => panic!("expected save error, got {:?}", other),
        }
        assert!(err.unsaved_content().is_some());
        assert!(err.to_string().contains("NOT saved"));
    }
}
