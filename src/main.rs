use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use docdraft::cloud::{CloudStorage, GoogleDrive};
use docdraft::config::Config;
use docdraft::draft_ui::DraftUi;
use docdraft::http_client::ReqwestHttpClient;
use docdraft::llm_generator::{LlmGenerator, MockGenerator, ModelSpec, TextGenerator, DEFAULT_MODEL};
use docdraft::pipeline::{DocumentPipeline, DocumentRequest};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("docdraft")
        .about("Draft documents in your own writing style with a language model")
        .long_about(
            "docdraft reads a writing style and a topic (local files, Google Docs/Drive links or plain text), \
             asks a language model for a Markdown draft and saves it locally, as a new Google Doc or into a Drive folder. \
             Without --topic it runs interactively.",
        )
        .arg(Arg::new("topic")
            .short('t')
            .long("topic")
            .help("Topic, insights and quotes: file path, Google link or text")
            .value_name("TOPIC"))
        .arg(Arg::new("style")
            .short('s')
            .long("style")
            .help("Writing style sample: file path, Google link or text")
            .value_name("STYLE")
            .default_value(""))
        .arg(Arg::new("audience")
            .short('a')
            .long("audience")
            .help("Target audience (default: general public)")
            .value_name("AUDIENCE"))
        .arg(Arg::new("type")
            .long("type")
            .help("Document type, e.g. \"blog post\" (default: article)")
            .value_name("TYPE"))
        .arg(Arg::new("size")
            .long("size")
            .help("Target length, e.g. \"500 words\" (default: 2 pages)")
            .value_name("SIZE"))
        .arg(Arg::new("output")
            .short('o')
            .long("output")
            .help("Directory, 'docs' for a new Google Doc, or a Google Drive folder link")
            .value_name("DEST")
            .default_value(""))
        .arg(Arg::new("model")
            .short('m')
            .long("model")
            .help("Model to use (see --list-models)")
            .value_name("MODEL"))
        .arg(Arg::new("list-models")
            .long("list-models")
            .help("List available models")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("set-api-key")
            .long("set-api-key")
            .help("Save the API key for the selected model's provider")
            .value_name("API_KEY")
            .num_args(1))
        .arg(Arg::new("config")
            .long("config")
            .help("Show configuration information")
            .action(ArgAction::SetTrue))
}

fn flag_request(matches: &ArgMatches, topic: &str) -> DocumentRequest {
    let optional = |id: &str| matches.get_one::<String>(id).cloned();
    DocumentRequest {
        style: optional("style").unwrap_or_default(),
        topic: topic.to_string(),
        audience: optional("audience"),
        doc_type: optional("type"),
        size: optional("size"),
        output: optional("output").unwrap_or_default(),
    }
}

fn build_pipeline(config: &Config, model: &'static ModelSpec) -> anyhow::Result<DocumentPipeline> {
    let generator: Box<dyn TextGenerator> = if config.is_mock_mode() {
        Box::new(MockGenerator::new())
    } else {
        let http = ReqwestHttpClient::new(config.request_timeout()).context("Could not create HTTP client")?;
        Box::new(LlmGenerator::new(
            Box::new(http),
            model,
            config.get_api_key(model.provider).map(str::to_string),
        ))
    };

    let cloud: Option<Box<dyn CloudStorage>> = match config.google_access_token() {
        Ok(Some(token)) => {
            let http = ReqwestHttpClient::new(config.request_timeout()).context("Could not create HTTP client")?;
            Some(Box::new(GoogleDrive::new(Box::new(http), token)))
        }
        Ok(None) => None,
        Err(e) => {
            warn!("Google Drive disabled: {}", e);
            None
        }
    };

    Ok(DocumentPipeline::new(generator, cloud))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let mut config = Config::load()?;

    let model_key = matches
        .get_one::<String>("model")
        .cloned()
        .or_else(|| config.default_model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    // Diagnostic commands work even when the configured model is unknown.
    if matches.get_flag("list-models") || matches.get_flag("config") {
        let model = match ModelSpec::find(&model_key) {
            Ok(model) => model,
            Err(e) => {
                warn!("{}; falling back to {}", e, DEFAULT_MODEL);
                ModelSpec::find(DEFAULT_MODEL)?
            }
        };
        if matches.get_flag("list-models") {
            DraftUi::new(model).show_models();
        } else {
            config.show_config_info()?;
        }
        return Ok(());
    }

    let model = ModelSpec::find(&model_key)?;
    let ui = DraftUi::new(model);

    if let Some(api_key) = matches.get_one::<String>("set-api-key") {
        config.set_api_key(model.provider, api_key.clone())?;
        println!("✅ {} API key saved successfully", model.provider.display_name());
        return Ok(());
    }

    let (pipeline, request) = match matches.get_one::<String>("topic") {
        Some(topic) => {
            let request = flag_request(&matches, topic);
            let pipeline = build_pipeline(&config, model)?;
            ui.show_summary(pipeline.generator_name(), &request);
            (pipeline, request)
        }
        None => {
            let answers = ui.collect_request()?;
            let pipeline = build_pipeline(&config, answers.model)?;
            ui.show_summary(pipeline.generator_name(), &answers.request);
            if !ui.confirm()? {
                println!("Cancelled.");
                return Ok(());
            }
            (pipeline, answers.request)
        }
    };

    info!(
        "Starting run with {} (Google Drive {})",
        pipeline.generator_name(),
        if pipeline.has_cloud() { "available" } else { "not configured" }
    );

    match pipeline.run(&request).await {
        Ok(outcome) => {
            ui.show_outcome(&outcome);
            Ok(())
        }
        Err(e) => {
            if let Err(report) = ui.show_failure(&e) {
                warn!("Could not print failure report: {}", report);
            }
            // Writes to a closed stdout fail silently; keep a file copy too.
            if let Some(content) = e.unsaved_content() {
                match ui.keep_unsaved(content) {
                    Ok(path) => eprintln!("💾 Generated content kept in {}", path.display()),
                    Err(keep) => {
                        eprintln!("Could not keep generated content on disk ({}); it follows:", keep);
                        eprintln!("{}", content);
                    }
                }
            }
            Err(e.into())
        }
    }
}
