use clap::Parser;
use tracing::{debug, info};

use critiq::cli::{Cli, CliCommand};
use critiq::config::Config;
use critiq::error::{Error, Result};
use critiq::feedback::parse_feedback;
use critiq::llm::HttpCompletionProvider;
use critiq::review::{
    Notifier, ReportArtifacts, ReportPublisher, ReviewService, StderrNotifier, find_item,
    format_detail, format_tree,
};
use critiq::store::ResponseStore;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    let config = match Config::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            StderrNotifier.error(&e.to_string());
            std::process::exit(1);
        }
    };

    debug!(?config, "config loaded");

    if let Err(e) = run(cli.command, &config).await {
        StderrNotifier.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(command: CliCommand, config: &Config) -> Result<()> {
    match command {
        CliCommand::Review { file } => {
            let service = ReviewService::new(config, provider(config));
            let review = service.review_file(&file).await?;
            print!("{}", format_tree(&review.feedback));
            if let Some(saved) = review.saved.as_ref().and_then(|s| s.json_path.as_ref()) {
                service
                    .notifier()
                    .info(&format!("feedback saved to {}", saved.display()));
            }
            Ok(())
        }
        CliCommand::Report { file, pdf } => {
            let service = ReviewService::new(config, provider(config));
            let artifacts = service.generate_report(&file, pdf).await?;
            print_artifacts(&artifacts);
            Ok(())
        }
        CliCommand::Render { markdown, pdf } => {
            let notifier = StderrNotifier;
            let artifacts = ReportPublisher::new(config, &notifier)
                .render_markdown(&markdown, pdf)
                .await?;
            print_artifacts(&artifacts);
            Ok(())
        }
        CliCommand::Parse { response } => {
            if !response.is_file() {
                return Err(Error::NoInput(response));
            }
            let raw = std::fs::read_to_string(&response)?;
            let result = parse_feedback(&raw);
            info!(items = result.total_items(), "response parsed");
            let json = serde_json::to_string_pretty(&result)
                .map_err(|e| Error::Store(format!("failed to serialize feedback: {e}")))?;
            println!("{json}");
            Ok(())
        }
        CliCommand::Show {
            json,
            category,
            index,
        } => {
            if !json.is_file() {
                return Err(Error::NoInput(json));
            }
            let store = ResponseStore::new(&config.responses_dir);
            let result = store.load_parsed(&json)?;
            let (category, content) = find_item(&result, &category, index)?;
            print!("{}", format_detail(category, index, content));
            Ok(())
        }
    }
}

fn provider(config: &Config) -> HttpCompletionProvider {
    HttpCompletionProvider::new(
        config.api_url.clone(),
        config.api_key_env.clone(),
        config.model.clone(),
    )
}

fn print_artifacts(artifacts: &ReportArtifacts) {
    println!("{}", artifacts.markdown.display());
    if let Some(ref html) = artifacts.html {
        println!("{}", html.display());
    }
    if let Some(ref pdf) = artifacts.pdf {
        println!("{}", pdf.display());
    }
}
