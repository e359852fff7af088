use std::path::PathBuf;

use anyhow::{anyhow, Result};
use askrouter_core::{
    Config, DataUrlPreview, HttpGateway, ImageAttachment, Orchestrator, SubmissionStore,
    SubmitOutcome,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod handler;
mod ui;

#[derive(Parser)]
#[command(name = "askrouter")]
#[command(about = "Ask questions and let the router pick the agent that answers", version)]
struct Cli {
    /// Base URL of the agent backend
    #[arg(long, global = true, env = "ASKROUTER_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question
    Ask {
        /// Your question
        question: String,
        /// Image to attach
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// Refuse to submit without an attached image
        #[arg(long)]
        require_image: bool,
    },
    /// Start an interactive session
    Chat,
    /// Check that the backend is reachable
    Health,
    /// Show the backend URL in use and where it came from
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::resolve(cli.api_url.as_deref());
    tracing::debug!(base_url = %config.base_url, source = %config.source, "resolved backend");

    match cli.command {
        Commands::Ask {
            question,
            image,
            require_image,
        } => ask(&config, question, image, require_image).await?,
        Commands::Chat => {
            let orchestrator =
                Orchestrator::new(SubmissionStore::new(), HttpGateway::from_config(&config));
            handler::run_chat(&orchestrator).await?
        }
        Commands::Health => health(&config).await?,
        Commands::Config => ui::print_config(&config),
    }

    Ok(())
}

async fn ask(
    config: &Config,
    question: String,
    image: Option<PathBuf>,
    require_image: bool,
) -> Result<()> {
    let store = SubmissionStore::new();
    store.set_question_text(question);

    if let Some(path) = image {
        let image = ImageAttachment::from_path(&path).await?;
        store.set_attached_image(Some(image), &DataUrlPreview).await?;
    }

    let orchestrator = Orchestrator::new(store, HttpGateway::from_config(config))
        .with_image_required(require_image);

    ui::print_thinking(orchestrator.store().attached_file_name().as_deref());
    match orchestrator.submit().await? {
        SubmitOutcome::Answered(answer) => {
            ui::print_answer(&answer);
            Ok(())
        }
        other => Err(anyhow!(other.message().unwrap_or("Failed to get answer").to_string())),
    }
}

async fn health(config: &Config) -> Result<()> {
    let gateway = HttpGateway::from_config(config);
    let status = gateway
        .health()
        .await
        .map_err(|e| anyhow!("Backend at {} is unreachable: {}", gateway.base_url(), e))?;
    ui::print_health(gateway.base_url(), &status);
    Ok(())
}
