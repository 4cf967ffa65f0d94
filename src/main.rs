use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use diabetes_risk_service::{AppConfig, ModelRegistry, build_router, run_conversion};
use diabetes_risk_service::smoke::SmokeClient;

#[derive(Parser)]
#[command(name = "diabetes-risk", version)]
#[command(about = "Operational tooling for the diabetes risk model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the prediction API server
    Serve,
    /// Convert the trained model into the portable graph format
    Convert {
        /// Trained model artifact
        #[arg(long, env = "MODEL_PATH")]
        model: Option<PathBuf>,
        /// Model metadata document
        #[arg(long, env = "METADATA_PATH")]
        metadata: Option<PathBuf>,
        /// Output graph path
        #[arg(long, env = "GRAPH_PATH")]
        output: Option<PathBuf>,
    },
    /// Run the deployment smoke checks
    Smoke {
        /// Base URL of the deployed instance
        #[arg(long, env = "API_URL")]
        base_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Arc::new(AppConfig::from_env()?);

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Convert {
            model,
            metadata,
            output,
        } => {
            let model = model.unwrap_or_else(|| config.model_path.clone());
            let metadata = metadata.unwrap_or_else(|| config.metadata_path.clone());
            let output = output.unwrap_or_else(|| config.graph_path.clone());
            run_conversion(&model, &metadata, &output)?;
            Ok(())
        }
        Commands::Smoke { base_url } => {
            let base_url = base_url.unwrap_or_else(|| config.smoke_base_url.clone());
            SmokeClient::new(&base_url).run_all().await;
            Ok(())
        }
    }
}

async fn serve(config: Arc<AppConfig>) -> anyhow::Result<()> {
    tracing::info!(?config.listen_addr, "loading model artifacts");

    let registry = Arc::new(ModelRegistry::initialize(config.as_ref())?);
    let router = build_router(config.clone(), registry);

    let listener = TcpListener::bind(config.listen_addr).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "REST server ready");

    axum::serve(listener, router).await?;

    Ok(())
}

fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,hyper=warn,axum::rejection=trace".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
