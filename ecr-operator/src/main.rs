//! ECR Operator binary
//!
//! `ecr-operator run` starts the controller; `ecr-operator crd` prints the
//! CustomResourceDefinition to install before running it.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use ecr_client::EcrRegistry;
use ecr_core::api::v1alpha1::ECR;
use ecr_operator::health::{self, Readiness};
use ecr_operator::{Config, controller};
use kube::CustomResourceExt;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ecr-operator")]
#[command(about = "Creates ECR repositories declared by ECR objects", long_about = None)]
struct Cli {
    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller (default)
    Run,
    /// Print the CustomResourceDefinition as YAML
    Crd,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Crd => print_crd(),
        Commands::Run => {
            init_tracing(cli.log_format);
            run().await
        }
    }
}

fn print_crd() -> Result<()> {
    let yaml = serde_yaml::to_string(&ECR::crd()).context("Failed to render CRD")?;
    print!("{yaml}");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ecr_operator=info,ecr_client=info,kube=warn".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

async fn run() -> Result<()> {
    info!("Starting ECR Operator");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate()?;
    info!(
        "Loaded configuration: region={}, namespace={}",
        config.region,
        config.watch_namespace.as_deref().unwrap_or("*")
    );

    let registry = Arc::new(EcrRegistry::connect(config.registry_config()).await);
    info!("Registry client initialized for region {}", registry.region());

    let client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let readiness = Readiness::default();
    let mut probes = tokio::spawn(health::serve(
        config.health_bind_addr.clone(),
        readiness.clone(),
    ));

    // A dead probe listener takes the operator down with it
    let result = tokio::select! {
        result = controller::run(client, &config, registry, readiness) => result,
        served = &mut probes => match served {
            Ok(Ok(())) => Err(anyhow!("Health probe server stopped")),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(anyhow::Error::new(e).context("Health probe task failed")),
        },
    };
    probes.abort();

    if let Err(e) = &result {
        error!("Controller error: {:#}", e);
    }
    result
}
