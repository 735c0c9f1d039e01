use clap::Parser;
use dermascan::config::Configuration;
use dermascan::error::AppError;
use dermascan::pipeline::HybridComposerBuilder;
use dermascan::pipeline::services::providers::AnalysisMode;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Analyze a facial photo with remote providers and local computer vision.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Encoded image (JPEG, PNG, ...)
    image: PathBuf,

    /// TOML configuration file
    #[arg(short, long, env = "DERMASCAN_CONFIG")]
    config: Option<PathBuf>,

    /// local-only, prefer-fast or auto; overrides the configuration
    #[arg(short, long)]
    mode: Option<AnalysisMode>,
}

// RUST_LOG takes precedence over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();
    let mut configuration = Configuration::load(args.config.as_deref())?;
    if let Some(mode) = args.mode {
        configuration.mode = mode;
    }

    init_logging(&configuration.log_level);
    info!("Analyzing {} in {} mode", args.image.display(), configuration.mode);

    let bytes = tokio::fs::read(&args.image).await?;
    let composer = HybridComposerBuilder::from_configuration(&configuration)
        .await?
        .build()?;
    let result = composer.analyze_bytes(&bytes).await?;

    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| AppError::Config(format!("Could not serialize result: {}", e)))?;
    println!("{}", json);
    Ok(())
}
