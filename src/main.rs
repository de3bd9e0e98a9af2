use clap::Parser;
use secret_cache::{
    cli::{apply_overrides, run, Cli},
    observability::{init_observability, log_config_info},
    AppConfig, APP_NAME, VERSION,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (optional - won't fail if missing)
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    apply_overrides(&cli, &mut config)?;

    init_observability(&config.observability)?;
    info!(app_name = APP_NAME, version = VERSION, "Starting secret cache");
    log_config_info(&config);

    let resolutions = run(cli, &config).await?;
    for resolution in &resolutions {
        println!("{}", resolution);
    }

    let failures = resolutions.iter().filter(|r| r.outcome.is_err()).count();
    info!(resolved = resolutions.len() - failures, failed = failures, "Resolution complete");
    Ok(())
}
