use savings_optimizer::{api::start_server, AppConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    info!("🚀 Savings Optimizer - API Server");
    info!("📍 Port: {}", config.port);

    let table = config.load_tiers()?;
    info!(
        products = table.products().count(),
        increment = config.optimizer.increment,
        timeout_secs = config.optimize_timeout.as_secs(),
        "✅ Rate sheet ready"
    );

    info!("📡 Starting API server...");
    start_server(Arc::new(table), Arc::new(config)).await?;

    Ok(())
}
