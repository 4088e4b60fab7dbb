use mapi_tests::{LiveSettings, live_demo};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mapi=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    live_demo(LiveSettings::from_env()?).await?;
    Ok(())
}
