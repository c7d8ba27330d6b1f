use waypost_core::ServerConfig;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize the application (telemetry, reporter, routes)
    let (_state, router) = waypost_api::setup::initialize_app(config.clone())?;

    // Start the server
    waypost_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
