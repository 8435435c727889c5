use balance_engine::server::BalanceServer;
use balance_engine::Config;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Balance Engine starting...");

    // Load configuration
    let config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;

    info!(
        "Configuration loaded - gRPC port: {}, HTTP port: {}",
        config.server.grpc_port, config.server.http_port
    );

    // Create and start server
    let server = BalanceServer::new(config).await?;

    info!("Balance Engine initialized successfully");

    server.start().await?;

    Ok(())
}
