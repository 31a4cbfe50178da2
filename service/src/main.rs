use dataset_service::{AppState, ServiceConfig, StartupError, routes};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    init_logging();
    let config = ServiceConfig::from_env()?;
    let addr = config.socket_addr()?;
    info!(
        db = %config.db_path.display(),
        root = %config.dataset_root.display(),
        "opening dataset store"
    );

    let state = AppState::new(config)?;
    let app = routes::router(state)?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("dataset service listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}
