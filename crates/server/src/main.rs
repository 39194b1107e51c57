mod api;
mod router;
mod sessions;
mod state;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    helpdesk_core::config::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let config = helpdesk_core::Config::from_env();
    config.log_summary();

    std::fs::create_dir_all(&config.storage.upload_dir)?;
    if let Some(parent) = config.storage.index_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let state = Arc::new(state::AppState::initialize(config)?);
    let app = router::build_router(state.clone());

    let addr = format!(
        "{}:{}",
        state.config.server.host, state.config.server.port
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
