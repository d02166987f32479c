use std::net::SocketAddr;

use crm_sandbox::{
    build_router,
    config::{load_settings, load_store},
    store::{DEMO_ACCOUNT_ID, DEMO_APPLICATION_ID},
    SandboxState,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings();
    let store = load_store(&settings).map_err(|error| {
        error!(fixture = ?settings.fixture_path, "failed to seed sandbox: {error:#}");
        error
    })?;
    if settings.fixture_path.is_none() {
        info!(
            application_id = DEMO_APPLICATION_ID,
            account_id = DEMO_ACCOUNT_ID,
            "seeded demo records"
        );
    }

    let app = build_router(SandboxState::new(store));
    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "crm sandbox listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
