use std::{net::SocketAddr, sync::Arc};

use server::{build_router, config::load_settings, AppState};
use server_api::ApiContext;
use storage::WorkspaceStore;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings();
    let store = WorkspaceStore::new(&settings.workspace_dir)
        .await
        .map_err(|error| {
            error!(
                workspace = %settings.workspace_dir.display(),
                %error,
                "failed to open workspace; verify the directory is writable"
            );
            error
        })?;
    info!(workspace = %store.root().display(), "workspace ready");

    let state = AppState {
        api: ApiContext::new(store),
    };
    let app = build_router(Arc::new(state), settings.max_body_bytes);

    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;
    Ok(())
}
