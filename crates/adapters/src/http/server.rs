use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::net::UnixListener;
use tracing::info;

use infrastructure::constants::SOCKET_MODE;

use super::router::build_router;
use super::state::AppState;

/// Run the control server on a Unix socket.
///
/// A stale socket file from a previous run is removed first. The socket is
/// chmodded to 0600 before the first request is accepted; all privileged
/// operations ride on filesystem permissions, not in-band auth. Shuts down
/// gracefully when `shutdown` resolves, draining in-flight requests.
pub async fn run_control_server(
    state: Arc<AppState>,
    socket_path: &Path,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    match std::fs::remove_file(socket_path) {
        Ok(()) => info!(path = %socket_path.display(), "removed stale control socket"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let listener = UnixListener::bind(socket_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(SOCKET_MODE))?;
    }

    let router = build_router(state);
    info!(path = %socket_path.display(), "control socket listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
