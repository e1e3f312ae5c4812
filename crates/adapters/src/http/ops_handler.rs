use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use infrastructure::config::GatewayConfig;
use tracing::info;

use super::error::ApiError;
use super::state::AppState;

/// `POST /config/reload`: re-read the config file, re-parse every user's
/// ACLs, swap tables, and reconcile the device set.
pub async fn reload_config(State(state): State<Arc<AppState>>) -> Result<&'static str, ApiError> {
    let config = GatewayConfig::load(&state.config_path)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state
        .session
        .set_session_limits(config.max_session_ns(), config.inactivity_ns())?;

    state
        .reload
        .reload(
            &config.user_acls(),
            &config.device_specs(),
            state.resolver.as_ref(),
        )
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok("OK")
}

/// `GET /version`
pub async fn version(State(state): State<Arc<AppState>>) -> String {
    format!("wireward {}", state.version)
}

/// `GET /version/bpf`: SHA-256 of the loaded offload object.
pub async fn version_bpf(State(state): State<Arc<AppState>>) -> String {
    match state.ebpf.lock().await.as_ref() {
        Some(handle) => handle.digest().to_string(),
        None => "unloaded".to_string(),
    }
}

/// `GET /shutdown`: ask the daemon to drain and exit.
pub async fn shutdown(State(state): State<Arc<AppState>>) -> &'static str {
    info!("shutdown requested over control socket");
    state.shutdown.cancel();
    "shutting down"
}

/// `GET /ebpf/pin`
pub async fn pin_ebpf(State(state): State<Arc<AppState>>) -> Result<&'static str, ApiError> {
    match state.ebpf.lock().await.as_mut() {
        Some(handle) => {
            handle
                .pin(&state.pin_dir)
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            Ok("OK")
        }
        None => Err(ApiError::ServiceUnavailable("eBPF is not loaded".into())),
    }
}

/// `GET /ebpf/unpin`
pub async fn unpin_ebpf(State(state): State<Arc<AppState>>) -> Result<&'static str, ApiError> {
    match state.ebpf.lock().await.as_mut() {
        Some(handle) => {
            handle
                .unpin(&state.pin_dir)
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            Ok("OK")
        }
        None => Err(ApiError::ServiceUnavailable("eBPF is not loaded".into())),
    }
}

/// `GET /metrics`: Prometheus text exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state.metrics.encode().unwrap_or_default();
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
