use std::fmt::Write as _;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Form, Query, State};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct UsernameForm {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    pub address: String,
    pub username: String,
    pub locked: bool,
    pub authorized: bool,
}

/// `GET /device/list?username=`: an empty username lists everything.
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<DeviceResponse>> {
    let devices = state
        .session
        .list_devices(&query.username)
        .into_iter()
        .map(|d| DeviceResponse {
            address: d.address.to_string(),
            username: d.username,
            locked: d.locked,
            authorized: d.authorized,
        })
        .collect();
    Json(devices)
}

/// `POST /device/delete`: removes every device belonging to the user.
pub async fn delete_device(
    State(state): State<Arc<AppState>>,
    Form(form): Form<UsernameForm>,
) -> Result<&'static str, ApiError> {
    state.session.remove_user(&form.username)?;
    Ok("OK")
}

/// `POST /device/lock`
pub async fn lock_device(
    State(state): State<Arc<AppState>>,
    Form(form): Form<UsernameForm>,
) -> Result<&'static str, ApiError> {
    state.session.lock_user(&form.username)?;
    Ok("OK")
}

/// `POST /device/unlock`
pub async fn unlock_device(
    State(state): State<Arc<AppState>>,
    Form(form): Form<UsernameForm>,
) -> Result<&'static str, ApiError> {
    state.session.unlock_user(&form.username)?;
    Ok("OK")
}

/// `GET /device/sessions`: plain-text listing of authorized devices.
pub async fn sessions(State(state): State<Arc<AppState>>) -> String {
    let sessions = state.session.sessions();
    if sessions.is_empty() {
        return "no active sessions\n".to_string();
    }

    let mut out = String::new();
    for device in sessions {
        let _ = writeln!(out, "{} {}", device.address, device.username);
    }
    out
}
