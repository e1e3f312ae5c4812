use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Form, State};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateForm {
    pub username: String,
    /// Empty token requests auto-generation.
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    pub id: String,
}

/// Wire shape of a created registration. Field capitalisation is part of
/// the client contract.
#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    #[serde(rename = "Token")]
    pub token: String,
    #[serde(rename = "Username")]
    pub username: String,
}

/// `GET /registration/list`: JSON `{ token: username }`.
pub async fn list_registrations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HashMap<String, String>>, ApiError> {
    let registrations = state
        .registrations
        .list()?
        .into_iter()
        .map(|r| (r.token, r.username))
        .collect();
    Ok(Json(registrations))
}

/// `POST /registration/create`
pub async fn create_registration(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CreateForm>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    if form.username.is_empty() {
        return Err(ApiError::BadRequest("username must not be empty".into()));
    }
    let registration = state.registrations.create(&form.username, &form.token)?;
    Ok(Json(RegistrationResponse {
        token: registration.token,
        username: registration.username,
    }))
}

/// `POST /registration/delete`
pub async fn delete_registration(
    State(state): State<Arc<AppState>>,
    Form(form): Form<DeleteForm>,
) -> Result<&'static str, ApiError> {
    state.registrations.delete(&form.id)?;
    Ok("OK")
}
