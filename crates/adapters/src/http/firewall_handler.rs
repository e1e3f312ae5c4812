use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use super::state::AppState;

#[derive(Debug, Serialize)]
pub struct UserRulesResponse {
    pub public: Vec<String>,
    pub mfa: Vec<String>,
}

/// `GET /firewall/list`: dump every user's tries as canonical rule text.
pub async fn list_rules(
    State(state): State<Arc<AppState>>,
) -> Json<HashMap<String, UserRulesResponse>> {
    let rules = state
        .session
        .dump_rules()
        .into_iter()
        .map(|(username, rules)| {
            (
                username,
                UserRulesResponse {
                    public: rules.public,
                    mfa: rules.mfa,
                },
            )
        })
        .collect();
    Json(rules)
}
