//! Liveness endpoint that also reports the state of the store connection.

use rocket::serde::json::Json;
use rocket::{State, get};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::db::ConnectionState;
use crate::store::EmailStore;

/// Basic response payload describing API health.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    /// Always `ok` while the process is serving requests.
    pub status: String,
    /// Connection cache state: `unconnected`, `connecting`, `connected` or `failed`.
    pub database: String,
}

fn state_label(state: ConnectionState) -> String {
    serde_json::to_value(state)
        .ok()
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{state:?}").to_lowercase())
}

/// Health check that never triggers a connection attempt.
#[openapi(tag = "Health")]
#[get("/health")]
pub fn health_check(store: &State<EmailStore>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        database: state_label(store.connection_state()),
    })
}
