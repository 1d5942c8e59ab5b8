//! Public status page for front-end identification.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::config::Settings;

/// Structured status.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Status {
    name: String,
    version: String,
    debug: bool,
}

/// Public server status.
pub async fn status(State(settings): State<Arc<Settings>>) -> Json<Status> {
    Json(Status {
        name: env!("CARGO_CRATE_NAME").into(),
        version: env!("CARGO_PKG_VERSION").into(),
        debug: settings.debug,
    })
}
