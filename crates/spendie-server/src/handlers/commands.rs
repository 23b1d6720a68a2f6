//! JSON command API

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;
use spendie_core::{Command, Outcome};
use tracing::debug;

use crate::{get_owner, AppError, AppState};

#[derive(Serialize)]
pub struct CommandResponse {
    #[serde(flatten)]
    pub outcome: Outcome,
    /// The same reply the chat bot would send
    pub text: String,
}

/// POST /api/commands - Run one typed command for the request's owner
pub async fn run_command(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<CommandResponse>, AppError> {
    let owner = get_owner(&headers, &state.config);
    let command = Command::from_json(body)?;
    debug!(owner = %owner, command = command.name(), "API command");

    let outcome = state.dispatcher.dispatch(&owner, command)?;
    let text = state.formatter.render(&outcome);

    Ok(Json(CommandResponse { outcome, text }))
}
