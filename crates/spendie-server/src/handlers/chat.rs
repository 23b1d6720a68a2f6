//! Chat webhook handler
//!
//! Accepts Telegram-style updates and answers inline with a `sendMessage`
//! payload, so no outbound HTTP client is needed.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    /// Unix timestamp of the message
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
}

/// Reply returned in the webhook response body
#[derive(Debug, Serialize)]
pub struct SendMessage {
    pub method: &'static str,
    pub chat_id: i64,
    pub text: String,
}

impl Message {
    /// Expenses belong to the sender; the chat id stands in when there is none
    pub fn owner(&self) -> String {
        let id = self.from.as_ref().map(|u| u.id).unwrap_or(self.chat.id);
        format!("telegram:{}", id)
    }

    /// Relative dates resolve against the day the message was sent (UTC)
    pub fn sent_on(&self) -> NaiveDate {
        DateTime::<Utc>::from_timestamp(self.date, 0)
            .filter(|_| self.date > 0)
            .map(|dt| dt.date_naive())
            .unwrap_or_else(|| Utc::now().date_naive())
    }
}

/// Constant-time comparison of the path secret
fn secret_matches(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    provided.len() == expected.len() && bool::from(provided.ct_eq(expected))
}

/// POST /webhook/:secret - Answer one chat message
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    Path(secret): Path<String>,
    Json(update): Json<Update>,
) -> Result<Response, AppError> {
    let authorized = state
        .config
        .webhook_secret
        .as_deref()
        .is_some_and(|expected| secret_matches(&secret, expected));
    if !authorized {
        warn!("Rejected webhook call with unknown secret");
        return Err(AppError::not_found("Not found"));
    }

    let Some(message) = update.message else {
        debug!(update_id = update.update_id, "Ignoring update without a message");
        return Ok(StatusCode::OK.into_response());
    };
    let Some(text) = message.text.as_deref().filter(|t| !t.trim().is_empty()) else {
        debug!(update_id = update.update_id, "Ignoring message without text");
        return Ok(StatusCode::OK.into_response());
    };

    let owner = message.owner();
    let reply = state.bot.reply(&owner, text, message.sent_on());

    Ok(Json(SendMessage {
        method: "sendMessage",
        chat_id: message.chat.id,
        text: reply,
    })
    .into_response())
}
