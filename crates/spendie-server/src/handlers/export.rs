//! CSV export handler

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, Response, StatusCode},
};
use chrono::Utc;
use serde::Deserialize;
use spendie_core::{Command, DateRange, Outcome};
use tracing::info;

use crate::{get_owner, AppError, AppState};

/// Query parameters for expense export
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// Range preset, month or FROM..TO (everything if not specified)
    pub range: Option<String>,
    /// Only this category
    pub category: Option<String>,
}

/// GET /api/export - Download expenses as CSV
pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ExportQuery>,
) -> Result<Response<Body>, AppError> {
    let owner = get_owner(&headers, &state.config);
    let today = Utc::now().date_naive();

    let range = params
        .range
        .as_deref()
        .map(|r| DateRange::parse(r, today))
        .transpose()?;
    let command = Command::ExportCsv {
        range,
        category: params.category,
    };

    let Outcome::Csv { csv, rows } = state.dispatcher.dispatch(&owner, command)? else {
        return Err(AppError::bad_request("Export did not produce CSV"));
    };

    info!(owner = %owner, rows, "Exported expenses");

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"spendie-{}.csv\"", today),
        )
        .body(Body::from(csv))?;

    Ok(response)
}
