//! Spendie Web Server
//!
//! Axum-based HTTP surface for the Spendie expense tracker:
//! - Chat webhook (`POST /webhook/:secret`) answering Telegram-style updates
//! - JSON command API (`POST /api/commands`) and CSV export
//! - Liveness endpoints (`/`, `/health`, `/ping`)
//!
//! Security features:
//! - API calls must name their owner in a header set by an authenticating proxy
//!   (secure by default, use --no-auth for local dev)
//! - Webhook path secret compared in constant time
//! - Restrictive CORS policy
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use spendie_core::{ChatBot, Config, Database, Dispatcher, ErrorKind, ReportFormatter};

mod handlers;

/// Header carrying the authenticated owner of an API request
pub const OWNER_HEADER: &str = "x-spendie-owner";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether API calls must carry the owner header (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only in production)
    pub allowed_origins: Vec<String>,
    /// Path secret for the chat webhook; `None` disables it
    pub webhook_secret: Option<String>,
    /// Owner for API calls without the header when auth is not required
    pub default_owner: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            webhook_secret: None,
            default_owner: "local".to_string(),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub bot: ChatBot,
    pub formatter: ReportFormatter,
    pub config: ServerConfig,
}

/// Owner named by the request header, if any
fn header_owner(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(OWNER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Owner for an API request: the header, or the default owner when auth is off
pub fn get_owner(headers: &HeaderMap, config: &ServerConfig) -> String {
    header_owner(headers)
        .map(str::to_string)
        .unwrap_or_else(|| config.default_owner.clone())
}

/// Authentication middleware - rejects API calls without an owner
///
/// The owner header is trusted as-is, so the server must sit behind a proxy
/// that authenticates users and sets it.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        return next.run(request).await;
    }

    if let Some(owner) = header_owner(request.headers()) {
        info!(owner, path = %request.uri().path(), "Authenticated via owner header");
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no owner header");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Create the application router
pub fn create_router(db: Database, app: &Config, config: ServerConfig) -> Router {
    let dispatcher = Dispatcher::new(db, app);
    let formatter = ReportFormatter::new(&app.currency);
    let bot = ChatBot::new(dispatcher.clone(), formatter.clone());

    if config.webhook_secret.is_none() {
        info!("ℹ️  Chat webhook disabled (set SPENDIE_WEBHOOK_SECRET to enable it)");
    }

    let state = Arc::new(AppState {
        dispatcher,
        bot,
        formatter,
        config: config.clone(),
    });

    let api_routes = Router::new()
        .route("/commands", post(handlers::run_command))
        .route("/export", get(handlers::export_csv))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                header::CONTENT_TYPE,
                header::HeaderName::from_static(OWNER_HEADER),
            ])
    };

    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/ping", get(handlers::ping))
        .route("/webhook/:secret", post(handlers::webhook))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    app: &Config,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    }

    let router = create_router(db, app, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();

        let (status, message) = match err.downcast_ref::<spendie_core::Error>() {
            Some(core) if core.kind() == ErrorKind::Validation => {
                (StatusCode::BAD_REQUEST, core.to_string())
            }
            Some(core) if core.kind() == ErrorKind::NotFound => {
                (StatusCode::NOT_FOUND, core.to_string())
            }
            Some(core) if core.kind() == ErrorKind::Conflict => {
                (StatusCode::CONFLICT, core.to_string())
            }
            // Retries exhausted; the message names the operation, not the cause
            Some(core) if matches!(core, spendie_core::Error::Unavailable { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, core.to_string())
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            ),
        };

        let internal = match status {
            StatusCode::INTERNAL_SERVER_ERROR | StatusCode::SERVICE_UNAVAILABLE => Some(err),
            _ => None,
        };

        Self {
            status,
            message,
            internal,
        }
    }
}

#[cfg(test)]
mod tests;
