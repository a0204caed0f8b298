//! HTTP surface: a thin axum layer over the invocation entry point.
//!
//! Command invocations always answer 200 with an envelope; the success/error
//! distinction travels inside the body, not in the HTTP status. Only
//! transport-level problems (unroutable request, bad JSON syntax) surface as
//! HTTP errors, and those come from axum itself.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tower_http::cors::CorsLayer;

use crate::context::Context;
use crate::envelope::Envelope;
use crate::error::CommandError;
use crate::registry::{catalog, execute};

async fn post_command(
    Extension(ctx): Extension<Arc<Context>>,
    Path(name): Path<String>,
    body: Option<Json<Value>>,
) -> Json<Envelope> {
    let params = body.map_or(Value::Null, |Json(v)| v);
    Json(execute::invoke(&ctx, &name, &params).await)
}

async fn get_commands() -> Json<Value> {
    Json(catalog::to_json_schema())
}

async fn get_health() -> Json<Value> {
    Json(serde_json::json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub fn router(ctx: Arc<Context>) -> Router {
    Router::new()
        .route("/api/commands", get(get_commands))
        .route("/api/commands/{name}", post(post_command))
        .route("/api/health", get(get_health))
        .layer(CorsLayer::permissive())
        .layer(Extension(ctx))
}

/// Bind and serve until the process is stopped.
pub async fn serve(ctx: Arc<Context>, addr: SocketAddr) -> Result<(), CommandError> {
    let app = router(ctx);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(addr = %local, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
