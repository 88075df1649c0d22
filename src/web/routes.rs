//! Plain-text file endpoints plus the JSON health document.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::files::FileError;
use crate::AppContext;

pub async fn health(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    let uptime = ctx.started_at.elapsed().as_secs();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": uptime,
        "port": ctx.config.port,
    }))
}

/// `GET /code` — the code file as plain text.
pub async fn read_code(
    State(ctx): State<Arc<AppContext>>,
) -> Result<String, (StatusCode, String)> {
    ctx.files.read_code().await.map_err(error_response)
}

/// `POST /code` — overwrite the code file; responds with the literal
/// `success` marker the editor frontend expects.
pub async fn save_code(
    State(ctx): State<Arc<AppContext>>,
    body: String,
) -> Result<&'static str, (StatusCode, String)> {
    ctx.files.save_code(&body).await.map_err(error_response)?;
    Ok("success")
}

/// `PUT /code` — overwrite, execute with the configured interpreter, return
/// captured stdout + stderr.
pub async fn run_code(
    State(ctx): State<Arc<AppContext>>,
    body: String,
) -> Result<String, (StatusCode, String)> {
    ctx.files.run_code(&body).await.map_err(error_response)
}

/// `POST /createFile` — create the scratch file unless it already exists.
pub async fn create_file(
    State(ctx): State<Arc<AppContext>>,
) -> Result<&'static str, (StatusCode, String)> {
    ctx.files.create_scratch().await.map_err(error_response)?;
    Ok("created")
}

fn error_response(e: FileError) -> (StatusCode, String) {
    let status = match &e {
        FileError::AlreadyExists(_) => StatusCode::CONFLICT,
        FileError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}
