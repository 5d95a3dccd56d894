// src/server.rs
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::audit::Auditor;
use crate::questions::split_questions;
use crate::scoring::{summarize, AuditSummary};
use crate::types::ResultRow;

pub struct Engine {
    pub auditor: Auditor,
    /// Used when a request does not name its own target.
    pub default_target: Option<String>,
}

#[derive(Deserialize)]
pub struct AuditReq {
    #[serde(default)]
    pub target: Option<String>,
    /// Raw multi-line input, one question per line.
    pub questions: String,
}

#[derive(Serialize, Deserialize)]
pub struct AuditResp {
    pub rows: Vec<ResultRow>,
    pub summary: AuditSummary,
}

pub async fn audit(
    State(engine): State<Arc<Engine>>,
    Json(req): Json<AuditReq>,
) -> Result<Json<AuditResp>, StatusCode> {
    let target = req
        .target
        .or_else(|| engine.default_target.clone())
        .filter(|t| !t.trim().is_empty())
        .ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
    let questions = split_questions(&req.questions);
    if questions.is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    info!(target = %target, questions = questions.len(), "audit requested");
    let rows = engine.auditor.run(&questions, target.trim()).await;
    let summary = summarize(&rows);
    Ok(Json(AuditResp { rows, summary }))
}

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new().route("/audit", post(audit)).with_state(engine)
}

pub async fn run_server(engine: Engine, addr: &str) -> anyhow::Result<()> {
    let app = router(Arc::new(engine));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
