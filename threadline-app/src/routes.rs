use crate::error::AppError;
use crate::orchestrator::Orchestrator;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use threadline_common::Message;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

#[derive(Debug, Deserialize)]
pub struct LinkRef {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct InitializeRequest {
    #[serde(default)]
    pub links: Option<Vec<LinkRef>>,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub foundation: String,
    pub history: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub struct DebugRequest {
    pub code: String,
    pub language: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/initialize", post(handle_initialize))
        .route("/api/chat", post(handle_chat))
        .route("/api/debug", post(handle_debug))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn logged(route: &'static str) -> impl Fn(AppError) -> AppError {
    move |e| {
        error!(target: "app.routes", route, error = %e, "request failed");
        e
    }
}

async fn handle_initialize(
    State(state): State<AppState>,
    payload: Result<Json<InitializeRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let req = body(payload)?;
    let links: Vec<String> = req
        .links
        .unwrap_or_default()
        .into_iter()
        .map(|l| l.url)
        .collect();
    let foundation = state
        .orchestrator
        .initialize(&links, &req.title)
        .await
        .map_err(logged("initialize"))?;
    Ok(Json(json!({ "success": true, "foundation": foundation })))
}

async fn handle_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let req = body(payload)?;
    let reply = state
        .orchestrator
        .chat(&req.foundation, req.history)
        .await
        .map_err(logged("chat"))?;
    Ok(Json(json!({ "success": true, "reply": reply })))
}

async fn handle_debug(
    State(state): State<AppState>,
    payload: Result<Json<DebugRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let req = body(payload)?;
    let trace = state
        .orchestrator
        .debug(&req.code, &req.language)
        .await
        .map_err(logged("debug"))?;
    Ok(Json(json!({ "success": true, "trace": trace })))
}

async fn handle_health() -> &'static str {
    "OK"
}
