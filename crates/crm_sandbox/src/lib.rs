//! Local stand-in for the CRM host: records, attachments, server-side
//! functions, blueprint transitions and popup close, all in memory.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{Ack, FileAttachment, FunctionExecuteRequest, RecordEnvelope, UpdateRecordRequest},
};
use tokio::sync::Mutex;
use tracing::{info, warn};

pub mod config;
pub mod store;

pub use store::{SandboxCall, SandboxStore, StoredAttachment};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Default)]
pub struct SandboxState {
    store: Mutex<SandboxStore>,
}

impl SandboxState {
    pub fn new(store: SandboxStore) -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(store),
        })
    }

    pub async fn snapshot(&self) -> SandboxStore {
        self.store.lock().await.clone()
    }
}

pub fn build_router(state: Arc<SandboxState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/crm/:module/:id", get(fetch_record).put(update_record))
        .route("/crm/:module/:id/attachments", post(attach_file))
        .route("/functions/:name/execute", post(execute_function))
        .route("/blueprint/:module/:id/proceed", post(proceed_blueprint))
        .route("/ui/popup/close-reload", post(close_reload))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn fetch_record(
    State(state): State<Arc<SandboxState>>,
    Path((module, id)): Path<(String, String)>,
) -> ApiResult<RecordEnvelope> {
    let record = state
        .store
        .lock()
        .await
        .fetch(&module, &id)
        .map_err(reject)?;
    Ok(Json(RecordEnvelope { data: vec![record] }))
}

async fn update_record(
    State(state): State<Arc<SandboxState>>,
    Path((module, id)): Path<(String, String)>,
    Json(req): Json<UpdateRecordRequest>,
) -> ApiResult<Ack> {
    let mut store = state.store.lock().await;
    let mut updated = 0;
    for fields in req.data {
        store.update(&module, &id, fields).map_err(reject)?;
        updated += 1;
    }
    if updated == 0 {
        return Err(reject(ApiError::validation("update request carries no data")));
    }
    info!(%module, %id, "record updated");
    Ok(Json(Ack::success("record updated")))
}

async fn attach_file(
    State(state): State<Arc<SandboxState>>,
    Path((module, id)): Path<(String, String)>,
    Json(req): Json<FileAttachment>,
) -> ApiResult<Ack> {
    let attachment_id = state
        .store
        .lock()
        .await
        .attach(&module, &id, &req.name, &req.content)
        .map_err(reject)?;
    info!(%module, %id, %attachment_id, file_name = %req.name, "attachment stored");
    Ok(Json(Ack::success(attachment_id.to_string())))
}

async fn execute_function(
    State(state): State<Arc<SandboxState>>,
    Path(name): Path<String>,
    Json(req): Json<FunctionExecuteRequest>,
) -> ApiResult<Value> {
    let response = state
        .store
        .lock()
        .await
        .execute(&name, &req.arguments)
        .map_err(reject)?;
    info!(function = %name, "function executed");
    Ok(Json(response))
}

async fn proceed_blueprint(
    State(state): State<Arc<SandboxState>>,
    Path((module, id)): Path<(String, String)>,
) -> ApiResult<Ack> {
    let transitions = state
        .store
        .lock()
        .await
        .proceed(&module, &id)
        .map_err(reject)?;
    info!(%module, %id, transitions, "blueprint proceeded");
    Ok(Json(Ack::success(format!("transition {transitions}"))))
}

async fn close_reload(State(state): State<Arc<SandboxState>>) -> Json<Ack> {
    state.store.lock().await.close_reload();
    info!("popup closed");
    Json(Ack::success("popup closed"))
}

fn reject(error: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match error.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(status = status.as_u16(), "request rejected: {}", error.message);
    (status, Json(error))
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
