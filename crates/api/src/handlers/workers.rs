use axum::{
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, info, warn};

use vidqueue_core::models::{Delivery, JobId, TaskPayload};

use crate::{
    error::ApiResult,
    response::{client_disconnected, error_received, submitted, ErrorAck},
    routes::AppState,
};

/// Worker请求携带的身份参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerQuery {
    pub worker_id: Option<String>,
}

impl WorkerQuery {
    fn worker_id(self) -> Option<String> {
        self.worker_id.filter(|id| !id.trim().is_empty())
    }
}

/// Worker上报的错误
#[derive(Debug, Deserialize)]
pub struct ErrorReport {
    pub error: Option<String>,
}

const UNKNOWN_WORKER_ERROR: &str = "Unknown worker error";

/// 拉取任务，没有任务时返回 `null`
pub async fn get_task(
    State(state): State<AppState>,
    Query(query): Query<WorkerQuery>,
) -> ApiResult<Json<Option<TaskPayload>>> {
    let outcome = state.dispatcher.poll(query.worker_id()).await?;
    Ok(Json(outcome.into_payload()))
}

/// 提交渲染产物（请求体为原始二进制）
///
/// 可选的 `workerId` 查询参数标识提交者。
pub async fn submit_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<WorkerQuery>,
    body: Bytes,
) -> ApiResult<Response> {
    info!(job_id = %job_id, bytes = body.len(), "收到任务结果");

    let Ok(job_id) = job_id.parse::<JobId>() else {
        warn!(job_id = %job_id, "无法识别的任务ID");
        return Ok(client_disconnected());
    };

    match state.dispatcher.complete(job_id, query.worker_id(), body).await? {
        Delivery::Delivered => Ok(submitted()),
        Delivery::NoRecipient => Ok(client_disconnected()),
    }
}

/// 上报任务失败，总是返回确认
pub async fn report_error(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(query): Query<WorkerQuery>,
    body: Bytes,
) -> ApiResult<Json<ErrorAck>> {
    let reason = serde_json::from_slice::<ErrorReport>(&body)
        .ok()
        .and_then(|report| report.error)
        .filter(|error| !error.is_empty())
        .unwrap_or_else(|| UNKNOWN_WORKER_ERROR.to_string());
    warn!(job_id = %job_id, error = %reason, "Worker上报任务失败");

    let Ok(job_id) = job_id.parse::<JobId>() else {
        debug!(job_id = %job_id, "无法识别的任务ID");
        return Ok(error_received());
    };

    if state
        .dispatcher
        .fail(job_id, query.worker_id(), reason)
        .await?
        == Delivery::NoRecipient
    {
        debug!(job_id = %job_id, "失败上报没有等待的调用方");
    }
    Ok(error_received())
}
