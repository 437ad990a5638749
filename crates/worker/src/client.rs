use std::time::Duration;

use bytes::Bytes;
use reqwest::{header::CONTENT_TYPE, Response, StatusCode};
use serde_json::json;
use tracing::{debug, warn};

use vidqueue_core::models::{JobId, TaskPayload};

use crate::error::{WorkerError, WorkerResult};

const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// 产物提交结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    Accepted,
    /// 调用方已断开或任务已被处理
    ClientGone,
}

/// 分发服务的HTTP客户端
#[derive(Debug, Clone)]
pub struct DispatcherClient {
    base_url: String,
    worker_id: String,
    http_client: reqwest::Client,
}

impl DispatcherClient {
    pub fn new(
        server_url: &str,
        worker_id: impl Into<String>,
        request_timeout: Duration,
    ) -> WorkerResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            base_url: server_url.trim_end_matches('/').to_string(),
            worker_id: worker_id.into(),
            http_client,
        })
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 拉取一个任务，没有任务时返回 `None`
    pub async fn poll_task(&self) -> WorkerResult<Option<TaskPayload>> {
        let url = format!("{}/api/worker/get-task", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("workerId", self.worker_id.as_str())])
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let task = response.json::<Option<TaskPayload>>().await?;
        if let Some(task) = &task {
            debug!(worker_id = %self.worker_id, job_id = %task.job_id, "拉取到任务");
        }
        Ok(task)
    }

    pub async fn submit_result(&self, job_id: JobId, artifact: Bytes) -> WorkerResult<SubmitStatus> {
        let url = format!("{}/api/worker/submit-result/{}", self.base_url, job_id);
        let response = self
            .http_client
            .post(&url)
            .query(&[("workerId", self.worker_id.as_str())])
            .header(CONTENT_TYPE, VIDEO_CONTENT_TYPE)
            .body(artifact)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            warn!(job_id = %job_id, "调用方已断开，产物被丢弃");
            return Ok(SubmitStatus::ClientGone);
        }
        ensure_success(response).await?;
        Ok(SubmitStatus::Accepted)
    }

    pub async fn report_error(&self, job_id: JobId, message: &str) -> WorkerResult<()> {
        let url = format!("{}/api/worker/report-error/{}", self.base_url, job_id);
        let response = self
            .http_client
            .post(&url)
            .query(&[("workerId", self.worker_id.as_str())])
            .json(&json!({ "error": message }))
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> WorkerResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(WorkerError::UnexpectedStatus { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client =
            DispatcherClient::new("http://localhost:3000/", "worker_00000001", Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
        assert_eq!(client.worker_id(), "worker_00000001");
    }
}
