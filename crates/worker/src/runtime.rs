use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use vidqueue_core::models::TaskPayload;

use crate::client::{DispatcherClient, SubmitStatus};
use crate::error::WorkerResult;
use crate::executor::RenderExecutor;

/// 生成 `worker_<8位十六进制>` 形式的Worker ID
pub fn generate_worker_id() -> String {
    format!("worker_{:08x}", rand::random::<u32>())
}

/// Worker轮询循环
pub struct WorkerRuntime {
    client: DispatcherClient,
    executor: Arc<dyn RenderExecutor>,
    poll_interval: Duration,
}

impl WorkerRuntime {
    pub fn new(
        client: DispatcherClient,
        executor: Arc<dyn RenderExecutor>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            executor,
            poll_interval,
        }
    }

    pub fn worker_id(&self) -> &str {
        self.client.worker_id()
    }

    /// 持续轮询直到收到关闭信号
    ///
    /// 处理完一个任务后立即再次轮询，只有队列为空或请求失败时才等待。
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            worker_id = %self.worker_id(),
            server = %self.client.base_url(),
            executor = %self.executor.name(),
            "Worker启动"
        );

        loop {
            let handled = tokio::select! {
                _ = shutdown_rx.recv() => break,
                result = self.run_once() => match result {
                    Ok(handled) => handled,
                    Err(e) => {
                        warn!(worker_id = %self.worker_id(), error = %e, "轮询失败，稍后重试");
                        false
                    }
                },
            };

            if handled {
                continue;
            }

            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!(worker_id = %self.worker_id(), "Worker已停止");
    }

    /// 执行一轮拉取，返回是否处理了任务
    pub async fn run_once(&self) -> WorkerResult<bool> {
        let Some(task) = self.client.poll_task().await? else {
            return Ok(false);
        };
        self.process(task).await?;
        Ok(true)
    }

    async fn process(&self, task: TaskPayload) -> WorkerResult<()> {
        let job_id = task.job_id;
        info!(
            worker_id = %self.worker_id(),
            job_id = %job_id,
            images = task.images.len(),
            "处理任务"
        );

        match self.executor.render(&task).await {
            Ok(artifact) => {
                if self.client.submit_result(job_id, artifact).await? == SubmitStatus::Accepted {
                    info!(job_id = %job_id, "产物已提交");
                }
            }
            Err(e) => {
                error!(job_id = %job_id, error = %e, "渲染失败");
                self.client.report_error(job_id, &e.to_string()).await?;
            }
        }
        Ok(())
    }
}
