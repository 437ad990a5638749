use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use vidqueue_core::models::TaskPayload;

use crate::error::{WorkerError, WorkerResult};

/// 渲染执行器
#[async_trait]
pub trait RenderExecutor: Send + Sync {
    fn name(&self) -> &str;

    /// 渲染一个任务，成功时返回产物字节
    async fn render(&self, task: &TaskPayload) -> WorkerResult<Bytes>;
}

/// 调用外部程序渲染：任务JSON写入stdin，stdout即产物
#[derive(Debug, Clone)]
pub struct CommandRenderExecutor {
    program: String,
    args: Vec<String>,
}

impl CommandRenderExecutor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// 从 `[程序, 参数...]` 形式的配置创建，命令为空时返回 `None`
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

#[async_trait]
impl RenderExecutor for CommandRenderExecutor {
    fn name(&self) -> &str {
        &self.program
    }

    async fn render(&self, task: &TaskPayload) -> WorkerResult<Bytes> {
        let start_time = Instant::now();
        let input = serde_json::to_vec(task)?;

        info!(job_id = %task.job_id, command = %self.program, "开始渲染");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WorkerError::Render(format!("启动渲染命令失败: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| WorkerError::Render("无法获取stdin".to_string()))?;
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = child.wait_with_output().await?;
        if let Ok(Err(e)) = writer.await {
            debug!(job_id = %task.job_id, error = %e, "渲染命令未读取完整输入");
        }

        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("渲染命令失败，退出码: {:?}", output.status.code())
            } else {
                stderr
            };
            return Err(WorkerError::Render(message));
        }

        if output.stdout.is_empty() {
            return Err(WorkerError::Render("渲染命令没有输出产物".to_string()));
        }

        info!(
            job_id = %task.job_id,
            bytes = output.stdout.len(),
            duration_ms = elapsed_ms,
            "渲染完成"
        );
        Ok(Bytes::from(output.stdout))
    }
}
