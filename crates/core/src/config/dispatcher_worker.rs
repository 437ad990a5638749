use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// 空闲Worker超过该时间未轮询即被清理
    pub worker_timeout_seconds: u64,
    pub sweep_interval_seconds: u64,
    /// create-video 请求等待结果的最长时间
    pub caller_timeout_seconds: u64,
    /// 忙碌Worker持有任务的最长时间，需显式开启；None或0表示忙碌Worker永不回收
    pub dispatch_timeout_seconds: Option<u64>,
    pub max_dispatch_attempts: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            worker_timeout_seconds: 10,
            sweep_interval_seconds: 5,
            caller_timeout_seconds: 1800,
            dispatch_timeout_seconds: None,
            max_dispatch_attempts: 2,
        }
    }
}

impl DispatcherConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.worker_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("Worker超时时间必须大于0"));
        }

        if self.sweep_interval_seconds == 0 {
            return Err(anyhow::anyhow!("清理间隔必须大于0"));
        }

        if self.caller_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("调用方等待超时必须大于0"));
        }

        if self.max_dispatch_attempts == 0 {
            return Err(anyhow::anyhow!("最大分发次数必须大于0"));
        }

        Ok(())
    }

    pub fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    pub fn caller_timeout(&self) -> Duration {
        Duration::from_secs(self.caller_timeout_seconds)
    }

    pub fn dispatch_timeout(&self) -> Option<Duration> {
        self.dispatch_timeout_seconds
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// 未配置时启动时随机生成 `worker_<8位十六进制>`
    pub worker_id: Option<String>,
    pub server_url: String,
    pub poll_interval_ms: u64,
    pub request_timeout_seconds: u64,
    /// 渲染命令及其参数，任务JSON写入stdin，stdout即产物
    pub render_command: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: None,
            server_url: "http://localhost:3000".to_string(),
            poll_interval_ms: 2000,
            request_timeout_seconds: 300,
            render_command: Vec::new(),
        }
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(worker_id) = &self.worker_id {
            if worker_id.trim().is_empty() {
                return Err(anyhow::anyhow!("Worker ID不能为空"));
            }
        }

        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(anyhow::anyhow!("服务地址格式无效: {}", self.server_url));
        }

        if self.poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("任务轮询间隔必须大于0"));
        }

        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("请求超时时间必须大于0"));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}
