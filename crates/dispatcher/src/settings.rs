use std::time::Duration as StdDuration;

use chrono::Duration;

use vidqueue_core::config::DispatcherConfig;

/// 分发核心使用的运行参数
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub worker_timeout: Duration,
    pub sweep_interval: StdDuration,
    /// None表示忙碌Worker永不回收
    pub dispatch_timeout: Option<Duration>,
    pub max_dispatch_attempts: u32,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self::from(&DispatcherConfig::default())
    }
}

impl From<&DispatcherConfig> for DispatcherSettings {
    fn from(config: &DispatcherConfig) -> Self {
        Self {
            worker_timeout: Duration::seconds(config.worker_timeout_seconds as i64),
            sweep_interval: config.sweep_interval(),
            dispatch_timeout: config
                .dispatch_timeout()
                .map(|timeout| Duration::seconds(timeout.as_secs() as i64)),
            max_dispatch_attempts: config.max_dispatch_attempts,
        }
    }
}
