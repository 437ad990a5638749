use thiserror::Error;

/// 分发器错误类型定义
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("分发器不可用")]
    DispatcherUnavailable,

    #[error("任务执行失败: {0}")]
    JobFailed(String),

    #[error("任务已放弃: {0}")]
    JobAbandoned(String),

    #[error("等待任务结果超时")]
    CallerTimeout,
}

/// 统一的Result类型
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
