use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("连接分发服务失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("分发服务返回异常状态 {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    /// 渲染失败，消息原样上报给分发服务
    #[error("{0}")]
    Render(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type WorkerResult<T> = std::result::Result<T, WorkerError>;
