use bytes::Bytes;

use super::job::TaskPayload;
use crate::errors::{DispatchError, DispatchResult};

/// 交付给等待中调用方的任务结果
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Worker提交了渲染产物
    Completed { artifact: Bytes, filename: String },
    /// Worker上报了失败原因
    Failed { reason: String },
    /// 分发器放弃了该任务（重试耗尽或服务关闭）
    Abandoned { reason: String },
}

impl JobOutcome {
    /// 转换为调用方视角的结果：成功返回 (产物, 文件名)
    pub fn into_result(self) -> DispatchResult<(Bytes, String)> {
        match self {
            JobOutcome::Completed { artifact, filename } => Ok((artifact, filename)),
            JobOutcome::Failed { reason } => Err(DispatchError::JobFailed(reason)),
            JobOutcome::Abandoned { reason } => Err(DispatchError::JobAbandoned(reason)),
        }
    }
}

/// 提交结果/错误后的投递情况
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// 已交付给等待中的调用方
    Delivered,
    /// 没有等待的调用方（已断开、重复提交或未知任务）
    NoRecipient,
}

/// 一次Worker轮询的结果
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// 分配到任务
    Assigned(TaskPayload),
    /// 队列为空
    NoWork,
    /// Worker仍持有未完成的任务，不再分配
    Busy,
}

impl PollOutcome {
    /// 线路上的载荷：没有任务时为 None（序列化为 null）
    pub fn into_payload(self) -> Option<TaskPayload> {
        match self {
            PollOutcome::Assigned(payload) => Some(payload),
            PollOutcome::NoWork | PollOutcome::Busy => None,
        }
    }
}
