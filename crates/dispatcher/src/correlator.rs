use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use vidqueue_core::models::{JobId, JobOutcome};

/// 挂起中的调用方请求
#[derive(Debug)]
pub struct PendingResponse {
    pub reply: oneshot::Sender<JobOutcome>,
    /// 交付产物时使用的附件文件名
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

impl PendingResponse {
    pub fn new(reply: oneshot::Sender<JobOutcome>, filename: String, now: DateTime<Utc>) -> Self {
        Self {
            reply,
            filename,
            created_at: now,
        }
    }

    /// 调用方是否已放弃等待（接收端已被丢弃）
    pub fn is_closed(&self) -> bool {
        self.reply.is_closed()
    }
}

/// 任务ID到挂起请求的映射
///
/// 每个条目最多被取出一次，取出即解除关联。
#[derive(Debug, Default)]
pub struct ResultCorrelator {
    pending: HashMap<JobId, PendingResponse>,
}

impl ResultCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, job_id: JobId, pending: PendingResponse) {
        self.pending.insert(job_id, pending);
    }

    pub fn take(&mut self, job_id: &JobId) -> Option<PendingResponse> {
        self.pending.remove(job_id)
    }

    /// 是否仍有调用方在等待该任务
    pub fn is_waiting(&self, job_id: &JobId) -> bool {
        self.pending
            .get(job_id)
            .is_some_and(|pending| !pending.is_closed())
    }

    /// 移除调用方已断开的条目，返回对应的任务ID
    pub fn prune_closed(&mut self) -> Vec<JobId> {
        let closed: Vec<JobId> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.is_closed())
            .map(|(job_id, _)| *job_id)
            .collect();

        for job_id in &closed {
            self.pending.remove(job_id);
        }
        closed
    }

    /// 取出全部条目，用于关闭时通知调用方
    pub fn drain(&mut self) -> Vec<(JobId, PendingResponse)> {
        self.pending.drain().collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
