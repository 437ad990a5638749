use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::job::JobId;

/// Worker节点信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerInfo {
    pub id: String,
    pub status: WorkerStatus,
    pub last_seen: DateTime<Utc>,
    pub first_seen: DateTime<Utc>,
    /// 当前绑定的任务，仅在Busy状态下存在
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_job: Option<JobId>,
    /// 最近一次被分配任务的时间
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub busy_since: Option<DateTime<Utc>>,
}

/// Worker状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Idle,
    Busy,
}

impl WorkerInfo {
    /// 首次轮询时创建，初始状态为Idle
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            status: WorkerStatus::Idle,
            last_seen: now,
            first_seen: now,
            current_job: None,
            busy_since: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.status, WorkerStatus::Busy)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.status, WorkerStatus::Idle)
    }

    /// 忙碌时长超过期限
    pub fn is_overdue(&self, now: DateTime<Utc>, deadline: Duration) -> bool {
        match (self.is_busy(), self.busy_since) {
            (true, Some(since)) => now - since > deadline,
            _ => false,
        }
    }

    /// 空闲且超过存活超时未联系，可被清理
    pub fn is_stale(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.is_idle() && now - self.last_seen > timeout
    }
}
