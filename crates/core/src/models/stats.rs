use serde::{Deserialize, Serialize};

use super::job::JobId;
use super::worker::WorkerInfo;

/// 进程生命周期内的累计计数，重启后归零
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchStats {
    /// 收到成功结果的任务数，调用方已断开的也计入；每个任务至多计一次
    pub total_jobs: u64,
    pub enqueued: u64,
    pub dispatched: u64,
    pub failed: u64,
    pub requeued: u64,
    pub abandoned: u64,
}

/// 队列中任务的只读视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedJobView {
    pub job_id: JobId,
    pub data: QueuedJobData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJobData {
    pub title: Option<String>,
}

/// 管理端统计快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatcherSnapshot {
    pub workers: Vec<WorkerInfo>,
    pub queue: Vec<QueuedJobView>,
    pub stats: DispatchStats,
}

impl QueuedJobView {
    pub fn new(job_id: JobId, title: Option<String>) -> Self {
        Self {
            job_id,
            data: QueuedJobData { title },
        }
    }
}
