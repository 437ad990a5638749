use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use vidqueue_core::models::{JobId, WorkerInfo, WorkerStatus};

/// 轮询Worker的登记表
///
/// Worker没有显式注册，首次轮询即被登记；空闲且长时间未轮询的会被清理。
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: HashMap<String, WorkerInfo>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 刷新存活时间，未知Worker以Idle状态登记；返回是否为新登记
    pub fn touch(&mut self, worker_id: &str, now: DateTime<Utc>) -> bool {
        match self.workers.get_mut(worker_id) {
            Some(worker) => {
                worker.last_seen = now;
                false
            }
            None => {
                debug!(worker_id, "登记新Worker");
                self.workers
                    .insert(worker_id.to_string(), WorkerInfo::new(worker_id, now));
                true
            }
        }
    }

    pub fn mark_busy(&mut self, worker_id: &str, job_id: JobId, now: DateTime<Utc>) -> bool {
        let Some(worker) = self.workers.get_mut(worker_id) else {
            return false;
        };
        worker.status = WorkerStatus::Busy;
        worker.current_job = Some(job_id);
        worker.busy_since = Some(now);
        worker.last_seen = now;
        true
    }

    pub fn mark_idle(&mut self, worker_id: &str, now: DateTime<Utc>) -> bool {
        let Some(worker) = self.workers.get_mut(worker_id) else {
            return false;
        };
        worker.status = WorkerStatus::Idle;
        worker.current_job = None;
        worker.busy_since = None;
        worker.last_seen = now;
        true
    }

    /// 清理空闲且超时未联系的Worker，忙碌的Worker不受影响
    pub fn sweep(&mut self, now: DateTime<Utc>, timeout: Duration) -> Vec<String> {
        let stale: Vec<String> = self
            .workers
            .values()
            .filter(|worker| worker.is_stale(now, timeout))
            .map(|worker| worker.id.clone())
            .collect();

        for worker_id in &stale {
            self.workers.remove(worker_id);
        }
        stale
    }

    /// 持有任务超过期限的忙碌Worker及其任务
    pub fn overdue_busy(&self, now: DateTime<Utc>, deadline: Duration) -> Vec<(String, JobId)> {
        self.workers
            .values()
            .filter(|worker| worker.is_overdue(now, deadline))
            .filter_map(|worker| worker.current_job.map(|job_id| (worker.id.clone(), job_id)))
            .collect()
    }

    /// 按首次出现时间排序的只读副本
    pub fn snapshot(&self) -> Vec<WorkerInfo> {
        let mut workers: Vec<WorkerInfo> = self.workers.values().cloned().collect();
        workers.sort_by(|a, b| a.first_seen.cmp(&b.first_seen).then_with(|| a.id.cmp(&b.id)));
        workers
    }

    pub fn get(&self, worker_id: &str) -> Option<&WorkerInfo> {
        self.workers.get(worker_id)
    }

    pub fn remove(&mut self, worker_id: &str) -> Option<WorkerInfo> {
        self.workers.remove(worker_id)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}
