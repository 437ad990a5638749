use metrics::{counter, gauge, Counter, Gauge};

/// 分发器指标
///
/// 未安装全局recorder时所有句柄都是空操作。
#[derive(Clone)]
pub struct DispatchMetrics {
    jobs_enqueued_total: Counter,
    jobs_dispatched_total: Counter,
    jobs_completed_total: Counter,
    jobs_failed_total: Counter,
    jobs_requeued_total: Counter,
    jobs_abandoned_total: Counter,
    workers_evicted_total: Counter,
    queue_depth: Gauge,
    active_workers: Gauge,
    pending_callers: Gauge,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self {
            jobs_enqueued_total: counter!("vidqueue_jobs_enqueued_total"),
            jobs_dispatched_total: counter!("vidqueue_jobs_dispatched_total"),
            jobs_completed_total: counter!("vidqueue_jobs_completed_total"),
            jobs_failed_total: counter!("vidqueue_jobs_failed_total"),
            jobs_requeued_total: counter!("vidqueue_jobs_requeued_total"),
            jobs_abandoned_total: counter!("vidqueue_jobs_abandoned_total"),
            workers_evicted_total: counter!("vidqueue_workers_evicted_total"),
            queue_depth: gauge!("vidqueue_queue_depth"),
            active_workers: gauge!("vidqueue_active_workers"),
            pending_callers: gauge!("vidqueue_pending_callers"),
        }
    }

    pub fn record_enqueued(&self) {
        self.jobs_enqueued_total.increment(1);
    }

    pub fn record_dispatched(&self) {
        self.jobs_dispatched_total.increment(1);
    }

    pub fn record_completed(&self) {
        self.jobs_completed_total.increment(1);
    }

    pub fn record_failed(&self) {
        self.jobs_failed_total.increment(1);
    }

    pub fn record_requeued(&self) {
        self.jobs_requeued_total.increment(1);
    }

    pub fn record_abandoned(&self) {
        self.jobs_abandoned_total.increment(1);
    }

    pub fn record_evicted(&self, count: usize) {
        self.workers_evicted_total.increment(count as u64);
    }

    pub fn update_gauges(&self, queue_depth: usize, active_workers: usize, pending_callers: usize) {
        self.queue_depth.set(queue_depth as f64);
        self.active_workers.set(active_workers as f64);
        self.pending_callers.set(pending_callers as f64);
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}
