use std::collections::HashMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use vidqueue_core::models::{
    Delivery, DispatchStats, DispatcherSnapshot, Job, JobId, JobOutcome, PollOutcome,
    QueuedJobView, VideoRequest,
};
use vidqueue_core::music::MusicCatalog;
use vidqueue_core::naming::attachment_filename;

use crate::correlator::{PendingResponse, ResultCorrelator};
use crate::metrics::DispatchMetrics;
use crate::queue::JobQueue;
use crate::registry::WorkerRegistry;
use crate::settings::DispatcherSettings;

/// 任务与执行它的Worker之间的绑定
///
/// 保存任务副本，以便超时回收时重新入队。
#[derive(Debug, Clone)]
pub struct Binding {
    pub worker_id: String,
    pub job: Job,
    pub dispatched_at: DateTime<Utc>,
    /// 被回收的前一次分发已交回结果，当前Worker的结果不再计数
    pub resolved: bool,
}

/// 一次清理的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub evicted_workers: Vec<String>,
    pub requeued_jobs: Vec<JobId>,
    pub abandoned_jobs: Vec<JobId>,
    pub orphaned_callers: Vec<JobId>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.evicted_workers.is_empty()
            && self.requeued_jobs.is_empty()
            && self.abandoned_jobs.is_empty()
            && self.orphaned_callers.is_empty()
    }
}

/// 分发核心状态机
///
/// 持有队列、Worker登记表、绑定表和挂起请求表。所有方法都是同步的，
/// 由单个actor任务串行调用，因此不存在并发分发同一任务的可能。
pub struct DispatchCore {
    queue: JobQueue,
    registry: WorkerRegistry,
    correlator: ResultCorrelator,
    bindings: HashMap<JobId, Binding>,
    stats: DispatchStats,
    settings: DispatcherSettings,
    music: MusicCatalog,
    metrics: DispatchMetrics,
}

impl DispatchCore {
    pub fn new(settings: DispatcherSettings, music: MusicCatalog) -> Self {
        Self {
            queue: JobQueue::new(),
            registry: WorkerRegistry::new(),
            correlator: ResultCorrelator::new(),
            bindings: HashMap::new(),
            stats: DispatchStats::default(),
            settings,
            music,
            metrics: DispatchMetrics::new(),
        }
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    /// 接收新请求：解析音乐、生成文件名、登记挂起请求并入队
    pub fn enqueue(
        &mut self,
        mut request: VideoRequest,
        reply: oneshot::Sender<JobOutcome>,
        now: DateTime<Utc>,
    ) -> JobId {
        request.music_url = self.music.resolve(request.music_url.take());
        let filename = attachment_filename(request.title.as_deref());

        let job = Job::new(request, now);
        let job_id = job.id;
        info!(
            job_id = %job_id,
            images = job.payload.images.len(),
            title = job.title().unwrap_or_default(),
            "任务已入队"
        );

        self.correlator
            .register(job_id, PendingResponse::new(reply, filename, now));
        self.queue.enqueue(job);

        self.stats.enqueued += 1;
        self.metrics.record_enqueued();
        self.refresh_gauges();
        job_id
    }

    /// 处理一次Worker轮询
    ///
    /// 忙碌中的Worker不会拿到第二个任务；调用方已断开的排队任务在此丢弃。
    pub fn poll(&mut self, worker_id: Option<&str>, now: DateTime<Utc>) -> PollOutcome {
        if let Some(worker_id) = worker_id {
            self.registry.touch(worker_id, now);
            if self.registry.get(worker_id).is_some_and(|w| w.is_busy()) {
                debug!(worker_id, "Worker仍在处理任务，不再分配");
                return PollOutcome::Busy;
            }
        }

        let mut job = loop {
            let Some(job) = self.queue.dequeue() else {
                self.refresh_gauges();
                return PollOutcome::NoWork;
            };
            if self.correlator.is_waiting(&job.id) {
                break job;
            }
            warn!(job_id = %job.id, "调用方已断开，丢弃排队任务");
            self.correlator.take(&job.id);
        };

        job.attempts += 1;
        let payload = job.payload.clone();

        match worker_id {
            Some(worker_id) => {
                info!(
                    job_id = %job.id,
                    worker_id,
                    attempt = job.attempts,
                    "分发任务"
                );
                self.bindings.insert(
                    job.id,
                    Binding {
                        worker_id: worker_id.to_string(),
                        job: job.clone(),
                        dispatched_at: now,
                        resolved: false,
                    },
                );
                self.registry.mark_busy(worker_id, job.id, now);
            }
            None => {
                info!(job_id = %job.id, "匿名轮询，任务分发后不做绑定");
            }
        }

        self.stats.dispatched += 1;
        self.metrics.record_dispatched();
        self.refresh_gauges();
        PollOutcome::Assigned(payload)
    }

    /// Worker提交渲染产物
    ///
    /// `worker_id` 为提交者；只有当前绑定的Worker才会被释放，
    /// 被回收的前一次分发迟到的结果照常交付给调用方。
    pub fn complete(
        &mut self,
        job_id: JobId,
        worker_id: Option<&str>,
        artifact: Bytes,
        now: DateTime<Utc>,
    ) -> Delivery {
        let fresh = self.release(&job_id, worker_id, now);
        let pending = self.correlator.take(&job_id);
        if fresh || pending.is_some() {
            self.stats.total_jobs += 1;
            self.metrics.record_completed();
        }

        let Some(pending) = pending else {
            warn!(job_id = %job_id, "收到结果但没有等待的调用方");
            self.refresh_gauges();
            return Delivery::NoRecipient;
        };

        let size = artifact.len();
        let outcome = JobOutcome::Completed {
            artifact,
            filename: pending.filename,
        };
        let delivery = match pending.reply.send(outcome) {
            Ok(()) => {
                info!(job_id = %job_id, bytes = size, "任务完成，结果已交付");
                Delivery::Delivered
            }
            Err(_) => {
                warn!(job_id = %job_id, "调用方已断开，丢弃结果");
                Delivery::NoRecipient
            }
        };
        self.refresh_gauges();
        delivery
    }

    /// Worker上报失败
    pub fn fail(
        &mut self,
        job_id: JobId,
        worker_id: Option<&str>,
        reason: String,
        now: DateTime<Utc>,
    ) -> Delivery {
        let fresh = self.release(&job_id, worker_id, now);
        let pending = self.correlator.take(&job_id);
        if fresh || pending.is_some() {
            self.stats.failed += 1;
            self.metrics.record_failed();
        }

        let Some(pending) = pending else {
            warn!(job_id = %job_id, reason = %reason, "收到失败上报但没有等待的调用方");
            self.refresh_gauges();
            return Delivery::NoRecipient;
        };

        warn!(job_id = %job_id, reason = %reason, "任务执行失败");
        let delivery = match pending.reply.send(JobOutcome::Failed { reason }) {
            Ok(()) => Delivery::Delivered,
            Err(_) => Delivery::NoRecipient,
        };
        self.refresh_gauges();
        delivery
    }

    /// 周期清理：空闲Worker过期、调用方断开、忙碌Worker超时
    pub fn sweep(&mut self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport {
            evicted_workers: self.registry.sweep(now, self.settings.worker_timeout),
            ..Default::default()
        };
        for worker_id in &report.evicted_workers {
            info!(worker_id = %worker_id, "清理超时的空闲Worker");
        }

        report.orphaned_callers = self.correlator.prune_closed();
        for job_id in &report.orphaned_callers {
            // 已分发的任务保留绑定，等结果回来时释放Worker
            if self.queue.remove(job_id).is_some() {
                info!(job_id = %job_id, "调用方已断开，移除排队任务");
            } else {
                debug!(job_id = %job_id, "调用方已断开");
            }
        }

        if let Some(deadline) = self.settings.dispatch_timeout {
            for (worker_id, job_id) in self.registry.overdue_busy(now, deadline) {
                warn!(worker_id = %worker_id, job_id = %job_id, "Worker处理超时，回收任务");
                self.registry.remove(&worker_id);
                report.evicted_workers.push(worker_id);

                let Some(binding) = self.bindings.remove(&job_id) else {
                    continue;
                };
                if !self.correlator.is_waiting(&job_id) {
                    self.correlator.take(&job_id);
                    continue;
                }

                if binding.job.attempts < self.settings.max_dispatch_attempts {
                    info!(
                        job_id = %job_id,
                        attempts = binding.job.attempts,
                        "任务重新入队"
                    );
                    self.queue.enqueue(binding.job);
                    self.stats.requeued += 1;
                    self.metrics.record_requeued();
                    report.requeued_jobs.push(job_id);
                } else {
                    self.abandon(&job_id, "dispatch attempts exhausted");
                    report.abandoned_jobs.push(job_id);
                }
            }
        }

        self.metrics.record_evicted(report.evicted_workers.len());
        self.refresh_gauges();
        report
    }

    /// 只读快照
    pub fn snapshot(&self) -> DispatcherSnapshot {
        DispatcherSnapshot {
            workers: self.registry.snapshot(),
            queue: self
                .queue
                .iter()
                .map(|job| QueuedJobView::new(job.id, job.payload.title.clone()))
                .collect(),
            stats: self.stats.clone(),
        }
    }

    /// 通知所有挂起的调用方任务已放弃，返回通知数量
    pub fn abandon_all(&mut self, reason: &str) -> usize {
        let pending = self.correlator.drain();
        let count = pending.len();
        for (job_id, pending) in pending {
            self.queue.remove(&job_id);
            self.bindings.remove(&job_id);
            let _ = pending.reply.send(JobOutcome::Abandoned {
                reason: reason.to_string(),
            });
            self.stats.abandoned += 1;
            self.metrics.record_abandoned();
        }
        self.refresh_gauges();
        count
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn pending_len(&self) -> usize {
        self.correlator.len()
    }

    pub fn binding(&self, job_id: &JobId) -> Option<&Binding> {
        self.bindings.get(job_id)
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    /// 解除绑定并释放Worker，同时移除可能在队列中的重投副本
    ///
    /// 提交者不是当前绑定的Worker时保留绑定：任务已被重新分发，
    /// 当前Worker仍在渲染。未携带Worker ID的提交只在首次分发时视为本人。
    /// 返回该任务的结果是否首次到达。
    fn release(&mut self, job_id: &JobId, submitter: Option<&str>, now: DateTime<Utc>) -> bool {
        if self.queue.remove(job_id).is_some() {
            debug!(job_id = %job_id, "结果先于重投到达，移除排队副本");
        }

        let Some(binding) = self.bindings.get_mut(job_id) else {
            return false;
        };
        let owned = match submitter {
            Some(worker_id) => binding.worker_id == worker_id,
            None => binding.job.attempts <= 1,
        };
        if !owned {
            warn!(
                job_id = %job_id,
                bound_worker = %binding.worker_id,
                submitter = submitter.unwrap_or("<匿名>"),
                "结果来自已被回收的分发，保留当前绑定"
            );
            let fresh = !binding.resolved;
            binding.resolved = true;
            return fresh;
        }

        let fresh = !binding.resolved;
        let worker_id = binding.worker_id.clone();
        self.bindings.remove(job_id);
        if !self.registry.mark_idle(&worker_id, now) {
            debug!(worker_id = %worker_id, "绑定的Worker已不在登记表中");
        }
        fresh
    }

    fn abandon(&mut self, job_id: &JobId, reason: &str) {
        warn!(job_id = %job_id, reason, "放弃任务");
        if let Some(pending) = self.correlator.take(job_id) {
            let _ = pending.reply.send(JobOutcome::Abandoned {
                reason: reason.to_string(),
            });
        }
        self.stats.abandoned += 1;
        self.metrics.record_abandoned();
    }

    fn refresh_gauges(&self) {
        self.metrics.update_gauges(
            self.queue.len(),
            self.registry.len(),
            self.correlator.len(),
        );
    }
}
