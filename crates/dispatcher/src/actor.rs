use bytes::Bytes;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use vidqueue_core::errors::{DispatchError, DispatchResult};
use vidqueue_core::models::{
    Delivery, DispatcherSnapshot, JobId, JobOutcome, PollOutcome, VideoRequest,
};

use crate::engine::DispatchCore;

/// 发给分发actor的命令
#[derive(Debug)]
pub enum Command {
    Enqueue {
        request: VideoRequest,
        reply: oneshot::Sender<JobOutcome>,
        ack: oneshot::Sender<JobId>,
    },
    Poll {
        worker_id: Option<String>,
        ack: oneshot::Sender<PollOutcome>,
    },
    Complete {
        job_id: JobId,
        worker_id: Option<String>,
        artifact: Bytes,
        ack: oneshot::Sender<Delivery>,
    },
    Fail {
        job_id: JobId,
        worker_id: Option<String>,
        reason: String,
        ack: oneshot::Sender<Delivery>,
    },
    Snapshot {
        ack: oneshot::Sender<DispatcherSnapshot>,
    },
}

/// 持有 [`DispatchCore`] 的单任务actor
///
/// 所有状态变更（包括周期清理）都在同一个循环中串行执行。
pub struct DispatcherActor {
    core: DispatchCore,
    commands: mpsc::UnboundedReceiver<Command>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl DispatcherActor {
    /// 创建actor及其句柄
    pub fn new(
        core: DispatchCore,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> (Self, DispatcherHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Self {
            core,
            commands: rx,
            shutdown_rx,
        };
        (actor, DispatcherHandle { tx })
    }

    /// 在后台任务中运行
    pub fn spawn(self) -> JoinHandle<DispatchCore> {
        tokio::spawn(self.run())
    }

    /// 运行直到收到关闭信号或所有句柄被丢弃，返回最终状态
    pub async fn run(mut self) -> DispatchCore {
        let mut ticker = interval(self.core.settings().sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("分发器已启动");

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle(command),
                        None => {
                            info!("所有分发器句柄已释放，停止分发器");
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    let report = self.core.sweep(Utc::now());
                    if !report.is_empty() {
                        info!(
                            evicted = report.evicted_workers.len(),
                            requeued = report.requeued_jobs.len(),
                            abandoned = report.abandoned_jobs.len(),
                            orphaned = report.orphaned_callers.len(),
                            "周期清理完成"
                        );
                    }
                }
                _ = self.shutdown_rx.recv() => {
                    info!("收到关闭信号，停止分发器");
                    break;
                }
            }
        }

        let abandoned = self.core.abandon_all("dispatcher shutting down");
        if abandoned > 0 {
            info!(abandoned, "已通知挂起的调用方");
        }
        self.core
    }

    fn handle(&mut self, command: Command) {
        let now = Utc::now();
        match command {
            Command::Enqueue {
                request,
                reply,
                ack,
            } => {
                let job_id = self.core.enqueue(request, reply, now);
                let _ = ack.send(job_id);
            }
            Command::Poll { worker_id, ack } => {
                let outcome = self.core.poll(worker_id.as_deref(), now);
                let _ = ack.send(outcome);
            }
            Command::Complete {
                job_id,
                worker_id,
                artifact,
                ack,
            } => {
                let delivery = self
                    .core
                    .complete(job_id, worker_id.as_deref(), artifact, now);
                let _ = ack.send(delivery);
            }
            Command::Fail {
                job_id,
                worker_id,
                reason,
                ack,
            } => {
                let delivery = self.core.fail(job_id, worker_id.as_deref(), reason, now);
                let _ = ack.send(delivery);
            }
            Command::Snapshot { ack } => {
                let _ = ack.send(self.core.snapshot());
            }
        }
    }
}

/// 分发actor的句柄，可自由克隆
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    tx: mpsc::UnboundedSender<Command>,
}

/// 已入队任务的等待凭证
#[derive(Debug)]
pub struct JobTicket {
    pub job_id: JobId,
    pub outcome: oneshot::Receiver<JobOutcome>,
}

impl DispatcherHandle {
    /// 提交请求并返回等待凭证；丢弃凭证即表示调用方断开
    pub async fn submit(&self, request: VideoRequest) -> DispatchResult<JobTicket> {
        let (reply, outcome) = oneshot::channel();
        let job_id = self
            .request(|ack| Command::Enqueue {
                request,
                reply,
                ack,
            })
            .await?;
        Ok(JobTicket { job_id, outcome })
    }

    pub async fn poll(&self, worker_id: Option<String>) -> DispatchResult<PollOutcome> {
        self.request(|ack| Command::Poll { worker_id, ack }).await
    }

    /// `worker_id` 为提交结果的Worker，缺省时按首次分发处理
    pub async fn complete(
        &self,
        job_id: JobId,
        worker_id: Option<String>,
        artifact: Bytes,
    ) -> DispatchResult<Delivery> {
        self.request(|ack| Command::Complete {
            job_id,
            worker_id,
            artifact,
            ack,
        })
        .await
    }

    pub async fn fail(
        &self,
        job_id: JobId,
        worker_id: Option<String>,
        reason: String,
    ) -> DispatchResult<Delivery> {
        self.request(|ack| Command::Fail {
            job_id,
            worker_id,
            reason,
            ack,
        })
        .await
    }

    pub async fn snapshot(&self) -> DispatchResult<DispatcherSnapshot> {
        self.request(|ack| Command::Snapshot { ack }).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> DispatchResult<T> {
        let (ack, rx) = oneshot::channel();
        self.tx.send(build(ack)).map_err(|_| {
            debug!("分发器已停止，命令未送达");
            DispatchError::DispatcherUnavailable
        })?;
        rx.await.map_err(|_| DispatchError::DispatcherUnavailable)
    }
}

impl JobTicket {
    /// 等待结果，超时返回 [`DispatchError::CallerTimeout`]
    pub async fn wait(self, timeout: std::time::Duration) -> DispatchResult<JobOutcome> {
        match tokio::time::timeout(timeout, self.outcome).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => Err(DispatchError::DispatcherUnavailable),
            Err(_) => Err(DispatchError::CallerTimeout),
        }
    }
}
