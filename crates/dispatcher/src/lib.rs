//! 视频渲染任务分发器
//!
//! 调用方请求被转换成队列中的任务，由轮询的Worker拉取执行，
//! 结果再关联回仍在等待的调用方请求。

pub mod actor;
pub mod engine;
pub mod correlator;
pub mod metrics;
pub mod queue;
pub mod registry;
pub mod settings;

pub use actor::{Command, DispatcherActor, DispatcherHandle, JobTicket};
pub use engine::{Binding, DispatchCore, SweepReport};
pub use correlator::{PendingResponse, ResultCorrelator};
pub use metrics::DispatchMetrics;
pub use queue::JobQueue;
pub use registry::WorkerRegistry;
pub use settings::DispatcherSettings;
