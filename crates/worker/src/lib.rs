//! 拉取式渲染Worker
//!
//! 定期向分发服务轮询任务，交给 [`RenderExecutor`] 渲染，
//! 再把产物或失败原因提交回去。

pub mod client;
pub mod error;
pub mod executor;
pub mod runtime;

pub use client::{DispatcherClient, SubmitStatus};
pub use error::{WorkerError, WorkerResult};
pub use executor::{CommandRenderExecutor, RenderExecutor};
pub use runtime::{generate_worker_id, WorkerRuntime};
