pub mod job;
pub mod outcome;
pub mod stats;
pub mod worker;

pub use job::{ImageRef, Job, JobId, TaskPayload, VideoRequest};
pub use outcome::{Delivery, JobOutcome, PollOutcome};
pub use stats::{DispatchStats, DispatcherSnapshot, QueuedJobData, QueuedJobView};
pub use worker::{WorkerInfo, WorkerStatus};
