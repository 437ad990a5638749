pub mod api_observability;
pub mod app_config;
pub mod dispatcher_worker;

pub use api_observability::{ApiConfig, ApiKeyConfig, AuthConfig, ObservabilityConfig};
pub use app_config::AppConfig;
pub use dispatcher_worker::{DispatcherConfig, WorkerConfig};
