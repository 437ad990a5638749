use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;

use vidqueue_core::config::ApiConfig;
use vidqueue_core::music::MusicCatalog;
use vidqueue_dispatcher::DispatcherHandle;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers::{
    admin::get_stats,
    health::health_check,
    jobs::create_video,
    metrics::render_metrics,
    music::list_music,
    workers::{get_task, report_error, submit_result},
};

const MB: usize = 1024 * 1024;

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: DispatcherHandle,
    pub auth_config: Arc<AuthConfig>,
    pub music: Arc<MusicCatalog>,
    /// create-video 等待结果的上限
    pub caller_timeout: Duration,
    pub metrics: Option<PrometheusHandle>,
}

/// 创建API路由
pub fn create_routes(state: AppState, api_config: &ApiConfig, metrics_endpoint: &str) -> Router {
    let protected = Router::new()
        .route(
            "/api/create-video",
            post(create_video).layer(DefaultBodyLimit::max(api_config.max_request_size_mb * MB)),
        )
        .route("/api/admin/stats", get(get_stats))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let mut router = Router::new()
        // 健康检查
        .route("/health", get(health_check))
        // Worker拉取接口
        .route("/api/worker/get-task", get(get_task))
        .route(
            "/api/worker/submit-result/{job_id}",
            post(submit_result).layer(DefaultBodyLimit::max(api_config.max_artifact_size_mb * MB)),
        )
        .route("/api/worker/report-error/{job_id}", post(report_error))
        .route("/api/music-library", get(list_music))
        .merge(protected);

    if state.metrics.is_some() {
        router = router.route(metrics_endpoint, get(render_metrics));
    }

    router.with_state(state)
}
