//! # vidqueue API
//!
//! 视频渲染任务分发服务的HTTP接口，基于Axum构建。
//!
//! ## API 端点
//!
//! ### Worker拉取接口
//! - `GET /api/worker/get-task?workerId=<id>` - 拉取任务，无任务时返回 `null`
//! - `POST /api/worker/submit-result/{job_id}` - 提交渲染产物
//! - `POST /api/worker/report-error/{job_id}` - 上报失败
//!
//! ### 调用方接口
//! - `POST /api/create-video` - 提交请求并等待视频产物（需要 `Submit` 权限）
//! - `GET /api/music-library` - 背景音乐曲库
//!
//! ### 管理与监控
//! - `GET /api/admin/stats` - 分发器快照（需要 `Admin` 权限）
//! - `GET /health` - 健康检查
//! - `GET /metrics` - Prometheus指标

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use axum::Router;
use tower::ServiceBuilder;

use middleware::{cors_layer, request_logging, trace_layer};
use routes::{create_routes, AppState};
use vidqueue_core::config::ApiConfig;

/// 创建完整的API应用
pub fn create_app(state: AppState, api_config: &ApiConfig, metrics_endpoint: &str) -> Router {
    let router = create_routes(state, api_config, metrics_endpoint);
    let router = if api_config.cors_enabled {
        router.layer(cors_layer(&api_config.cors_origins))
    } else {
        router
    };

    router.layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(axum::middleware::from_fn(request_logging)),
    )
}
