use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use vidqueue_core::models::{ImageRef, VideoRequest};

use crate::{
    auth::{AuthenticatedUser, Permission},
    error::ApiResult,
    response::VideoAttachment,
    routes::AppState,
};

/// 视频生成请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVideoRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "没有输入图片"))]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub config: serde_json::Value,
    pub music_url: Option<String>,
    #[validate(length(max = 300, message = "标题过长"))]
    pub title: Option<String>,
}

impl From<CreateVideoRequest> for VideoRequest {
    fn from(request: CreateVideoRequest) -> Self {
        Self {
            images: request.images,
            config: request.config,
            music_url: request.music_url.filter(|url| !url.is_empty()),
            title: request.title,
        }
    }
}

/// 提交视频生成请求并挂起等待结果
///
/// 客户端断开会丢弃等待凭证，分发器在下一次清理时回收。
pub async fn create_video(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateVideoRequest>,
) -> ApiResult<VideoAttachment> {
    user.require_permission(Permission::Submit)?;
    request.validate()?;

    let ticket = state.dispatcher.submit(request.into()).await?;
    info!(job_id = %ticket.job_id, user = %user.user_id, "视频任务已提交，等待Worker");

    let outcome = ticket.wait(state.caller_timeout).await?;
    let (artifact, filename) = outcome.into_result()?;
    Ok(VideoAttachment { artifact, filename })
}
