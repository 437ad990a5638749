use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use vidqueue_core::music::MusicTrack;

/// Worker提交结果后的确认
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAck {
    pub success: bool,
}

/// Worker上报错误后的确认，无论是否有调用方在等待
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorAck {
    pub received: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicLibraryResponse {
    pub success: bool,
    pub music: Vec<MusicTrack>,
}

/// 以附件形式返回的渲染产物
#[derive(Debug, Clone)]
pub struct VideoAttachment {
    pub artifact: Bytes,
    pub filename: String,
}

pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

impl IntoResponse for VideoAttachment {
    fn into_response(self) -> Response {
        let disposition = format!("attachment; filename=\"{}\"", self.filename);
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, VIDEO_CONTENT_TYPE.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.artifact,
        )
            .into_response()
    }
}

pub fn submitted() -> Response {
    Json(SubmitAck { success: true }).into_response()
}

pub fn client_disconnected() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Client disconnected" })),
    )
        .into_response()
}

pub fn error_received() -> Json<ErrorAck> {
    Json(ErrorAck { received: true })
}
