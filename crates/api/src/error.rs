use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use vidqueue_core::errors::DispatchError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("分发器错误: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("验证错误: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("认证错误: {0}")]
    Authentication(#[from] crate::auth::AuthError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_type, suggestions) = match &self {
            ApiError::Dispatch(DispatchError::JobFailed(reason)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                reason.clone(),
                "JOB_FAILED",
                vec![
                    "Worker在渲染时上报了错误".to_string(),
                    "请检查图片地址是否可访问后重试".to_string(),
                ],
            ),
            ApiError::Dispatch(DispatchError::JobAbandoned(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "视频生成失败".to_string(),
                "JOB_ABANDONED",
                vec!["任务未能在限定次数内完成，请稍后重试".to_string()],
            ),
            ApiError::Dispatch(DispatchError::CallerTimeout) => (
                StatusCode::GATEWAY_TIMEOUT,
                "等待视频生成超时".to_string(),
                "CALLER_TIMEOUT",
                vec![
                    "当前没有空闲的Worker或任务耗时过长".to_string(),
                    "查看 GET /api/admin/stats 了解队列情况".to_string(),
                ],
            ),
            ApiError::Dispatch(DispatchError::DispatcherUnavailable) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "分发器不可用".to_string(),
                "DISPATCHER_UNAVAILABLE",
                vec!["服务可能正在关闭，请稍后重试".to_string()],
            ),
            ApiError::Validation(errors) => {
                let error_details: Vec<String> = errors
                    .field_errors()
                    .iter()
                    .map(|(field, errors)| {
                        let messages: Vec<String> = errors
                            .iter()
                            .map(|e| {
                                e.message
                                    .as_ref()
                                    .map(|m| m.to_string())
                                    .unwrap_or_else(|| "验证失败".to_string())
                            })
                            .collect();
                        format!("{}: {}", field, messages.join(", "))
                    })
                    .collect();

                (
                    StatusCode::BAD_REQUEST,
                    format!("请求参数验证失败: {}", error_details.join("; ")),
                    "VALIDATION_ERROR",
                    vec!["请检查请求参数是否符合要求".to_string()],
                )
            }
            ApiError::Authentication(auth_error) => {
                let status = StatusCode::from(auth_error);
                let (msg, suggestions) = match auth_error {
                    crate::auth::AuthError::MissingToken => (
                        "缺少认证信息".to_string(),
                        vec![
                            "请在请求头中添加 X-API-Key: <key>".to_string(),
                            "或使用 Authorization: Bearer <key>".to_string(),
                        ],
                    ),
                    crate::auth::AuthError::InvalidApiKey => (
                        "API密钥无效".to_string(),
                        vec!["请检查密钥是否正确且未被停用".to_string()],
                    ),
                    crate::auth::AuthError::InsufficientPermissions => (
                        "权限不足".to_string(),
                        vec!["请联系管理员获取相应权限".to_string()],
                    ),
                    crate::auth::AuthError::MalformedHeader => (
                        "认证请求头格式错误".to_string(),
                        vec!["请检查认证信息".to_string()],
                    ),
                };
                let error_type = if status == StatusCode::FORBIDDEN {
                    "FORBIDDEN"
                } else {
                    "AUTHENTICATION_ERROR"
                };
                (status, msg, error_type, suggestions)
            }
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type,
                "code": status.as_u16(),
                "suggestions": suggestions,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
