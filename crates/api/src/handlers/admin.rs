use axum::{extract::State, Json};

use vidqueue_core::models::DispatcherSnapshot;

use crate::{
    auth::{AuthenticatedUser, Permission},
    error::ApiResult,
    routes::AppState,
};

/// 管理端统计：Worker列表、排队任务和累计计数
pub async fn get_stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<DispatcherSnapshot>> {
    user.require_permission(Permission::Admin)?;
    let snapshot = state.dispatcher.snapshot().await?;
    Ok(Json(snapshot))
}
