use axum::{extract::State, Json};

use crate::{response::MusicLibraryResponse, routes::AppState};

/// 曲库列表
pub async fn list_music(State(state): State<AppState>) -> Json<MusicLibraryResponse> {
    Json(MusicLibraryResponse {
        success: true,
        music: state.music.tracks.clone(),
    })
}
