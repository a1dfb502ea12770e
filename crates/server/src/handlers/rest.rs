//! REST JSON handlers for `/api/posts`.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use posts_core::{Post, PostInput};
use tracing::info;

use crate::config::AppState;
use crate::error::Result;

/// GET /api/posts
pub async fn list_posts(State(state): State<AppState>) -> Json<Vec<Post>> {
    info!("GET /api/posts");
    Json(state.store.list())
}

/// POST /api/posts
pub async fn create_post(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PostInput>, JsonRejection>,
) -> Result<Json<Post>> {
    let Json(input) = payload?;
    info!("POST /api/posts - title={:?}", input.title);
    Ok(Json(state.store.create(input.title, input.content)))
}

/// GET /api/posts/:id
pub async fn get_post(
    State(state): State<AppState>,
    id: std::result::Result<Path<u64>, PathRejection>,
) -> Result<Json<Post>> {
    let Path(id) = id?;
    info!("GET /api/posts/{}", id);
    Ok(Json(state.store.get(id)?))
}

/// PUT /api/posts/:id
pub async fn update_post(
    State(state): State<AppState>,
    id: std::result::Result<Path<u64>, PathRejection>,
    payload: std::result::Result<Json<PostInput>, JsonRejection>,
) -> Result<Json<Post>> {
    let Path(id) = id?;
    let Json(input) = payload?;
    info!("PUT /api/posts/{}", id);
    Ok(Json(state.store.update(id, input.title, input.content)?))
}

/// DELETE /api/posts/:id
///
/// Responds with a JSON string such as `"3 id deleted"`.
pub async fn delete_post(
    State(state): State<AppState>,
    id: std::result::Result<Path<u64>, PathRejection>,
) -> Result<Json<String>> {
    let Path(id) = id?;
    info!("DELETE /api/posts/{}", id);
    if state.store.delete(id) {
        Ok(Json(format!("{} id deleted", id)))
    } else {
        Err(posts_core::PostsError::NotFound { id }.into())
    }
}
