use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{post::order_by_ids, Post, PostId, RecommendationIds, UserId},
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    /// Overrides the configured number of posts
    pub count: Option<i64>,
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Recommended posts for a user, fully resolved, in feed order
pub async fn get_recommendation(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<RecommendationQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Post>>> {
    let (user_id, count) = request_params(path, query)?;
    let post_ids = recommend(&state, &request_id, user_id, count).await?;

    let posts = state.store.posts_by_ids(&post_ids).await?;
    let ordered = order_by_ids(&post_ids, posts);

    if ordered.len() < post_ids.len() {
        tracing::debug!(
            request_id = %request_id,
            missing = post_ids.len() - ordered.len(),
            "Some recommended posts could not be resolved"
        );
    }

    mark_viewed(&state, &request_id, user_id, &post_ids).await;

    Ok(Json(ordered))
}

/// Recommended post ids for a user, in feed order
pub async fn get_recommendation_ids(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<RecommendationQuery>, QueryRejection>,
) -> AppResult<Json<RecommendationIds>> {
    let (user_id, count) = request_params(path, query)?;
    let post_ids = recommend(&state, &request_id, user_id, count).await?;

    mark_viewed(&state, &request_id, user_id, &post_ids).await;

    Ok(Json(RecommendationIds::from(post_ids)))
}

/// Malformed path or query parameters become `InvalidInput`
fn request_params(
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<RecommendationQuery>, QueryRejection>,
) -> AppResult<(UserId, Option<i64>)> {
    let Path(user_id) = path.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let Query(query) = query.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    Ok((UserId(user_id), query.count))
}

async fn recommend(
    state: &AppState,
    request_id: &RequestId,
    user_id: UserId,
    count: Option<i64>,
) -> AppResult<Vec<PostId>> {
    let requested = state.settings.resolve_count(count);

    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        requested,
        store = state.store.name(),
        "Processing recommendation request"
    );

    let mut random = state.settings.random_source();
    state
        .recommender
        .build_recommendation(user_id, requested, &mut random)
        .await
}

/// Best-effort: a failed write is logged and never fails the response
async fn mark_viewed(state: &AppState, request_id: &RequestId, user_id: UserId, post_ids: &[PostId]) {
    if post_ids.is_empty() {
        return;
    }

    if let Err(e) = state.store.mark_viewed(user_id, post_ids).await {
        tracing::warn!(
            request_id = %request_id,
            user_id = %user_id,
            error = %e,
            "Failed to mark posts as viewed"
        );
    }
}
