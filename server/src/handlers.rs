use std::path::PathBuf;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Json};
use framereview_shared::{Asset, Comment, CommentId, CommentPatch, NewComment, PresignedUpload, UploadRequest};
use serde::Serialize;

use crate::logic::{self, CommentError};
use crate::reviews::{get_or_load_review, new_video_id, normalize_video_id};
use crate::state::{AppState, SharedReview};
use crate::storage::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unknown video")]
    UnknownVideo,
    #[error(transparent)]
    Comment(#[from] CommentError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownVideo => StatusCode::NOT_FOUND,
            ApiError::Comment(CommentError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Comment(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::PresignUnsupported) => StatusCode::NOT_IMPLEMENTED,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

pub async fn ping_handler() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub async fn root_handler() -> impl IntoResponse {
    Redirect::to(&format!("/review/{}", new_video_id()))
}

pub async fn review_handler(
    Path(video_id): Path<String>,
    Extension(index_file): Extension<PathBuf>,
) -> impl IntoResponse {
    if normalize_video_id(&video_id).is_none() {
        return StatusCode::NOT_FOUND.into_response();
    }
    match tokio::fs::read_to_string(&index_file).await {
        Ok(contents) => Html(contents).into_response(),
        Err(error) => {
            tracing::error!(path = %index_file.display(), %error, "failed to read index.html");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn review_for(state: &AppState, video_id: &str) -> Result<SharedReview, ApiError> {
    let video_id = normalize_video_id(video_id).ok_or(ApiError::UnknownVideo)?;
    Ok(get_or_load_review(state, &video_id).await?)
}

pub async fn list_comments_handler(
    Path(video_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let review = review_for(&state, &video_id).await?;
    let comments = logic::list_comments(&*review.read().await);
    Ok(Json(comments))
}

pub async fn create_comment_handler(
    Path(video_id): Path<String>,
    State(state): State<AppState>,
    Json(new): Json<NewComment>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let review = review_for(&state, &video_id).await?;
    let comment = logic::create_comment(&mut *review.write().await, new)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn update_comment_handler(
    Path((video_id, comment_id)): Path<(String, u64)>,
    State(state): State<AppState>,
    Json(patch): Json<CommentPatch>,
) -> Result<Json<Comment>, ApiError> {
    let review = review_for(&state, &video_id).await?;
    let comment = logic::update_comment(&mut *review.write().await, CommentId::new(comment_id), patch)?;
    Ok(Json(comment))
}

pub async fn delete_comment_handler(
    Path((video_id, comment_id)): Path<(String, u64)>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let review = review_for(&state, &video_id).await?;
    logic::delete_comment(&mut *review.write().await, CommentId::new(comment_id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_url_handler(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<PresignedUpload>, ApiError> {
    let upload = state.assets.presign_upload(&request).await?;
    tracing::info!(key = %upload.key, "presigned upload");
    Ok(Json(upload))
}

pub async fn assets_handler(State(state): State<AppState>) -> Result<Json<Vec<Asset>>, ApiError> {
    Ok(Json(state.assets.list_assets().await?))
}
