//! Comment handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;
use validator::Validate;

use quill_core::domain::{Comment, CommentView};
use quill_core::ports::BaseRepository;
use quill_shared::dto::{CommentResponse, CreateCommentRequest};

use super::posts::{missing_post, or_missing_post, post_id};
use super::present;
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/posts/{id}/comments
///
/// Unknown (or malformed) post ids simply have no comments.
pub async fn list(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let Ok(id) = Uuid::parse_str(&path) else {
        return Ok(HttpResponse::Ok().json(Vec::<CommentResponse>::new()));
    };

    let comments: Vec<CommentResponse> = state
        .comments
        .list_by_post(id)
        .await?
        .into_iter()
        .map(present::comment)
        .collect();

    Ok(HttpResponse::Ok().json(comments))
}

/// POST /api/posts/{id}/comments - Protected route
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<CreateCommentRequest>,
) -> AppResult<HttpResponse> {
    let id = post_id(&path)?;
    let req = body.into_inner();
    req.validate()?;

    if state.posts.find_by_id(id).await?.is_none() {
        return Err(missing_post(id));
    }

    let comment = Comment::new(id, identity.user_id, req.content.unwrap_or_default());

    // The post may vanish between the check and the insert.
    let comment = state
        .comments
        .insert(comment)
        .await
        .map_err(or_missing_post(id))?;

    tracing::info!(comment_id = %comment.id, post_id = %id, "Comment created");

    Ok(HttpResponse::Created().json(present::comment(CommentView {
        comment,
        author: identity.user,
    })))
}
