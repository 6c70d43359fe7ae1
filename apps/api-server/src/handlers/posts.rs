//! Post handlers: listing, search, CRUD and like toggling.

use actix_web::{HttpResponse, web};
use uuid::Uuid;
use validator::Validate;

use quill_core::DomainError;
use quill_core::domain::{Post, PostChanges, PostView, SearchQuery};
use quill_core::error::RepoError;
use quill_core::ports::BaseRepository;
use quill_shared::dto::{
    CreatePostRequest, LikeResponse, MessageResponse, SearchParams, UpdatePostRequest,
};

use super::present;
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const POST_NOT_FOUND: &str = "Post not found";

/// Malformed ids cannot name a post, so they are reported as missing.
pub(super) fn post_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found(POST_NOT_FOUND))
}

pub(super) fn missing_post(id: Uuid) -> AppError {
    DomainError::NotFound {
        entity_type: "Post",
        id,
    }
    .into()
}

pub(super) fn or_missing_post(id: Uuid) -> impl FnOnce(RepoError) -> AppError {
    move |err| match err {
        RepoError::NotFound => missing_post(id),
        other => other.into(),
    }
}

/// GET /api/posts
pub async fn list(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
) -> AppResult<HttpResponse> {
    let records = state.posts.list().await?;
    let posts = present::annotate(&state, &viewer, records).await?;

    Ok(HttpResponse::Ok().json(posts))
}

/// GET /api/posts/search?q=
pub async fn search(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    params: web::Query<SearchParams>,
) -> AppResult<HttpResponse> {
    let query = SearchQuery::parse(params.q.as_deref())?;

    let records = state.posts.search(&query).await?;
    let posts = present::annotate(&state, &viewer, records).await?;
    Ok(HttpResponse::Ok().json(posts))
}

/// GET /api/posts/{id}
pub async fn get(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = post_id(&path)?;

    let record = state
        .posts
        .find_record(id)
        .await?
        .ok_or_else(|| missing_post(id))?;

    let mut posts = present::annotate(&state, &viewer, vec![record]).await?;
    match posts.pop() {
        Some(post) => Ok(HttpResponse::Ok().json(post)),
        None => Err(missing_post(id)),
    }
}

/// POST /api/posts - Protected route
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    req.validate()?;

    let post = Post::new(
        identity.user_id,
        req.title.unwrap_or_default(),
        req.content.unwrap_or_default(),
        req.excerpt.unwrap_or_default(),
        req.image,
        req.tags.unwrap_or_default(),
    );

    let post = state.posts.insert(post).await?;
    tracing::info!(post_id = %post.id, author_id = %identity.user_id, "Post created");

    Ok(HttpResponse::Created().json(present::post(PostView::fresh(post, identity.user))))
}

/// PUT /api/posts/{id} - Protected route
///
/// Any authenticated user may edit any post.
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let id = post_id(&path)?;
    let req = body.into_inner();
    req.validate()?;

    let changes = PostChanges {
        title: req.title,
        content: req.content,
        excerpt: req.excerpt,
        image: req.image,
        tags: req.tags,
    };

    let record = state
        .posts
        .update(id, changes)
        .await?
        .ok_or_else(|| missing_post(id))?;

    let liked = state
        .likes
        .liked_post_ids(identity.user_id, &[id])
        .await?
        .contains(&id);

    tracing::info!(post_id = %id, editor_id = %identity.user_id, "Post updated");

    Ok(HttpResponse::Ok().json(present::post(PostView::new(record, liked))))
}

/// DELETE /api/posts/{id} - Protected route
///
/// Any authenticated user may delete any post. Comments and likes go with it.
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = post_id(&path)?;

    state.posts.delete(id).await.map_err(or_missing_post(id))?;
    tracing::info!(post_id = %id, deleted_by = %identity.user_id, "Post deleted");

    Ok(HttpResponse::Ok().json(MessageResponse::new("Post deleted successfully")))
}

/// POST /api/posts/{id}/like - Protected route
pub async fn toggle_like(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = post_id(&path)?;

    let toggle = state
        .likes
        .toggle(identity.user_id, id)
        .await
        .map_err(or_missing_post(id))?;

    Ok(HttpResponse::Ok().json(LikeResponse {
        liked: toggle.liked,
        like_count: toggle.like_count,
    }))
}
