//! Domain-to-DTO mapping for response bodies.

use std::collections::HashSet;

use uuid::Uuid;

use quill_core::domain::{CommentView, PostRecord, PostView, PublicUser};
use quill_shared::dto::{CommentResponse, PostResponse, UserResponse};

use crate::middleware::auth::OptionalIdentity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

pub fn user(user: PublicUser) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        avatar: user.avatar,
        created_at: user.created_at,
    }
}

pub fn post(view: PostView) -> PostResponse {
    PostResponse {
        id: view.post.id,
        title: view.post.title,
        content: view.post.content,
        excerpt: view.post.excerpt,
        image: view.post.image,
        tags: view.post.tags,
        author_id: view.post.author_id,
        author: user(view.author),
        like_count: view.like_count,
        comment_count: view.comment_count,
        is_liked: view.is_liked,
        created_at: view.post.created_at,
        updated_at: view.post.updated_at,
    }
}

pub fn comment(view: CommentView) -> CommentResponse {
    CommentResponse {
        id: view.comment.id,
        content: view.comment.content,
        post_id: view.comment.post_id,
        author_id: view.comment.author_id,
        author: user(view.author),
        created_at: view.comment.created_at,
    }
}

/// Mark which records the viewer has liked, with one batched lookup.
pub async fn annotate(
    state: &AppState,
    viewer: &OptionalIdentity,
    records: Vec<PostRecord>,
) -> AppResult<Vec<PostResponse>> {
    let liked = match viewer.user_id() {
        Some(user_id) if !records.is_empty() => {
            let ids: Vec<Uuid> = records.iter().map(|r| r.post.id).collect();
            state.likes.liked_post_ids(user_id, &ids).await?
        }
        _ => HashSet::new(),
    };

    Ok(PostView::annotate(records, &liked)
        .into_iter()
        .map(post)
        .collect())
}
