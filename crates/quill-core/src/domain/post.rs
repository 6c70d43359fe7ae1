use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::PublicUser;

/// Post entity - a blog article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new post.
    pub fn new(
        author_id: Uuid,
        title: String,
        content: String,
        excerpt: String,
        image: Option<String>,
        tags: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            title,
            content,
            excerpt,
            image,
            tags,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update and bump `updated_at`.
    pub fn apply(&mut self, changes: PostChanges) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(content) = changes.content {
            self.content = content;
        }
        if let Some(excerpt) = changes.excerpt {
            self.excerpt = excerpt;
        }
        if let Some(image) = changes.image {
            self.image = Some(image);
        }
        if let Some(tags) = changes.tags {
            self.tags = tags;
        }
        self.updated_at = Utc::now();
    }
}

/// Partial post update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub image: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// A post joined with its author and aggregate counts, as read from storage.
#[derive(Debug, Clone)]
pub struct PostRecord {
    pub post: Post,
    pub author: PublicUser,
    pub like_count: u64,
    pub comment_count: u64,
}

/// A post as seen by a particular viewer.
#[derive(Debug, Clone)]
pub struct PostView {
    pub post: Post,
    pub author: PublicUser,
    pub like_count: u64,
    pub comment_count: u64,
    pub is_liked: bool,
}

impl PostView {
    pub fn new(record: PostRecord, is_liked: bool) -> Self {
        Self {
            post: record.post,
            author: record.author,
            like_count: record.like_count,
            comment_count: record.comment_count,
            is_liked,
        }
    }

    /// A freshly created post: nobody has liked or commented on it yet.
    pub fn fresh(post: Post, author: PublicUser) -> Self {
        Self {
            post,
            author,
            like_count: 0,
            comment_count: 0,
            is_liked: false,
        }
    }

    /// Annotate a batch of records with the viewer's liked set.
    pub fn annotate(records: Vec<PostRecord>, liked: &HashSet<Uuid>) -> Vec<Self> {
        records
            .into_iter()
            .map(|record| {
                let is_liked = liked.contains(&record.post.id);
                Self::new(record, is_liked)
            })
            .collect()
    }
}
