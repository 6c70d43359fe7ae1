use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Like - join row keyed by `(user_id, post_id)`. Presence means "liked".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Like {
    pub fn new(user_id: Uuid, post_id: Uuid) -> Self {
        Self {
            user_id,
            post_id,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of a like toggle. `like_count` is read back from storage after the
/// mutation, never maintained incrementally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeToggle {
    pub liked: bool,
    pub like_count: u64,
}
