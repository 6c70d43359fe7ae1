use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User entity - a registered author/reader.
///
/// Not `Serialize`: the password hash never leaves the server.
/// Use [`User::public`] for anything client-facing.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with generated ID and timestamp.
    pub fn new(
        username: String,
        email: String,
        password_hash: String,
        avatar: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email: normalize_email(&email),
            password_hash,
            avatar,
            created_at: Utc::now(),
        }
    }

    /// The subset of the user that is safe to hand to clients.
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            avatar: self.avatar.clone(),
            created_at: self.created_at,
        }
    }

    /// Apply a partial profile update in place.
    pub fn apply(&mut self, changes: ProfileChanges) {
        if let Some(username) = changes.username {
            self.username = username;
        }
        if let Some(email) = changes.email {
            self.email = normalize_email(&email);
        }
        if let Some(avatar) = changes.avatar {
            self.avatar = avatar;
        }
    }
}

/// Public projection of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Partial profile update.
///
/// `avatar` is tri-state: `None` leaves it alone, `Some(None)` clears it,
/// `Some(Some(url))` replaces it.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<Option<String>>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.avatar.is_none()
    }

    /// Username/email that may collide with another account.
    pub fn identity_fields(&self) -> Option<(Option<&str>, Option<&str>)> {
        if self.username.is_none() && self.email.is_none() {
            return None;
        }
        Some((self.username.as_deref(), self.email.as_deref()))
    }
}

/// Emails are compared case-insensitively; store them lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
