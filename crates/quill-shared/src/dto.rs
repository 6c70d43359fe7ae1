//! Data Transfer Objects - request/response types for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Request to register a new user.
///
/// A missing required field is reported as a field error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        required(message = "Username is required"),
        length(min = 3, max = 50, message = "Username must be between 3 and 50 characters")
    )]
    pub username: Option<String>,

    #[validate(
        required(message = "Email is required"),
        email(message = "Invalid email address")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "Password is required"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub password: Option<String>,

    /// An empty string is treated as "no avatar".
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(url(message = "Avatar must be a valid URL"))]
    pub avatar: Option<String>,
}

/// Request to login.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(
        required(message = "Email is required"),
        email(message = "Invalid email address")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "Password is required"),
        length(min = 1, message = "Password is required")
    )]
    pub password: Option<String>,
}

/// Partial profile update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username must be between 3 and 50 characters"
    ))]
    pub username: Option<String>,

    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    /// Absent: unchanged. `null` or `""`: cleared. A string: replaced.
    #[serde(
        default,
        deserialize_with = "clearable",
        skip_serializing_if = "Option::is_none"
    )]
    #[validate(url(message = "Avatar must be a valid URL"))]
    pub avatar: Option<Option<String>>,
}

/// Public projection of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Body of register/login/profile/me responses. The session token itself
/// travels only in the HTTP-only cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserResponse,
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

/// Request to create a post.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(
        required(message = "Title is required"),
        length(min = 1, max = 200, message = "Title must be between 1 and 200 characters")
    )]
    pub title: Option<String>,

    #[validate(
        required(message = "Content is required"),
        length(min = 1, message = "Content is required")
    )]
    pub content: Option<String>,

    #[validate(
        required(message = "Excerpt is required"),
        length(min = 1, max = 500, message = "Excerpt must be between 1 and 500 characters")
    )]
    pub excerpt: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(url(message = "Image must be a valid URL"))]
    pub image: Option<String>,

    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Request to update a post. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Content must not be empty"))]
    pub content: Option<String>,

    #[validate(length(min = 1, max = 500, message = "Excerpt must be between 1 and 500 characters"))]
    pub excerpt: Option<String>,

    /// Absent or `null`: unchanged. `""` is not a URL and is rejected.
    #[validate(url(message = "Image must be a valid URL"))]
    pub image: Option<String>,

    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// `GET /api/posts/search` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// A post annotated for the viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub author_id: Uuid,
    pub author: UserResponse,
    pub like_count: u64,
    pub comment_count: u64,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of toggling a like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub liked: bool,
    pub like_count: u64,
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// Request to comment on a post.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(
        required(message = "Content is required"),
        length(min = 1, max = 1000, message = "Comment must be between 1 and 1000 characters")
    )]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: Uuid,
    pub content: String,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author: UserResponse,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Uploads & AI
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
    pub public_id: String,
    pub filename: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Plain `{message}` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn clearable<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(empty_as_none(deserializer)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_rejects_short_username_and_bad_email() {
        let req = RegisterRequest {
            username: Some("ab".to_string()),
            email: Some("not-an-email".to_string()),
            password: Some("secret1".to_string()),
            avatar: None,
        };

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(!fields.contains_key("password"));
    }

    #[test]
    fn test_missing_auth_fields_are_field_errors() {
        let register: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "alice@example.com",
            "password": "secret1"
        }))
        .unwrap();
        let errors = register.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 1);
        assert!(errors.field_errors().contains_key("username"));

        let login: LoginRequest = serde_json::from_value(serde_json::json!({
            "email": "alice@example.com"
        }))
        .unwrap();
        let errors = login.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_register_empty_avatar_is_absent() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "secret1",
            "avatar": ""
        }))
        .unwrap();

        assert!(req.avatar.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_profile_avatar_tri_state() {
        let absent: UpdateProfileRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.avatar, None);

        let null: UpdateProfileRequest = serde_json::from_str(r#"{"avatar":null}"#).unwrap();
        assert_eq!(null.avatar, Some(None));

        let empty: UpdateProfileRequest = serde_json::from_str(r#"{"avatar":""}"#).unwrap();
        assert_eq!(empty.avatar, Some(None));

        let set: UpdateProfileRequest =
            serde_json::from_str(r#"{"avatar":"https://cdn.example.com/a.png"}"#).unwrap();
        assert_eq!(set.avatar, Some(Some("https://cdn.example.com/a.png".to_string())));
        assert!(set.validate().is_ok());
    }

    #[test]
    fn test_create_post_missing_title_names_field() {
        let req: CreatePostRequest = serde_json::from_value(serde_json::json!({
            "content": "Body",
            "excerpt": "Short"
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
        assert_eq!(errors.field_errors().len(), 1);
    }

    #[test]
    fn test_update_post_rejects_empty_image() {
        let req: UpdatePostRequest = serde_json::from_str(r#"{"image":""}"#).unwrap();

        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("image"));

        let untouched: UpdatePostRequest = serde_json::from_str(r#"{"image":null}"#).unwrap();
        assert!(untouched.image.is_none());
        assert!(untouched.validate().is_ok());
    }

    #[test]
    fn test_create_comment_length_bounds() {
        let empty = CreateCommentRequest {
            content: Some(String::new()),
        };
        assert!(empty.validate().is_err());

        let long = CreateCommentRequest {
            content: Some("x".repeat(1001)),
        };
        assert!(long.validate().is_err());

        let ok = CreateCommentRequest {
            content: Some("Nice post".to_string()),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_post_response_is_camel_case() {
        let now = Utc::now();
        let author = UserResponse {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            avatar: None,
            created_at: now,
        };
        let body = serde_json::to_value(PostResponse {
            id: Uuid::new_v4(),
            title: "t".to_string(),
            content: "c".to_string(),
            excerpt: "e".to_string(),
            image: None,
            tags: vec![],
            author_id: author.id,
            author,
            like_count: 1,
            comment_count: 0,
            is_liked: true,
            created_at: now,
            updated_at: now,
        })
        .unwrap();

        assert_eq!(body["likeCount"], 1);
        assert_eq!(body["isLiked"], true);
        assert!(body["author"].get("passwordHash").is_none());
        assert!(body["author"].get("createdAt").is_some());
    }
}
