//! HTTP tests: real routes and handlers over in-memory ports.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{StatusCode, header};
use actix_web::test::{self, TestRequest};
use actix_web::{App, web};
use async_trait::async_trait;
use serde_json::{Value, json};
use uuid::Uuid;

use quill_core::domain::{
    Comment, CommentView, LikeToggle, Post, PostChanges, PostRecord, ProfileChanges, SearchQuery,
    User,
};
use quill_core::error::RepoError;
use quill_core::ports::{
    AuthError, BaseRepository, ChatError, ChatModel, CommentRepository, ImageStore,
    LikeRepository, PasswordService, PostRepository, RateLimitDecision, RateLimitError,
    RateLimiter, StorageError, StoredImage, TokenService, UserRepository,
};
use quill_infra::{JwtConfig, JwtTokenService};

use super::configure_routes;
use crate::state::{AppState, SessionSettings};

// ---------------------------------------------------------------------------
// In-memory ports
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    likes: HashSet<(Uuid, Uuid)>,
}

impl Tables {
    fn record(&self, post: &Post) -> Option<PostRecord> {
        let author = self.users.iter().find(|u| u.id == post.author_id)?.public();
        Some(PostRecord {
            post: post.clone(),
            author,
            like_count: self.likes.iter().filter(|(_, p)| *p == post.id).count() as u64,
            comment_count: self.comments.iter().filter(|c| c.post_id == post.id).count() as u64,
        })
    }

    fn records(&self) -> Vec<PostRecord> {
        let mut records: Vec<PostRecord> = self
            .posts
            .iter()
            .rev()
            .filter_map(|p| self.record(p))
            .collect();
        records.sort_by(|a, b| b.post.created_at.cmp(&a.post.created_at));
        records
    }
}

#[derive(Clone, Default)]
struct Store(Arc<Mutex<Tables>>);

impl Store {
    fn with<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        f(&mut self.0.lock().unwrap())
    }
}

struct Users(Store);
struct Posts(Store);
struct Comments(Store);
struct Likes(Store);

#[async_trait]
impl BaseRepository<User, Uuid> for Users {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.0.with(|t| t.users.iter().find(|u| u.id == id).cloned()))
    }

    async fn insert(&self, user: User) -> Result<User, RepoError> {
        self.0.with(|t| {
            if t
                .users
                .iter()
                .any(|u| u.username == user.username || u.email == user.email)
            {
                return Err(RepoError::Constraint("users_unique".into()));
            }
            t.users.push(user.clone());
            Ok(user)
        })
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.0.with(|t| {
            let before = t.users.len();
            t.users.retain(|u| u.id != id);
            if t.users.len() == before {
                Err(RepoError::NotFound)
            } else {
                Ok(())
            }
        })
    }
}

#[async_trait]
impl UserRepository for Users {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let email = quill_core::domain::normalize_email(email);
        Ok(self.0.with(|t| t.users.iter().find(|u| u.email == email).cloned()))
    }

    async fn find_conflicting(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Result<Option<User>, RepoError> {
        Ok(self.0.with(|t| {
            t.users
                .iter()
                .filter(|u| Some(u.id) != exclude)
                .find(|u| {
                    username.is_some_and(|n| u.username == n) || email.is_some_and(|e| u.email == e)
                })
                .cloned()
        }))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, RepoError> {
        Ok(self.0.with(|t| {
            let user = t.users.iter_mut().find(|u| u.id == id)?;
            user.apply(changes);
            Some(user.clone())
        }))
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for Posts {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        Ok(self.0.with(|t| t.posts.iter().find(|p| p.id == id).cloned()))
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        self.0.with(|t| {
            if !t.users.iter().any(|u| u.id == post.author_id) {
                return Err(RepoError::NotFound);
            }
            t.posts.push(post.clone());
            Ok(post)
        })
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.0.with(|t| {
            let before = t.posts.len();
            t.posts.retain(|p| p.id != id);
            if t.posts.len() == before {
                return Err(RepoError::NotFound);
            }
            t.comments.retain(|c| c.post_id != id);
            t.likes.retain(|(_, p)| *p != id);
            Ok(())
        })
    }
}

#[async_trait]
impl PostRepository for Posts {
    async fn list(&self) -> Result<Vec<PostRecord>, RepoError> {
        Ok(self.0.with(|t| t.records()))
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<PostRecord>, RepoError> {
        Ok(self.0.with(|t| {
            t.records()
                .into_iter()
                .filter(|r| query.matches(r))
                .collect()
        }))
    }

    async fn find_record(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.0.with(|t| {
            let post = t.posts.iter().find(|p| p.id == id)?;
            t.record(post)
        }))
    }

    async fn update(
        &self,
        id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.0.with(|t| {
            let post = t.posts.iter_mut().find(|p| p.id == id)?;
            post.apply(changes);
            let post = post.clone();
            t.record(&post)
        }))
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for Comments {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        Ok(self.0.with(|t| t.comments.iter().find(|c| c.id == id).cloned()))
    }

    async fn insert(&self, comment: Comment) -> Result<Comment, RepoError> {
        self.0.with(|t| {
            if !t.posts.iter().any(|p| p.id == comment.post_id) {
                return Err(RepoError::NotFound);
            }
            t.comments.push(comment.clone());
            Ok(comment)
        })
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.0.with(|t| {
            let before = t.comments.len();
            t.comments.retain(|c| c.id != id);
            if t.comments.len() == before {
                Err(RepoError::NotFound)
            } else {
                Ok(())
            }
        })
    }
}

#[async_trait]
impl CommentRepository for Comments {
    async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<CommentView>, RepoError> {
        Ok(self.0.with(|t| {
            let mut views: Vec<CommentView> = t
                .comments
                .iter()
                .rev()
                .filter(|c| c.post_id == post_id)
                .filter_map(|c| {
                    let author = t.users.iter().find(|u| u.id == c.author_id)?.public();
                    Some(CommentView {
                        comment: c.clone(),
                        author,
                    })
                })
                .collect();
            views.sort_by(|a, b| b.comment.created_at.cmp(&a.comment.created_at));
            views
        }))
    }
}

#[async_trait]
impl LikeRepository for Likes {
    async fn toggle(&self, user_id: Uuid, post_id: Uuid) -> Result<LikeToggle, RepoError> {
        self.0.with(|t| {
            if !t.posts.iter().any(|p| p.id == post_id) {
                return Err(RepoError::NotFound);
            }
            let liked = if t.likes.remove(&(user_id, post_id)) {
                false
            } else {
                t.likes.insert((user_id, post_id));
                true
            };
            let like_count = t.likes.iter().filter(|(_, p)| *p == post_id).count() as u64;
            Ok(LikeToggle { liked, like_count })
        })
    }

    async fn liked_post_ids(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>, RepoError> {
        Ok(self.0.with(|t| {
            t.likes
                .iter()
                .filter(|(u, p)| *u == user_id && post_ids.contains(p))
                .map(|(_, p)| *p)
                .collect()
        }))
    }
}

/// Cheap stand-in for Argon2.
struct PlainPasswords;

impl PasswordService for PlainPasswords {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        Ok(format!("plain${password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        Ok(hash == format!("plain${password}"))
    }
}

#[derive(Default)]
struct FakeImages {
    fail: bool,
    uploads: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl ImageStore for FakeImages {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        _content_type: &str,
    ) -> Result<StoredImage, StorageError> {
        if self.fail {
            return Err(StorageError::Rejected {
                status: 401,
                message: "Invalid Signature".into(),
            });
        }
        self.uploads
            .lock()
            .unwrap()
            .push((filename.to_string(), bytes.len()));
        Ok(StoredImage {
            url: format!("https://res.cloudinary.test/blog-images/{filename}"),
            public_id: format!("blog-images/{filename}"),
        })
    }
}

#[derive(Clone, Copy)]
enum ChatScript {
    Echo,
    RateLimited,
    Broken,
}

struct FakeChat(ChatScript);

#[async_trait]
impl ChatModel for FakeChat {
    async fn generate(&self, prompt: &str) -> Result<String, ChatError> {
        match self.0 {
            ChatScript::Echo => Ok(format!("You said: {prompt}")),
            ChatScript::RateLimited => Err(ChatError::RateLimited),
            ChatScript::Broken => Err(ChatError::Provider("HTTP 500: backend error".into())),
        }
    }
}

struct DenyAll;

#[async_trait]
impl RateLimiter for DenyAll {
    async fn check(&self, _key: &str) -> Result<RateLimitDecision, RateLimitError> {
        Ok(RateLimitDecision::Limited {
            retry_after: Duration::from_secs(30),
        })
    }
}

struct BrokenLimiter;

#[async_trait]
impl RateLimiter for BrokenLimiter {
    async fn check(&self, _key: &str) -> Result<RateLimitDecision, RateLimitError> {
        Err(RateLimitError::Backend("unavailable".into()))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Options {
    chat: ChatScript,
    images: Arc<FakeImages>,
    limiter: Option<Arc<dyn RateLimiter>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            chat: ChatScript::Echo,
            images: Arc::new(FakeImages::default()),
            limiter: None,
        }
    }
}

fn state_with(options: Options) -> AppState {
    let store = Store::default();
    AppState {
        users: Arc::new(Users(store.clone())),
        posts: Arc::new(Posts(store.clone())),
        comments: Arc::new(Comments(store.clone())),
        likes: Arc::new(Likes(store)),
        tokens: Arc::new(JwtTokenService::new(JwtConfig::new(
            "test-secret-key-that-is-at-least-32-bytes",
            "quill-test",
        ))),
        passwords: Arc::new(PlainPasswords),
        images: options.images,
        chat: Arc::new(FakeChat(options.chat)),
        rate_limiter: options.limiter,
        session: SessionSettings {
            secure: false,
            max_age_secs: 7 * 24 * 3600,
        },
    }
}

fn state() -> AppState {
    state_with(Options::default())
}

macro_rules! app {
    ($state:expr) => {{
        let state: AppState = $state;
        let limiter = state.rate_limiter.clone();
        test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(|cfg| configure_routes(cfg, limiter)),
        )
        .await
    }};
}

struct Reply {
    status: StatusCode,
    body: Value,
    session: Option<Cookie<'static>>,
    headers: header::HeaderMap,
}

async fn send<S, B>(app: &S, req: TestRequest) -> Reply
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status();
    let headers = resp.headers().clone();
    let session = resp
        .response()
        .cookies()
        .find(|c| c.name() == "authToken")
        .map(|c| c.into_owned());
    let bytes = test::read_body(resp).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    Reply {
        status,
        body,
        session,
        headers,
    }
}

async fn register<S, B>(app: &S, username: &str, email: &str) -> (Cookie<'static>, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let reply = send(
        app,
        TestRequest::post().uri("/api/auth/register").set_json(json!({
            "username": username,
            "email": email,
            "password": "secret123",
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    (reply.session.unwrap(), reply.body["user"].clone())
}

async fn create_post<S, B>(app: &S, session: &Cookie<'static>, body: Value) -> Value
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let reply = send(
        app,
        TestRequest::post()
            .uri("/api/posts")
            .cookie(session.clone())
            .set_json(body),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    reply.body
}

fn post_body(title: &str, tags: &[&str]) -> Value {
    json!({
        "title": title,
        "content": "Some content",
        "excerpt": "Short excerpt",
        "tags": tags,
    })
}

fn multipart(field: &str, filename: &str, content_type: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "quill-test-boundary";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

// ---------------------------------------------------------------------------
// Health & routing
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_health() {
    let app = app!(state());

    let reply = send(&app, TestRequest::get().uri("/health")).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
    assert_eq!(reply.body["message"], "Server is running");
}

#[actix_web::test]
async fn test_unknown_route() {
    let app = app!(state());

    let reply = send(&app, TestRequest::get().uri("/api/nope")).await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["message"], "Route not found");
}

#[actix_web::test]
async fn test_malformed_json_is_bad_request() {
    let app = app!(state());

    let reply = send(
        &app,
        TestRequest::post()
            .uri("/api/auth/login")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{\"email\":"),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["message"].is_string());
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_register_sets_session_cookie_and_hides_hash() {
    let app = app!(state());

    let reply = send(
        &app,
        TestRequest::post().uri("/api/auth/register").set_json(json!({
            "username": "alice",
            "email": "Alice@Example.com",
            "password": "secret123",
            "avatar": "",
        })),
    )
    .await;

    assert_eq!(reply.status, StatusCode::CREATED);
    let user = &reply.body["user"];
    assert_eq!(user["username"], "alice");
    assert_eq!(user["email"], "alice@example.com");
    assert!(user["avatar"].is_null());
    assert!(user.get("passwordHash").is_none());
    assert!(user.get("password_hash").is_none());

    let cookie = reply.session.unwrap();
    assert_eq!(cookie.http_only(), Some(true));
    assert!(!cookie.value().is_empty());
}

#[actix_web::test]
async fn test_register_duplicate_email_any_case_conflicts() {
    let app = app!(state());
    register(&app, "alice", "alice@example.com").await;

    let reply = send(
        &app,
        TestRequest::post().uri("/api/auth/register").set_json(json!({
            "username": "alice2",
            "email": "ALICE@example.com",
            "password": "secret123",
        })),
    )
    .await;

    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body["message"], "Email or username already exists");
}

#[actix_web::test]
async fn test_register_duplicate_username_conflicts() {
    let app = app!(state());
    register(&app, "alice", "alice@example.com").await;

    let reply = send(
        &app,
        TestRequest::post().uri("/api/auth/register").set_json(json!({
            "username": "alice",
            "email": "other@example.com",
            "password": "secret123",
        })),
    )
    .await;

    assert_eq!(reply.status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn test_register_validation_names_fields() {
    let app = app!(state());

    let reply = send(
        &app,
        TestRequest::post().uri("/api/auth/register").set_json(json!({
            "username": "al",
            "email": "not-an-email",
            "password": "secret123",
        })),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Validation error");
    let fields: Vec<&str> = reply.body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "username"]);
}

#[actix_web::test]
async fn test_missing_auth_fields_are_validation_errors() {
    let app = app!(state());

    let register = send(
        &app,
        TestRequest::post().uri("/api/auth/register").set_json(json!({
            "email": "alice@example.com",
            "password": "secret123",
        })),
    )
    .await;
    assert_eq!(register.status, StatusCode::BAD_REQUEST);
    assert_eq!(register.body["message"], "Validation error");
    assert_eq!(register.body["errors"][0]["field"], "username");
    assert_eq!(register.body["errors"].as_array().unwrap().len(), 1);

    let login = send(
        &app,
        TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "alice@example.com" })),
    )
    .await;
    assert_eq!(login.status, StatusCode::BAD_REQUEST);
    assert_eq!(login.body["message"], "Validation error");
    assert_eq!(login.body["errors"][0]["field"], "password");
}

#[actix_web::test]
async fn test_login_failures_are_indistinguishable() {
    let app = app!(state());
    register(&app, "alice", "alice@example.com").await;

    let wrong_password = send(
        &app,
        TestRequest::post().uri("/api/auth/login").set_json(json!({
            "email": "alice@example.com",
            "password": "wrong-password",
        })),
    )
    .await;
    let unknown_email = send(
        &app,
        TestRequest::post().uri("/api/auth/login").set_json(json!({
            "email": "nobody@example.com",
            "password": "secret123",
        })),
    )
    .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_email.body);
    assert_eq!(wrong_password.body["message"], "Invalid email or password");
}

#[actix_web::test]
async fn test_login_sets_cookie() {
    let app = app!(state());
    register(&app, "alice", "alice@example.com").await;

    let reply = send(
        &app,
        TestRequest::post().uri("/api/auth/login").set_json(json!({
            "email": "ALICE@example.com",
            "password": "secret123",
        })),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["user"]["username"], "alice");
    assert!(reply.session.is_some());
}

#[actix_web::test]
async fn test_me_requires_session() {
    let app = app!(state());

    let reply = send(&app, TestRequest::get().uri("/api/auth/me")).await;

    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["message"], "Unauthorized");
}

#[actix_web::test]
async fn test_me_accepts_cookie_or_bearer() {
    let app = app!(state());
    let (session, _) = register(&app, "alice", "alice@example.com").await;

    let by_cookie = send(
        &app,
        TestRequest::get().uri("/api/auth/me").cookie(session.clone()),
    )
    .await;
    let by_header = send(
        &app,
        TestRequest::get()
            .uri("/api/auth/me")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", session.value()))),
    )
    .await;

    assert_eq!(by_cookie.status, StatusCode::OK);
    assert_eq!(by_header.status, StatusCode::OK);
    assert_eq!(by_cookie.body["user"]["username"], "alice");
}

#[actix_web::test]
async fn test_invalid_token_and_vanished_user() {
    let state = state();
    let orphan = state
        .tokens
        .generate_token(Uuid::new_v4(), "ghost@example.com")
        .unwrap();
    let app = app!(state);

    let garbage = send(
        &app,
        TestRequest::get()
            .uri("/api/auth/me")
            .cookie(Cookie::new("authToken", "not-a-jwt")),
    )
    .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.body["message"], "Invalid token");

    let ghost = send(
        &app,
        TestRequest::get()
            .uri("/api/auth/me")
            .cookie(Cookie::new("authToken", orphan)),
    )
    .await;
    assert_eq!(ghost.status, StatusCode::UNAUTHORIZED);
    assert_eq!(ghost.body["message"], "User not found");
}

#[actix_web::test]
async fn test_logout_clears_cookie() {
    let app = app!(state());

    let reply = send(&app, TestRequest::post().uri("/api/auth/logout")).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Logged out successfully");
    let cookie = reply.session.unwrap();
    assert_eq!(cookie.value(), "");
    assert_eq!(
        cookie.max_age(),
        Some(actix_web::cookie::time::Duration::ZERO)
    );
}

#[actix_web::test]
async fn test_profile_update_partial_and_avatar_clear() {
    let app = app!(state());
    let reply = send(
        &app,
        TestRequest::post().uri("/api/auth/register").set_json(json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "secret123",
            "avatar": "https://cdn.example.com/alice.png",
        })),
    )
    .await;
    let session = reply.session.unwrap();

    let renamed = send(
        &app,
        TestRequest::put()
            .uri("/api/auth/profile")
            .cookie(session.clone())
            .set_json(json!({ "username": "alicia" })),
    )
    .await;
    assert_eq!(renamed.status, StatusCode::OK);
    assert_eq!(renamed.body["user"]["username"], "alicia");
    assert_eq!(
        renamed.body["user"]["avatar"],
        "https://cdn.example.com/alice.png"
    );

    let cleared = send(
        &app,
        TestRequest::put()
            .uri("/api/auth/profile")
            .cookie(session)
            .set_json(json!({ "avatar": null })),
    )
    .await;
    assert_eq!(cleared.status, StatusCode::OK);
    assert!(cleared.body["user"]["avatar"].is_null());
    assert_eq!(cleared.body["user"]["username"], "alicia");
}

#[actix_web::test]
async fn test_profile_update_conflicts_with_other_user() {
    let app = app!(state());
    register(&app, "bob", "bob@example.com").await;
    let (session, _) = register(&app, "alice", "alice@example.com").await;

    let taken = send(
        &app,
        TestRequest::put()
            .uri("/api/auth/profile")
            .cookie(session.clone())
            .set_json(json!({ "email": "BOB@example.com" })),
    )
    .await;
    assert_eq!(taken.status, StatusCode::CONFLICT);

    // Re-submitting one's own username is not a conflict.
    let own = send(
        &app,
        TestRequest::put()
            .uri("/api/auth/profile")
            .cookie(session)
            .set_json(json!({ "username": "alice" })),
    )
    .await;
    assert_eq!(own.status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_create_post_requires_title() {
    let app = app!(state());
    let (session, _) = register(&app, "alice", "alice@example.com").await;

    let reply = send(
        &app,
        TestRequest::post()
            .uri("/api/posts")
            .cookie(session)
            .set_json(json!({ "content": "Body", "excerpt": "Short" })),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["errors"][0]["field"], "title");
}

#[actix_web::test]
async fn test_create_post_requires_auth() {
    let app = app!(state());

    let reply = send(
        &app,
        TestRequest::post()
            .uri("/api/posts")
            .set_json(post_body("Hello", &[])),
    )
    .await;

    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_create_post_returns_public_author() {
    let app = app!(state());
    let (session, user) = register(&app, "alice", "alice@example.com").await;

    let post = create_post(&app, &session, post_body("Hello", &["rust"])).await;

    assert_eq!(post["title"], "Hello");
    assert_eq!(post["authorId"], user["id"]);
    assert_eq!(post["author"]["username"], "alice");
    assert!(post["author"].get("passwordHash").is_none());
    assert_eq!(post["likeCount"], 0);
    assert_eq!(post["commentCount"], 0);
    assert_eq!(post["isLiked"], false);
    assert_eq!(post["tags"], json!(["rust"]));
}

#[actix_web::test]
async fn test_get_missing_post_is_not_found() {
    let app = app!(state());

    let missing = send(
        &app,
        TestRequest::get().uri(&format!("/api/posts/{}", Uuid::new_v4())),
    )
    .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body, json!({ "message": "Post not found" }));

    let malformed = send(&app, TestRequest::get().uri("/api/posts/not-a-uuid")).await;
    assert_eq!(malformed.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_like_toggle_scenario() {
    let app = app!(state());
    let (session, _) = register(&app, "alice", "alice@example.com").await;
    let post = create_post(&app, &session, post_body("Hello", &[])).await;
    let like_uri = format!("/api/posts/{}/like", post["id"].as_str().unwrap());

    let first = send(
        &app,
        TestRequest::post().uri(&like_uri).cookie(session.clone()),
    )
    .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body, json!({ "liked": true, "likeCount": 1 }));

    let listed = send(&app, TestRequest::get().uri("/api/posts").cookie(session.clone())).await;
    assert_eq!(listed.body[0]["isLiked"], true);
    assert_eq!(listed.body[0]["likeCount"], 1);

    let anonymous = send(&app, TestRequest::get().uri("/api/posts")).await;
    assert_eq!(anonymous.body[0]["isLiked"], false);

    let second = send(&app, TestRequest::post().uri(&like_uri).cookie(session)).await;
    assert_eq!(second.body, json!({ "liked": false, "likeCount": 0 }));
}

#[actix_web::test]
async fn test_like_unknown_post_is_not_found() {
    let app = app!(state());
    let (session, _) = register(&app, "alice", "alice@example.com").await;

    let reply = send(
        &app,
        TestRequest::post()
            .uri(&format!("/api/posts/{}/like", Uuid::new_v4()))
            .cookie(session),
    )
    .await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_list_is_newest_first() {
    let app = app!(state());
    let (session, _) = register(&app, "alice", "alice@example.com").await;
    create_post(&app, &session, post_body("First", &[])).await;
    create_post(&app, &session, post_body("Second", &[])).await;

    let reply = send(&app, TestRequest::get().uri("/api/posts")).await;

    assert_eq!(reply.body[0]["title"], "Second");
    assert_eq!(reply.body[1]["title"], "First");
}

#[actix_web::test]
async fn test_search_matches_exact_tags() {
    let app = app!(state());
    let (session, _) = register(&app, "alice", "alice@example.com").await;
    create_post(&app, &session, post_body("Hooks deep dive", &["react"])).await;
    create_post(&app, &session, post_body("Streams", &["reactive"])).await;
    create_post(&app, &session, post_body("Ownership", &["rust"])).await;

    let reply = send(&app, TestRequest::get().uri("/api/posts/search?q=react")).await;

    assert_eq!(reply.status, StatusCode::OK);
    let titles: Vec<&str> = reply
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Hooks deep dive"]);
}

#[actix_web::test]
async fn test_search_is_case_insensitive_on_text() {
    let app = app!(state());
    let (session, _) = register(&app, "alice", "alice@example.com").await;
    create_post(&app, &session, post_body("Learning RUST", &[])).await;

    let by_title = send(&app, TestRequest::get().uri("/api/posts/search?q=rust")).await;
    let by_author = send(&app, TestRequest::get().uri("/api/posts/search?q=ALI")).await;

    assert_eq!(by_title.body.as_array().unwrap().len(), 1);
    assert_eq!(by_author.body.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn test_search_requires_query() {
    let app = app!(state());

    for uri in ["/api/posts/search", "/api/posts/search?q=%20%20"] {
        let reply = send(&app, TestRequest::get().uri(uri)).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["message"], "Search query is required");
    }
}

#[actix_web::test]
async fn test_update_and_delete_post() {
    let app = app!(state());
    let (session, _) = register(&app, "alice", "alice@example.com").await;
    let post = create_post(&app, &session, post_body("Draft", &[])).await;
    let uri = format!("/api/posts/{}", post["id"].as_str().unwrap());

    let updated = send(
        &app,
        TestRequest::put()
            .uri(&uri)
            .cookie(session.clone())
            .set_json(json!({ "title": "Final", "tags": ["done"] })),
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["title"], "Final");
    assert_eq!(updated.body["content"], "Some content");
    assert_eq!(updated.body["tags"], json!(["done"]));

    let deleted = send(&app, TestRequest::delete().uri(&uri).cookie(session.clone())).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Post deleted successfully");

    let gone = send(&app, TestRequest::get().uri(&uri)).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);

    let again = send(&app, TestRequest::delete().uri(&uri).cookie(session)).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
    assert_eq!(again.body["message"], "Post not found");
}

#[actix_web::test]
async fn test_update_rejects_empty_image() {
    let app = app!(state());
    let (session, _) = register(&app, "alice", "alice@example.com").await;
    let post = create_post(
        &app,
        &session,
        json!({
            "title": "Cover",
            "content": "Some content",
            "excerpt": "Short excerpt",
            "image": "https://cdn.example.com/cover.png",
        }),
    )
    .await;
    let uri = format!("/api/posts/{}", post["id"].as_str().unwrap());

    let reply = send(
        &app,
        TestRequest::put()
            .uri(&uri)
            .cookie(session)
            .set_json(json!({ "image": "" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["errors"][0]["field"], "image");

    let unchanged = send(&app, TestRequest::get().uri(&uri)).await;
    assert_eq!(unchanged.body["image"], "https://cdn.example.com/cover.png");
}

#[actix_web::test]
async fn test_update_missing_post_is_not_found() {
    let app = app!(state());
    let (session, _) = register(&app, "alice", "alice@example.com").await;

    let reply = send(
        &app,
        TestRequest::put()
            .uri(&format!("/api/posts/{}", Uuid::new_v4()))
            .cookie(session)
            .set_json(json!({ "title": "Nope" })),
    )
    .await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_comments_newest_first_with_author() {
    let app = app!(state());
    let (session, _) = register(&app, "alice", "alice@example.com").await;
    let post = create_post(&app, &session, post_body("Hello", &[])).await;
    let uri = format!("/api/posts/{}/comments", post["id"].as_str().unwrap());

    for content in ["first!", "second"] {
        let reply = send(
            &app,
            TestRequest::post()
                .uri(&uri)
                .cookie(session.clone())
                .set_json(json!({ "content": content })),
        )
        .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(reply.body["author"]["username"], "alice");
    }

    let listed = send(&app, TestRequest::get().uri(&uri)).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body[0]["content"], "second");
    assert_eq!(listed.body[1]["content"], "first!");

    let post = send(
        &app,
        TestRequest::get().uri(&format!("/api/posts/{}", post["id"].as_str().unwrap())),
    )
    .await;
    assert_eq!(post.body["commentCount"], 2);
}

#[actix_web::test]
async fn test_comment_on_unknown_post() {
    let app = app!(state());
    let (session, _) = register(&app, "alice", "alice@example.com").await;
    let uri = format!("/api/posts/{}/comments", Uuid::new_v4());

    let created = send(
        &app,
        TestRequest::post()
            .uri(&uri)
            .cookie(session)
            .set_json(json!({ "content": "hello?" })),
    )
    .await;
    assert_eq!(created.status, StatusCode::NOT_FOUND);

    let listed = send(&app, TestRequest::get().uri(&uri)).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body, json!([]));
}

#[actix_web::test]
async fn test_comment_length_is_validated() {
    let app = app!(state());
    let (session, _) = register(&app, "alice", "alice@example.com").await;
    let post = create_post(&app, &session, post_body("Hello", &[])).await;

    let reply = send(
        &app,
        TestRequest::post()
            .uri(&format!("/api/posts/{}/comments", post["id"].as_str().unwrap()))
            .cookie(session)
            .set_json(json!({ "content": "x".repeat(1001) })),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["errors"][0]["field"], "content");
}

// ---------------------------------------------------------------------------
// Uploads
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_upload_image() {
    let images = Arc::new(FakeImages::default());
    let app = app!(state_with(Options {
        images: images.clone(),
        ..Options::default()
    }));
    let (session, _) = register(&app, "alice", "alice@example.com").await;
    let (content_type, body) = multipart("file", "cat.png", "image/png", b"\x89PNG fake");

    let reply = send(
        &app,
        TestRequest::post()
            .uri("/api/uploads")
            .cookie(session)
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body),
    )
    .await;

    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    assert_eq!(reply.body["public_id"], "blog-images/cat.png");
    assert!(reply.body["url"].as_str().unwrap().starts_with("https://"));
    assert_eq!(
        images.uploads.lock().unwrap().as_slice(),
        &[("cat.png".to_string(), 9)]
    );
}

#[actix_web::test]
async fn test_upload_rejects_non_images_and_missing_file() {
    let app = app!(state());
    let (session, _) = register(&app, "alice", "alice@example.com").await;

    let (content_type, body) = multipart("file", "notes.txt", "text/plain", b"hello");
    let text = send(
        &app,
        TestRequest::post()
            .uri("/api/uploads")
            .cookie(session.clone())
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body),
    )
    .await;
    assert_eq!(text.status, StatusCode::BAD_REQUEST);
    assert_eq!(text.body["message"], "Only image files are allowed");

    let (content_type, body) = multipart("other", "cat.png", "image/png", b"data");
    let missing = send(
        &app,
        TestRequest::post()
            .uri("/api/uploads")
            .cookie(session)
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body),
    )
    .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["message"], "No file uploaded");
}

#[actix_web::test]
async fn test_upload_too_large() {
    let app = app!(state());
    let (session, _) = register(&app, "alice", "alice@example.com").await;
    let data = vec![0u8; super::uploads::MAX_UPLOAD_BYTES + 1];
    let (content_type, body) = multipart("file", "huge.png", "image/png", &data);

    let reply = send(
        &app,
        TestRequest::post()
            .uri("/api/uploads")
            .cookie(session)
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body),
    )
    .await;

    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[actix_web::test]
async fn test_upload_provider_failure() {
    let app = app!(state_with(Options {
        images: Arc::new(FakeImages {
            fail: true,
            ..FakeImages::default()
        }),
        ..Options::default()
    }));
    let (session, _) = register(&app, "alice", "alice@example.com").await;
    let (content_type, body) = multipart("file", "cat.png", "image/png", b"data");

    let reply = send(
        &app,
        TestRequest::post()
            .uri("/api/uploads")
            .cookie(session)
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body),
    )
    .await;

    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body["message"], "Failed to upload image");
}

#[actix_web::test]
async fn test_upload_requires_auth() {
    let app = app!(state());
    let (content_type, body) = multipart("file", "cat.png", "image/png", b"data");

    let reply = send(
        &app,
        TestRequest::post()
            .uri("/api/uploads")
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body),
    )
    .await;

    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// AI
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_chat_round_trip() {
    let app = app!(state());

    let reply = send(
        &app,
        TestRequest::post()
            .uri("/api/ai/chat")
            .set_json(json!({ "message": "  hi  " })),
    )
    .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "response": "You said: hi" }));
}

#[actix_web::test]
async fn test_chat_requires_message() {
    let app = app!(state());

    for body in [json!({}), json!({ "message": "   " })] {
        let reply = send(&app, TestRequest::post().uri("/api/ai/chat").set_json(body)).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["message"], "Message is required");
    }
}

#[actix_web::test]
async fn test_chat_provider_rate_limit() {
    let app = app!(state_with(Options {
        chat: ChatScript::RateLimited,
        ..Options::default()
    }));

    let reply = send(
        &app,
        TestRequest::post()
            .uri("/api/ai/chat")
            .set_json(json!({ "message": "hi" })),
    )
    .await;

    assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        reply.body["message"],
        "Rate limit exceeded. Please wait before trying again."
    );
    assert!(reply.body["response"].is_string());
}

#[actix_web::test]
async fn test_ai_key_check() {
    let ok = app!(state());
    let reply = send(&ok, TestRequest::get().uri("/api/ai/test")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.body,
        json!({ "status": "API key is working", "test": "success" })
    );

    let broken = app!(state_with(Options {
        chat: ChatScript::Broken,
        ..Options::default()
    }));
    let reply = send(&broken, TestRequest::get().uri("/api/ai/test")).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body["status"], "API key test failed");
    assert!(reply.body["suggestion"].as_str().unwrap().contains("GEMINI_API_KEY"));
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

#[actix_web::test]
async fn test_throttled_scopes() {
    let app = app!(state_with(Options {
        limiter: Some(Arc::new(DenyAll)),
        ..Options::default()
    }));

    let auth = send(&app, TestRequest::post().uri("/api/auth/logout")).await;
    assert_eq!(auth.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        auth.headers.get(header::RETRY_AFTER).unwrap().to_str().unwrap(),
        "30"
    );

    let ai = send(
        &app,
        TestRequest::post()
            .uri("/api/ai/chat")
            .set_json(json!({ "message": "hi" })),
    )
    .await;
    assert_eq!(ai.status, StatusCode::TOO_MANY_REQUESTS);

    // Reads are never throttled.
    let posts = send(&app, TestRequest::get().uri("/api/posts")).await;
    assert_eq!(posts.status, StatusCode::OK);
}

#[actix_web::test]
async fn test_limiter_failure_fails_open() {
    let app = app!(state_with(Options {
        limiter: Some(Arc::new(BrokenLimiter)),
        ..Options::default()
    }));

    let reply = send(&app, TestRequest::post().uri("/api/auth/logout")).await;

    assert_eq!(reply.status, StatusCode::OK);
}
