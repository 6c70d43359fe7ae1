//! Authentication handlers.

use actix_web::{HttpResponse, web};
use validator::Validate;

use quill_core::domain::{ProfileChanges, User, normalize_email};
use quill_core::DomainError;
use quill_core::ports::{AuthError, BaseRepository};
use quill_shared::dto::{
    AuthResponse, LoginRequest, MessageResponse, RegisterRequest, UpdateProfileRequest,
};

use super::present;
use crate::middleware::auth::{Identity, clear_session_cookie, session_cookie};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn issue_token(state: &AppState, user: &User) -> AppResult<String> {
    state
        .tokens
        .generate_token(user.id, &user.email)
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// POST /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    req.validate()?;

    let username = req.username.unwrap_or_default();
    let email = normalize_email(req.email.as_deref().unwrap_or_default());
    let password = req.password.unwrap_or_default();

    if state
        .users
        .find_conflicting(Some(&username), Some(&email), None)
        .await?
        .is_some()
    {
        return Err(
            DomainError::Duplicate("Email or username already exists".to_string()).into(),
        );
    }

    let password_hash = state.passwords.hash(&password)?;

    // The unique constraints catch a concurrent registration of the same name.
    let user = state
        .users
        .insert(User::new(username, email, password_hash, req.avatar))
        .await?;

    let token = issue_token(&state, &user)?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok(HttpResponse::Created()
        .cookie(session_cookie(token, state.session))
        .json(AuthResponse {
            user: present::user(user.public()),
        }))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    req.validate()?;

    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    // Unknown email and wrong password are indistinguishable to the caller.
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !state.passwords.verify(&password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Password mismatch");
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = issue_token(&state, &user)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(token, state.session))
        .json(AuthResponse {
            user: present::user(user.public()),
        }))
}

/// POST /api/auth/logout
pub async fn logout(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(clear_session_cookie(state.session))
        .json(MessageResponse::new("Logged out successfully"))
}

/// GET /api/auth/me - Protected route
pub async fn me(identity: Identity) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(AuthResponse {
        user: present::user(identity.user),
    }))
}

/// PUT /api/auth/profile - Protected route
pub async fn update_profile(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<UpdateProfileRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    req.validate()?;

    let changes = ProfileChanges {
        username: req.username,
        email: req.email.as_deref().map(normalize_email),
        avatar: req.avatar,
    };

    if let Some((username, email)) = changes.identity_fields() {
        let taken = state
            .users
            .find_conflicting(username, email, Some(identity.user_id))
            .await?;
        if taken.is_some() {
            return Err(
                DomainError::Duplicate("Username or email already exists".to_string()).into(),
            );
        }
    }

    let user = if changes.is_empty() {
        state.users.find_by_id(identity.user_id).await?
    } else {
        state.users.update_profile(identity.user_id, changes).await?
    }
    .ok_or(AuthError::UserNotFound)?;

    tracing::info!(user_id = %user.id, "Profile updated");

    Ok(HttpResponse::Ok().json(AuthResponse {
        user: present::user(user.public()),
    }))
}
