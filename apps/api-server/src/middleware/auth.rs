//! Session cookie handling and authentication extractors.

use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};
use futures::future::LocalBoxFuture;
use uuid::Uuid;

use quill_core::domain::PublicUser;
use quill_core::ports::{AuthError, BaseRepository};

use crate::middleware::error::AppError;
use crate::state::{AppState, SessionSettings};

/// Name of the HTTP-only session cookie.
pub const SESSION_COOKIE: &str = "authToken";

/// Cookie carrying a freshly issued session token.
pub fn session_cookie(token: String, settings: SessionSettings) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Strict)
        .max_age(Duration::seconds(settings.max_age_secs))
        .finish()
}

/// Expired cookie that makes the browser drop the session.
pub fn clear_session_cookie(settings: SessionSettings) -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .secure(settings.secure)
        .same_site(SameSite::Strict)
        .finish();
    cookie.make_removal();
    cookie
}

/// Session token from the cookie, else from `Authorization: Bearer`.
fn request_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE).filter(|c| !c.value().is_empty()) {
        return Some(cookie.value().to_string());
    }

    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

/// Authenticated user identity extractor.
///
/// The token must verify and its user must still exist:
/// ```ignore
/// async fn protected_route(identity: Identity) -> impl Responder {
///     format!("Hello, {}!", identity.user.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub user: PublicUser,
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = request_token(req);

        Box::pin(async move {
            let state =
                state.ok_or_else(|| AppError::Internal("AppState not registered".to_string()))?;
            let token = token.ok_or(AuthError::MissingAuth)?;

            let claims = state.tokens.validate_token(&token)?;

            let user = state
                .users
                .find_by_id(claims.user_id)
                .await?
                .ok_or(AuthError::UserNotFound)?;

            Ok(Identity {
                user_id: user.id,
                email: user.email.clone(),
                user: user.public(),
            })
        })
    }
}

/// Optional identity extractor - doesn't fail if not authenticated.
pub struct OptionalIdentity(pub Option<Identity>);

impl OptionalIdentity {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|identity| identity.user_id)
    }
}

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let identity = Identity::from_request(req, payload);
        Box::pin(async move { Ok(OptionalIdentity(identity.await.ok())) })
    }
}
