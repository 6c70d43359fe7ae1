//! HTTP handlers and route configuration.

mod ai;
mod auth;
mod comments;
mod health;
mod posts;
mod present;
mod uploads;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use actix_web::{HttpResponse, web};

use quill_core::ports::RateLimiter;
use quill_shared::ErrorResponse;

use crate::middleware::error::AppError;
use crate::middleware::rate_limit::RateLimitMiddleware;

/// Largest accepted JSON body.
const JSON_LIMIT_BYTES: usize = 1024 * 1024;

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT_BYTES)
        .error_handler(|err, _req| {
            tracing::debug!(error = %err, "Rejected JSON body");
            AppError::bad_request(err.to_string()).into()
        })
}

async fn route_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse::new("Route not found"))
}

/// Configure all application routes.
///
/// The auth and AI scopes are throttled by `limiter` when one is given.
pub fn configure_routes(cfg: &mut web::ServiceConfig, limiter: Option<Arc<dyn RateLimiter>>) {
    cfg.app_data(json_config())
        .route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/api")
                .service(
                    web::scope("/auth")
                        .wrap(RateLimitMiddleware::new(limiter.clone()))
                        .route("/register", web::post().to(auth::register))
                        .route("/login", web::post().to(auth::login))
                        .route("/logout", web::post().to(auth::logout))
                        .route("/me", web::get().to(auth::me))
                        .route("/profile", web::put().to(auth::update_profile)),
                )
                .service(
                    web::scope("/posts")
                        .route("", web::get().to(posts::list))
                        .route("", web::post().to(posts::create))
                        .route("/search", web::get().to(posts::search))
                        .route("/{id}", web::get().to(posts::get))
                        .route("/{id}", web::put().to(posts::update))
                        .route("/{id}", web::delete().to(posts::delete))
                        .route("/{id}/like", web::post().to(posts::toggle_like))
                        .route("/{id}/comments", web::get().to(comments::list))
                        .route("/{id}/comments", web::post().to(comments::create)),
                )
                .route("/uploads", web::post().to(uploads::upload))
                .service(
                    web::scope("/ai")
                        .wrap(RateLimitMiddleware::new(limiter))
                        .route("/chat", web::post().to(ai::chat))
                        .route("/test", web::get().to(ai::test_api)),
                ),
        )
        .default_service(web::to(route_not_found));
}
