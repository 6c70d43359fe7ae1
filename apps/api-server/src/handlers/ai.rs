//! AI chat proxy handlers.

use actix_web::{HttpResponse, web};
use serde::Serialize;

use quill_shared::dto::{ChatRequest, ChatResponse};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /api/ai/chat
pub async fn chat(
    state: web::Data<AppState>,
    body: web::Json<ChatRequest>,
) -> AppResult<HttpResponse> {
    let message = body
        .into_inner()
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::bad_request("Message is required"))?;

    let response = state.chat.generate(&message).await?;

    Ok(HttpResponse::Ok().json(ChatResponse { response }))
}

#[derive(Serialize)]
struct ApiTestPassed {
    status: &'static str,
    test: &'static str,
}

#[derive(Serialize)]
struct ApiTestFailed {
    status: &'static str,
    error: String,
    suggestion: &'static str,
}

/// GET /api/ai/test - round-trips a trivial prompt to check the API key.
pub async fn test_api(state: web::Data<AppState>) -> HttpResponse {
    match state.chat.generate("Hello").await {
        Ok(_) => HttpResponse::Ok().json(ApiTestPassed {
            status: "API key is working",
            test: "success",
        }),
        Err(e) => {
            tracing::error!(error = %e, "AI API test failed");
            HttpResponse::InternalServerError().json(ApiTestFailed {
                status: "API key test failed",
                error: e.to_string(),
                suggestion: "Please check if your GEMINI_API_KEY is correct in the .env file",
            })
        }
    }
}
