//! Chat page and message forwarding handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::Html;
use chatrelay_core::ChatError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::AppState;
use crate::error::{AppError, AppResult, MESSAGE_REQUIRED};
use crate::models::{SendMessageRequest, SendMessageResponse};

const CHAT_PAGE: &str = include_str!("../../assets/chat.html");

/// `GET /chat` — static chat page.
pub async fn index_handler() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

/// `POST /chat/send` — forward one message and return the model's reply.
///
/// If the client disconnects, axum drops this future. The drop guard then
/// cancels the token and the upstream call is aborted without a response.
pub async fn send_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<SendMessageResponse>> {
    let message = extract_message(&body).ok_or(AppError::Validation(MESSAGE_REQUIRED))?;

    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    match state.chat.send(&message, &cancel).await {
        Ok(reply) => Ok(Json(SendMessageResponse { reply })),
        Err(e) => {
            log_failure(&e);
            Err(AppError::Chat(e))
        }
    }
}

/// Returns the message when the body is JSON with a non-blank `message`.
/// Unparsable bodies count as a missing message.
fn extract_message(body: &[u8]) -> Option<String> {
    let request: SendMessageRequest = serde_json::from_slice(body).ok()?;
    request.message.filter(|m| !m.trim().is_empty())
}

fn log_failure(e: &ChatError) {
    match e {
        ChatError::Cancelled => debug!("chat request cancelled by caller"),
        ChatError::Status { status, body } => error!(
            kind = e.kind(),
            error = %e,
            status = *status,
            body = %body,
            "chat request failed"
        ),
        _ => error!(kind = e.kind(), error = %e, "chat request failed"),
    }
}
