//! # chatrelay_api
//!
//! HTTP API library for chatrelay.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use chatrelay_core::ChatService;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::chat;

/// Route paths.
pub mod routes {
    pub const GET_CHAT: &str = "/chat";
    pub const POST_CHAT_SEND: &str = "/chat/send";
}

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Forwarding service. Read-only, shared across requests.
    pub chat: Arc<ChatService>,
}

impl AppState {
    pub fn new(chat: ChatService) -> Self {
        Self {
            chat: Arc::new(chat),
        }
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(routes::GET_CHAT, get(chat::index_handler))
        .route(routes::POST_CHAT_SEND, post(chat::send_handler))
        .layer(cors)
        .with_state(state)
}
