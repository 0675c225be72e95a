//! Request and response bodies.

use serde::{Deserialize, Serialize};

/// `POST /chat/send` request body.
#[derive(Debug, Default, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /chat/send` success body.
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub reply: String,
}

/// Error body shared by every failure response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
