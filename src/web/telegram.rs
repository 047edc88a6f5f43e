//! Telegram webhook endpoint.
use crate::bot::handlers::{handle_incoming, Incoming};
use crate::state::SharedState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use teloxide::types::{ChatKind, Message, Update, UpdateKind};

pub const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/webhook", post(handle_update))
        .with_state(state)
}

async fn handle_update(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(secret) = state.webhook_secret.as_deref() {
        let given = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if given != Some(secret) {
            tracing::warn!("Rejected webhook call with a wrong secret token");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            tracing::warn!("Malformed Telegram update: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    let Some(incoming) = to_incoming(update) else {
        return StatusCode::OK;
    };
    // Telegram redelivers on non-2xx; a failed update is logged and dropped instead.
    if let Err(e) = handle_incoming(&state, incoming).await {
        tracing::error!("Failed to handle Telegram update: {:#}", e);
    }
    StatusCode::OK
}

/// Private text messages and button presses; everything else is ignored.
pub fn to_incoming(update: Update) -> Option<Incoming> {
    match update.kind {
        UpdateKind::Message(message) => private_text(&message),
        UpdateKind::CallbackQuery(callback) => {
            let message = callback.message?;
            Some(Incoming::Callback {
                id: callback.id,
                chat_id: message.chat.id.0,
                user_id: callback.from.id.0 as i64,
                data: callback.data.unwrap_or_default(),
            })
        }
        _ => None,
    }
}

fn private_text(message: &Message) -> Option<Incoming> {
    if !matches!(message.chat.kind, ChatKind::Private(_)) {
        return None;
    }
    let text = message.text()?;
    let user_id = message
        .from()
        .map(|user| user.id.0 as i64)
        .unwrap_or(message.chat.id.0);
    Some(Incoming::Text {
        chat_id: message.chat.id.0,
        user_id,
        text: text.to_string(),
    })
}
