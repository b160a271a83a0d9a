use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use orderbot_core::errors::{ApplicationError, DomainError};
use orderbot_core::intent::{WebhookRequest, WebhookResponse};
use tracing::{info, warn};
use uuid::Uuid;

use crate::assistant::OrderAssistant;

/// Fulfillment endpoint. Every parsed call answers 200 with a fulfillment text; only payloads
/// that cannot be attributed to a session are rejected.
pub async fn fulfill(
    State(assistant): State<Arc<OrderAssistant>>,
    payload: Result<Json<WebhookRequest>, JsonRejection>,
) -> (StatusCode, Json<WebhookResponse>) {
    let correlation_id = Uuid::new_v4().to_string();

    let call = payload
        .map_err(|rejection| DomainError::MalformedPayload(rejection.body_text()))
        .and_then(|Json(request)| request.into_call());

    let call = match call {
        Ok(call) => call,
        Err(error) => {
            warn!(
                event_name = "server.webhook.rejected",
                correlation_id = %correlation_id,
                error = %error,
                "rejected webhook payload"
            );
            let interface = ApplicationError::from(error).into_interface(correlation_id);
            return (
                StatusCode::BAD_REQUEST,
                Json(WebhookResponse::text(interface.user_message())),
            );
        }
    };

    info!(
        event_name = "server.webhook.received",
        correlation_id = %correlation_id,
        session_id = %call.session_id,
        intent = %call.intent_name,
        active_sessions = assistant.sessions().len(),
        "webhook call received"
    );

    (StatusCode::OK, Json(assistant.fulfill(call).await))
}
