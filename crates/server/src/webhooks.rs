//! Inbound SMS and delivery-status webhook endpoints.
//!
//! The provider treats any non-200 as retry-worthy, so both endpoints always
//! answer 200: the inbound route falls back to a fixed technical-difficulty
//! message when the pipeline fails, and the status route acknowledges even
//! payloads it could not use.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Form, Router,
};
use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use washline_agent::{TurnHandler, TurnRequest};
use washline_core::domain::conversation::{ConversationThread, Message, TenantId};
use washline_db::repositories::{ConversationRepository, RepositoryError};
use washline_sms::{
    message_response_xml, parse_inbound_form, parse_status_form, InboundSms, SmsParseError,
    TECHNICAL_DIFFICULTY_REPLY,
};

#[derive(Clone)]
pub struct WebhookState {
    pub conversations: Arc<dyn ConversationRepository>,
    pub turn_handler: Arc<dyn TurnHandler>,
    pub tenant_id: TenantId,
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhooks/sms", post(inbound_sms))
        .route("/webhooks/sms/status", post(delivery_status))
        .with_state(state)
}

#[derive(Debug, Error)]
enum InboundError {
    #[error(transparent)]
    Parse(#[from] SmsParseError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub async fn inbound_sms(
    State(state): State<WebhookState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let reply = match process_inbound(&state, &fields).await {
        Ok(reply) => reply,
        Err(inbound_error) => {
            warn!(
                event_name = "sms.webhook.inbound_failed",
                tenant_id = %state.tenant_id.0,
                error = %inbound_error,
                "inbound webhook processing failed, sending fixed reply"
            );
            TECHNICAL_DIFFICULTY_REPLY.to_string()
        }
    };

    xml_response(&reply)
}

async fn process_inbound(
    state: &WebhookState,
    fields: &HashMap<String, String>,
) -> Result<String, InboundError> {
    let inbound = parse_inbound_form(fields, state.tenant_id.clone())?;

    let thread = find_or_open_thread(state, &inbound).await?;

    let inbound_message = Message::inbound(
        thread.id.clone(),
        inbound.body.clone(),
        inbound.media_urls.clone(),
        Some(inbound.message_sid.clone()),
        Utc::now(),
    );
    if let Err(append_error) = state.conversations.append_message(&inbound_message).await {
        // Still answer the customer even when the log write fails.
        warn!(
            event_name = "sms.webhook.inbound_persist_failed",
            conversation_id = %thread.id.0,
            error = %append_error,
            "inbound message was not persisted"
        );
    }

    let stored = state.conversations.list_messages(&thread.id).await?;
    let history: Vec<Message> =
        stored.iter().filter(|message| message.id != inbound_message.id).cloned().collect();

    if let Err(touch_error) = state
        .conversations
        .touch_activity(&thread.id, stored.len() as i64, Utc::now())
        .await
    {
        warn!(
            event_name = "sms.webhook.activity_touch_failed",
            conversation_id = %thread.id.0,
            error = %touch_error,
            "conversation activity counters were not updated"
        );
    }

    let outcome = state
        .turn_handler
        .handle_turn(TurnRequest {
            tenant_id: state.tenant_id.clone(),
            customer_phone: inbound.customer_phone.clone(),
            body: inbound.body.clone(),
            history,
            conversation_id: Some(thread.id.clone()),
            current_state: Some(thread.state),
        })
        .await;

    info!(
        event_name = "sms.webhook.turn_completed",
        conversation_id = %thread.id.0,
        tools_invoked = outcome.tools_invoked.len(),
        new_state = outcome.new_state.map(|s| s.as_str()).unwrap_or("unchanged"),
        "reply generated"
    );

    let outbound_message = Message::outbound(thread.id.clone(), outcome.reply.clone(), Utc::now());
    if let Err(append_error) = state.conversations.append_message(&outbound_message).await {
        warn!(
            event_name = "sms.webhook.outbound_persist_failed",
            conversation_id = %thread.id.0,
            error = %append_error,
            "outbound message was not persisted"
        );
    }

    Ok(outcome.reply)
}

async fn find_or_open_thread(
    state: &WebhookState,
    inbound: &InboundSms,
) -> Result<ConversationThread, InboundError> {
    if let Some(thread) = state
        .conversations
        .find_open(&state.tenant_id, &inbound.customer_phone)
        .await?
    {
        return Ok(thread);
    }

    let thread =
        ConversationThread::open(state.tenant_id.clone(), &inbound.customer_phone, Utc::now());
    state.conversations.insert(&thread).await?;
    info!(
        event_name = "sms.webhook.conversation_opened",
        conversation_id = %thread.id.0,
        tenant_id = %state.tenant_id.0,
        "new conversation thread opened"
    );
    Ok(thread)
}

pub async fn delivery_status(
    State(state): State<WebhookState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    match parse_status_form(&fields) {
        Ok(update) => {
            if let Err(update_error) = state
                .conversations
                .update_delivery_status(
                    &update.message_sid,
                    update.status,
                    update.error_code.as_deref(),
                    update.error_message.as_deref(),
                )
                .await
            {
                warn!(
                    event_name = "sms.webhook.status_update_failed",
                    message_sid = %update.message_sid,
                    error = %update_error,
                    "delivery status was not persisted"
                );
            }
        }
        Err(parse_error) => {
            warn!(
                event_name = "sms.webhook.status_unusable",
                error = %parse_error,
                "ignoring unusable status callback"
            );
        }
    }

    (StatusCode::OK, "OK").into_response()
}

fn xml_response(reply: &str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        message_response_xml(reply),
    )
        .into_response()
}
