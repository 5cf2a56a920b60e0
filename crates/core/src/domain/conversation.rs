use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub Uuid);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

/// Where a conversation currently sits in the booking flow.
///
/// `Faq` is orthogonal: a thread can park there while a question is answered
/// and resume the flow afterwards. Unrecognized persisted values decode to
/// `Greeting` so a bad row never fails a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Greeting,
    CollectingAddress,
    SelectingService,
    SelectingTime,
    ConfirmingBooking,
    Completed,
    Faq,
}

impl ConversationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::CollectingAddress => "collecting_address",
            Self::SelectingService => "selecting_service",
            Self::SelectingTime => "selecting_time",
            Self::ConfirmingBooking => "confirming_booking",
            Self::Completed => "completed",
            Self::Faq => "faq",
        }
    }

    /// Forgiving decode for persisted values: anything unrecognized (including
    /// legacy values and empty strings) falls back to the initial state.
    pub fn parse_or_initial(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "collecting_address" => Self::CollectingAddress,
            "selecting_service" => Self::SelectingService,
            "selecting_time" => Self::SelectingTime,
            "confirming_booking" => Self::ConfirmingBooking,
            "completed" => Self::Completed,
            "faq" => Self::Faq,
            _ => Self::Greeting,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::Greeting
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    Closed,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }

    pub fn parse_or_active(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "closed" => Self::Closed,
            _ => Self::Active,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingOutcome {
    NotApplicable,
    Booked,
}

impl BookingOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotApplicable => "not_applicable",
            Self::Booked => "booked",
        }
    }

    pub fn parse_or_not_applicable(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "booked" => Self::Booked,
            _ => Self::NotApplicable,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

/// Delivery lifecycle of one SMS, using the transport provider's vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Received,
    Queued,
    Sending,
    Sent,
    Delivered,
    Failed,
    Undelivered,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Queued => "queued",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Undelivered => "undelivered",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "received" => Some(Self::Received),
            "queued" => Some(Self::Queued),
            "sending" => Some(Self::Sending),
            "sent" => Some(Self::Sent),
            "delivered" => Some(Self::Delivered),
            "failed" => Some(Self::Failed),
            "undelivered" => Some(Self::Undelivered),
            _ => None,
        }
    }
}

/// One SMS exchange between a tenant and a customer phone number.
///
/// Threads are closed with a status flag, never deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationThread {
    pub id: ConversationId,
    pub tenant_id: TenantId,
    pub customer_phone: String,
    pub status: ConversationStatus,
    pub state: ConversationState,
    pub booking_outcome: BookingOutcome,
    pub message_count: i64,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ConversationThread {
    /// A fresh thread for the first inbound message from a phone number.
    pub fn open(tenant_id: TenantId, customer_phone: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: ConversationId(Uuid::new_v4()),
            tenant_id,
            customer_phone: customer_phone.into(),
            status: ConversationStatus::Active,
            state: ConversationState::Greeting,
            booking_outcome: BookingOutcome::NotApplicable,
            message_count: 0,
            last_message_at: now,
            created_at: now,
        }
    }
}

/// One inbound or outbound unit of text in a thread. Immutable after insert
/// except for the delivery status fields, which transport callbacks patch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub direction: Direction,
    pub body: String,
    pub media_urls: Vec<String>,
    pub status: DeliveryStatus,
    pub provider_sid: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn inbound(
        conversation_id: ConversationId,
        body: impl Into<String>,
        media_urls: Vec<String>,
        provider_sid: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId(Uuid::new_v4()),
            conversation_id,
            direction: Direction::Inbound,
            body: body.into(),
            media_urls,
            status: DeliveryStatus::Received,
            provider_sid,
            error_code: None,
            error_message: None,
            created_at: now,
        }
    }

    pub fn outbound(conversation_id: ConversationId, body: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: MessageId(Uuid::new_v4()),
            conversation_id,
            direction: Direction::Outbound,
            body: body.into(),
            media_urls: Vec::new(),
            status: DeliveryStatus::Sending,
            provider_sid: None,
            error_code: None,
            error_message: None,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BookingOutcome, ConversationState, ConversationStatus, DeliveryStatus};

    #[test]
    fn state_round_trips_through_str() {
        for state in [
            ConversationState::Greeting,
            ConversationState::CollectingAddress,
            ConversationState::SelectingService,
            ConversationState::SelectingTime,
            ConversationState::ConfirmingBooking,
            ConversationState::Completed,
            ConversationState::Faq,
        ] {
            assert_eq!(ConversationState::parse_or_initial(state.as_str()), state);
        }
    }

    #[test]
    fn unknown_state_decodes_to_greeting() {
        assert_eq!(ConversationState::parse_or_initial("initiated"), ConversationState::Greeting);
        assert_eq!(ConversationState::parse_or_initial(""), ConversationState::Greeting);
        assert_eq!(ConversationState::parse_or_initial("  COMPLETED "), ConversationState::Completed);
    }

    #[test]
    fn status_and_outcome_decode_are_forgiving() {
        assert_eq!(ConversationStatus::parse_or_active("closed"), ConversationStatus::Closed);
        assert_eq!(ConversationStatus::parse_or_active("archived"), ConversationStatus::Active);
        assert_eq!(BookingOutcome::parse_or_not_applicable("booked"), BookingOutcome::Booked);
        assert_eq!(
            BookingOutcome::parse_or_not_applicable("lost"),
            BookingOutcome::NotApplicable
        );
    }

    #[test]
    fn delivery_status_parses_provider_vocabulary() {
        assert_eq!(DeliveryStatus::parse("delivered"), Some(DeliveryStatus::Delivered));
        assert_eq!(DeliveryStatus::parse("UNDELIVERED"), Some(DeliveryStatus::Undelivered));
        assert_eq!(DeliveryStatus::parse("read"), None);
    }
}
