//! Normalized SMS transport boundary.
//!
//! The webhook provider delivers form-encoded payloads; this crate reduces
//! them to the two normalized events the rest of the system consumes (an
//! inbound message, a delivery-status update) and renders the XML reply
//! envelope the provider expects back. Signature verification happens before
//! payloads reach this layer.

pub mod inbound;
pub mod reply;
pub mod status;

pub use inbound::{parse_inbound_form, InboundSms};
pub use reply::{message_response_xml, TECHNICAL_DIFFICULTY_REPLY};
pub use status::{parse_status_form, DeliveryStatusUpdate};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SmsParseError {
    #[error("webhook payload is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("webhook payload field `{field}` is invalid: `{value}`")]
    InvalidField { field: &'static str, value: String },
    #[error("unrecognized delivery status `{0}`")]
    UnknownStatus(String),
}
