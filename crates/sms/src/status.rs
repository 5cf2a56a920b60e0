use std::collections::HashMap;

use washline_core::domain::conversation::DeliveryStatus;

use crate::SmsParseError;

/// A delivery-status callback for one previously sent message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryStatusUpdate {
    pub message_sid: String,
    pub status: DeliveryStatus,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

pub fn parse_status_form(
    fields: &HashMap<String, String>,
) -> Result<DeliveryStatusUpdate, SmsParseError> {
    let message_sid = fields
        .get("MessageSid")
        .filter(|value| !value.trim().is_empty())
        .cloned()
        .ok_or(SmsParseError::MissingField("MessageSid"))?;

    let raw_status = fields
        .get("MessageStatus")
        .filter(|value| !value.trim().is_empty())
        .ok_or(SmsParseError::MissingField("MessageStatus"))?;
    let status = DeliveryStatus::parse(raw_status)
        .ok_or_else(|| SmsParseError::UnknownStatus(raw_status.clone()))?;

    Ok(DeliveryStatusUpdate {
        message_sid,
        status,
        error_code: fields.get("ErrorCode").filter(|v| !v.is_empty()).cloned(),
        error_message: fields.get("ErrorMessage").filter(|v| !v.is_empty()).cloned(),
    })
}
