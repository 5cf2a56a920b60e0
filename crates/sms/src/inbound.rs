use std::collections::HashMap;

use washline_core::domain::conversation::TenantId;

use crate::SmsParseError;

/// One authenticated inbound SMS, reduced to the fields the conversation
/// pipeline consumes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundSms {
    pub tenant_id: TenantId,
    pub customer_phone: String,
    pub to_number: String,
    pub body: String,
    pub message_sid: String,
    pub media_urls: Vec<String>,
}

/// Normalize the provider's form fields (`From`, `To`, `Body`, `MessageSid`,
/// `NumMedia` + `MediaUrl{N}`). `Body` may legitimately be empty for
/// media-only messages; everything else named above is required.
pub fn parse_inbound_form(
    fields: &HashMap<String, String>,
    tenant_id: TenantId,
) -> Result<InboundSms, SmsParseError> {
    let customer_phone = required(fields, "From")?;
    let to_number = required(fields, "To")?;
    let message_sid = required(fields, "MessageSid")?;
    let body = fields.get("Body").cloned().unwrap_or_default();

    let media_count = match fields.get("NumMedia") {
        None => 0,
        Some(raw) => raw.trim().parse::<usize>().map_err(|_| SmsParseError::InvalidField {
            field: "NumMedia",
            value: raw.clone(),
        })?,
    };

    let mut media_urls = Vec::with_capacity(media_count);
    for index in 0..media_count {
        if let Some(url) = fields.get(&format!("MediaUrl{index}")) {
            media_urls.push(url.clone());
        }
    }

    Ok(InboundSms { tenant_id, customer_phone, to_number, body, message_sid, media_urls })
}

fn required(fields: &HashMap<String, String>, name: &'static str) -> Result<String, SmsParseError> {
    fields
        .get(name)
        .filter(|value| !value.trim().is_empty())
        .cloned()
        .ok_or(SmsParseError::MissingField(name))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use washline_core::domain::conversation::TenantId;

    use crate::SmsParseError;

    use super::parse_inbound_form;

    fn tenant() -> TenantId {
        TenantId("tenant-test".to_string())
    }

    fn base_fields() -> HashMap<String, String> {
        HashMap::from([
            ("From".to_string(), "+14165550100".to_string()),
            ("To".to_string(), "+14165550999".to_string()),
            ("Body".to_string(), "hi, need a pickup".to_string()),
            ("MessageSid".to_string(), "SM123".to_string()),
        ])
    }

    #[test]
    fn parses_a_plain_text_message() {
        let inbound = parse_inbound_form(&base_fields(), tenant()).expect("parse");
        assert_eq!(inbound.customer_phone, "+14165550100");
        assert_eq!(inbound.to_number, "+14165550999");
        assert_eq!(inbound.body, "hi, need a pickup");
        assert_eq!(inbound.message_sid, "SM123");
        assert!(inbound.media_urls.is_empty());
    }

    #[test]
    fn collects_media_urls_up_to_num_media() {
        let mut fields = base_fields();
        fields.insert("NumMedia".to_string(), "2".to_string());
        fields.insert("MediaUrl0".to_string(), "https://media.example/0".to_string());
        fields.insert("MediaUrl1".to_string(), "https://media.example/1".to_string());
        fields.insert("MediaUrl2".to_string(), "https://media.example/ignored".to_string());

        let inbound = parse_inbound_form(&fields, tenant()).expect("parse");
        assert_eq!(
            inbound.media_urls,
            vec!["https://media.example/0".to_string(), "https://media.example/1".to_string()]
        );
    }

    #[test]
    fn empty_body_is_allowed_missing_sender_is_not() {
        let mut fields = base_fields();
        fields.remove("Body");
        let inbound = parse_inbound_form(&fields, tenant()).expect("parse");
        assert_eq!(inbound.body, "");

        let mut fields = base_fields();
        fields.remove("From");
        assert_eq!(
            parse_inbound_form(&fields, tenant()),
            Err(SmsParseError::MissingField("From"))
        );
    }

    #[test]
    fn garbage_num_media_is_an_invalid_field() {
        let mut fields = base_fields();
        fields.insert("NumMedia".to_string(), "lots".to_string());
        assert!(matches!(
            parse_inbound_form(&fields, tenant()),
            Err(SmsParseError::InvalidField { field: "NumMedia", .. })
        ));
    }
}
