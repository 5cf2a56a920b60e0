/// Fixed copy for webhook-level failures, when not even the engine's own
/// fallback path could run.
pub const TECHNICAL_DIFFICULTY_REPLY: &str =
    "Sorry, we're experiencing technical difficulties. Please try again later or call us directly.";

/// Wrap a reply body in the provider's XML response envelope. The provider
/// sends whatever is inside `<Message>` back to the customer.
pub fn message_response_xml(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n  <Message>{}</Message>\n</Response>",
        escape_xml(body)
    )
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for character in raw.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
