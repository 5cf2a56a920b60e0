use washline_core::config::{AppConfig, LoadOptions};

/// Render the effective configuration with secrets redacted. Values reflect
/// full precedence (overrides > env > file > default) as applied by the
/// loader.
pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let mut lines = vec!["effective config (precedence: env > file > default):".to_string()];

    lines.push(render_line("database.url", &config.database.url));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
    ));
    lines.push(render_line("database.timeout_secs", &config.database.timeout_secs.to_string()));

    lines.push(render_line(
        "sms.account_sid",
        config.sms.account_sid.as_deref().unwrap_or("<unset>"),
    ));
    lines.push(render_line(
        "sms.auth_token",
        if config.sms.auth_token.is_some() { "<redacted>" } else { "<unset>" },
    ));
    lines.push(render_line(
        "sms.from_number",
        config.sms.from_number.as_deref().unwrap_or("<unset>"),
    ));

    lines.push(render_line("llm.provider", &format!("{:?}", config.llm.provider)));
    lines.push(render_line("llm.model", &config.llm.model));
    lines.push(render_line("llm.base_url", &config.llm.resolved_base_url()));
    lines.push(render_line(
        "llm.api_key",
        if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" },
    ));
    lines.push(render_line("llm.timeout_secs", &config.llm.timeout_secs.to_string()));
    lines.push(render_line("llm.temperature", &config.llm.temperature.to_string()));
    lines.push(render_line("llm.max_tokens", &config.llm.max_tokens.to_string()));

    lines.push(render_line("server.bind_address", &config.server.bind_address));
    lines.push(render_line("server.port", &config.server.port.to_string()));
    lines.push(render_line(
        "server.health_check_port",
        &config.server.health_check_port.to_string(),
    ));

    lines.push(render_line("tenant.default_tenant_id", &config.tenant.default_tenant_id));
    lines.push(render_line("logging.level", &config.logging.level));
    lines.push(render_line("logging.format", &format!("{:?}", config.logging.format)));

    lines.join("\n")
}

fn render_line(key: &str, value: &str) -> String {
    format!("- {key} = {value}")
}
