use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use orderdesk_core::config::{AppConfig, LoadOptions, CONFIG_FILE_NAME};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => render(&config),
        Err(error) => format!("config validation failed: {error}"),
    }
}

/// Renders every effective key with its value and where it came from.
pub fn render(config: &AppConfig) -> String {
    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let entries: [(&str, String, &[&str]); 11] = [
        (
            "slack.app_token",
            redact_token(config.slack.app_token.expose_secret()),
            &["ORDERDESK_SLACK_APP_TOKEN"],
        ),
        (
            "slack.bot_token",
            redact_token(config.slack.bot_token.expose_secret()),
            &["ORDERDESK_SLACK_BOT_TOKEN"],
        ),
        (
            "order_api.base_url",
            config.order_api.base_url.clone(),
            &["ORDERDESK_ORDER_API_BASE_URL"],
        ),
        (
            "order_api.api_token",
            redact_secret(config.order_api.api_token.expose_secret()),
            &["ORDERDESK_ORDER_API_TOKEN"],
        ),
        (
            "order_api.timeout_secs",
            config.order_api.timeout_secs.to_string(),
            &["ORDERDESK_ORDER_API_TIMEOUT_SECS"],
        ),
        (
            "order_api.link_base_url",
            config.order_api.link_base_url.clone(),
            &["ORDERDESK_ORDER_API_LINK_BASE_URL"],
        ),
        ("display.timezone", config.display.timezone.clone(), &["ORDERDESK_DISPLAY_TIMEZONE"]),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            &["ORDERDESK_SERVER_BIND_ADDRESS"],
        ),
        (
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            &["ORDERDESK_SERVER_HEALTH_CHECK_PORT"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["ORDERDESK_LOGGING_LEVEL", "ORDERDESK_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["ORDERDESK_LOGGING_FORMAT", "ORDERDESK_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in entries {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(CONFIG_FILE_NAME), PathBuf::from("config").join(CONFIG_FILE_NAME)]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the Slack token family prefix (`xapp`, `xoxb`) visible.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

fn redact_secret(secret: &str) -> String {
    if secret.trim().is_empty() {
        "<empty>".to_string()
    } else {
        "<redacted>".to_string()
    }
}
