use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono_tz::Tz;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ORDER_API_BASE_URL: &str = "https://api.centralcart.com.br/v1/app";
pub const DEFAULT_LINK_BASE_URL: &str = crate::presenter::DEFAULT_LINK_BASE_URL;
pub const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";
pub const CONFIG_FILE_NAME: &str = "orderdesk.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub order_api: OrderApiConfig,
    pub display: DisplayConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub app_token: SecretString,
    pub bot_token: SecretString,
}

#[derive(Clone, Debug)]
pub struct OrderApiConfig {
    pub base_url: String,
    pub api_token: SecretString,
    pub timeout_secs: u64,
    pub link_base_url: String,
}

#[derive(Clone, Debug)]
pub struct DisplayConfig {
    pub timezone: String,
}

impl DisplayConfig {
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone.trim().parse::<Tz>().map_err(|_| {
            ConfigError::Validation(format!(
                "display.timezone `{}` is not a valid IANA timezone (e.g. {DEFAULT_TIMEZONE})",
                self.timezone
            ))
        })
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Which sections must be valid. Operator commands that only talk to the
/// order API do not need chat credentials.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValidationScope {
    #[default]
    Full,
    OrderApiOnly,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub slack_app_token: Option<String>,
    pub slack_bot_token: Option<String>,
    pub order_api_base_url: Option<String>,
    pub order_api_token: Option<String>,
    pub link_base_url: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub scope: ValidationScope,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig { app_token: String::new().into(), bot_token: String::new().into() },
            order_api: OrderApiConfig {
                base_url: DEFAULT_ORDER_API_BASE_URL.to_string(),
                api_token: String::new().into(),
                timeout_secs: 15,
                link_base_url: DEFAULT_LINK_BASE_URL.to_string(),
            },
            display: DisplayConfig { timezone: DEFAULT_TIMEZONE.to_string() },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate_scope(options.scope)?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(SlackPatch { app_token, bot_token }) = patch.slack {
            set_secret(&mut self.slack.app_token, app_token);
            set_secret(&mut self.slack.bot_token, bot_token);
        }
        if let Some(OrderApiPatch { base_url, api_token, timeout_secs, link_base_url }) =
            patch.order_api
        {
            set(&mut self.order_api.base_url, base_url);
            set_secret(&mut self.order_api.api_token, api_token);
            set(&mut self.order_api.timeout_secs, timeout_secs);
            set(&mut self.order_api.link_base_url, link_base_url);
        }
        if let Some(DisplayPatch { timezone }) = patch.display {
            set(&mut self.display.timezone, timezone);
        }
        if let Some(ServerPatch { bind_address, health_check_port, graceful_shutdown_secs }) =
            patch.server
        {
            set(&mut self.server.bind_address, bind_address);
            set(&mut self.server.health_check_port, health_check_port);
            set(&mut self.server.graceful_shutdown_secs, graceful_shutdown_secs);
        }
        if let Some(LoggingPatch { level, format }) = patch.logging {
            set(&mut self.logging.level, level);
            set(&mut self.logging.format, format);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        set_secret(&mut self.slack.app_token, env_value(&["ORDERDESK_SLACK_APP_TOKEN"])?);
        set_secret(&mut self.slack.bot_token, env_value(&["ORDERDESK_SLACK_BOT_TOKEN"])?);

        set(&mut self.order_api.base_url, env_value(&["ORDERDESK_ORDER_API_BASE_URL"])?);
        set_secret(&mut self.order_api.api_token, env_value(&["ORDERDESK_ORDER_API_TOKEN"])?);
        set(&mut self.order_api.timeout_secs, env_value(&["ORDERDESK_ORDER_API_TIMEOUT_SECS"])?);
        set(
            &mut self.order_api.link_base_url,
            env_value(&["ORDERDESK_ORDER_API_LINK_BASE_URL"])?,
        );
        set(&mut self.display.timezone, env_value(&["ORDERDESK_DISPLAY_TIMEZONE"])?);

        set(&mut self.server.bind_address, env_value(&["ORDERDESK_SERVER_BIND_ADDRESS"])?);
        set(
            &mut self.server.health_check_port,
            env_value(&["ORDERDESK_SERVER_HEALTH_CHECK_PORT"])?,
        );
        set(
            &mut self.server.graceful_shutdown_secs,
            env_value(&["ORDERDESK_SERVER_GRACEFUL_SHUTDOWN_SECS"])?,
        );

        set(
            &mut self.logging.level,
            env_value(&["ORDERDESK_LOGGING_LEVEL", "ORDERDESK_LOG_LEVEL"])?,
        );
        set(
            &mut self.logging.format,
            env_value(&["ORDERDESK_LOGGING_FORMAT", "ORDERDESK_LOG_FORMAT"])?,
        );
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        let ConfigOverrides {
            log_level,
            slack_app_token,
            slack_bot_token,
            order_api_base_url,
            order_api_token,
            link_base_url,
            timezone,
        } = overrides;

        set(&mut self.logging.level, log_level);
        set_secret(&mut self.slack.app_token, slack_app_token);
        set_secret(&mut self.slack.bot_token, slack_bot_token);
        set(&mut self.order_api.base_url, order_api_base_url);
        set_secret(&mut self.order_api.api_token, order_api_token);
        set(&mut self.order_api.link_base_url, link_base_url);
        set(&mut self.display.timezone, timezone);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_scope(ValidationScope::Full)
    }

    pub fn validate_scope(&self, scope: ValidationScope) -> Result<(), ConfigError> {
        if scope == ValidationScope::Full {
            check_slack_token(&SLACK_APP_TOKEN, self.slack.app_token.expose_secret())?;
            check_slack_token(&SLACK_BOT_TOKEN, self.slack.bot_token.expose_secret())?;
            require(
                self.server.health_check_port > 0,
                "server.health_check_port must be greater than zero",
            )?;
            require(
                self.server.graceful_shutdown_secs > 0,
                "server.graceful_shutdown_secs must be greater than zero",
            )?;
        }
        validate_order_api(&self.order_api)?;
        self.display.tz()?;
        require(
            matches!(
                self.logging.level.trim().to_ascii_lowercase().as_str(),
                "trace" | "debug" | "info" | "warn" | "error"
            ),
            "logging.level must be one of trace|debug|info|warn|error",
        )
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn set_secret(target: &mut SecretString, value: Option<String>) {
    if let Some(value) = value {
        *target = value.into();
    }
}

fn require(condition: bool, message: &str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::Validation(message.to_owned()))
    }
}

/// First non-blank value among `keys`, parsed. Later keys are aliases.
fn env_value<T: FromStr>(keys: &[&str]) -> Result<Option<T>, ConfigError> {
    let found = keys.iter().find_map(|key| {
        env::var(key).ok().filter(|value| !value.trim().is_empty()).map(|value| (*key, value))
    });
    let Some((key, value)) = found else {
        return Ok(None);
    };

    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_owned(), value })
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(CONFIG_FILE_NAME), PathBuf::from("config").join(CONFIG_FILE_NAME)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Replaces every `${VAR}` with the variable's value.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let end = tail.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &tail[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_owned() })?;
        output.push_str(&value);
        rest = &tail[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

struct SlackTokenRule {
    key: &'static str,
    prefix: &'static str,
    /// Prefix of the other Slack token, which is the usual mix-up.
    swapped_prefix: &'static str,
    swapped_name: &'static str,
    location: &'static str,
}

const SLACK_APP_TOKEN: SlackTokenRule = SlackTokenRule {
    key: "slack.app_token",
    prefix: "xapp-",
    swapped_prefix: "xoxb-",
    swapped_name: "bot token",
    location: "Basic Information > App-Level Tokens",
};

const SLACK_BOT_TOKEN: SlackTokenRule = SlackTokenRule {
    key: "slack.bot_token",
    prefix: "xoxb-",
    swapped_prefix: "xapp-",
    swapped_name: "app token",
    location: "OAuth & Permissions > Bot User OAuth Token",
};

fn check_slack_token(rule: &SlackTokenRule, token: &str) -> Result<(), ConfigError> {
    if token.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{} is required. Get it from https://api.slack.com/apps > Your App > {}",
            rule.key, rule.location
        )));
    }
    if !token.starts_with(rule.prefix) {
        let hint = if token.starts_with(rule.swapped_prefix) {
            format!(" (hint: this looks like the {})", rule.swapped_name)
        } else {
            String::new()
        };
        return Err(ConfigError::Validation(format!(
            "{} must start with `{}`{hint}",
            rule.key, rule.prefix
        )));
    }
    Ok(())
}

fn validate_order_api(order_api: &OrderApiConfig) -> Result<(), ConfigError> {
    require(
        !order_api.api_token.expose_secret().trim().is_empty(),
        "order_api.api_token is required (set ORDERDESK_ORDER_API_TOKEN or [order_api] api_token)",
    )?;

    for (key, url) in [
        ("order_api.base_url", &order_api.base_url),
        ("order_api.link_base_url", &order_api.link_base_url),
    ] {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "{key} must start with http:// or https://"
            )));
        }
    }

    require(
        (1..=120).contains(&order_api.timeout_secs),
        "order_api.timeout_secs must be in range 1..=120",
    )
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    slack: Option<SlackPatch>,
    order_api: Option<OrderApiPatch>,
    display: Option<DisplayPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    app_token: Option<String>,
    bot_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OrderApiPatch {
    base_url: Option<String>,
    api_token: Option<String>,
    timeout_secs: Option<u64>,
    link_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DisplayPatch {
    timezone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
