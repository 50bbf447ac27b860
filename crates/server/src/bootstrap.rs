use std::sync::Arc;

use orderdesk_core::config::{AppConfig, ConfigError};
use orderdesk_core::{ClientBuildError, HttpOrderApiClient, OrderPresenter, WorkflowController};
use orderdesk_slack::{events::lookup_dispatcher, socket::SocketModeRunner};
use thiserror::Error;
use tracing::info;

pub type LookupController = WorkflowController<HttpOrderApiClient>;

pub struct Application {
    pub config: AppConfig,
    pub controller: Arc<LookupController>,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("order API client setup failed: {0}")]
    OrderApi(#[from] ClientBuildError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let api = HttpOrderApiClient::from_config(&config.order_api)?;
    info!(
        event_name = "system.bootstrap.order_api_ready",
        correlation_id = "bootstrap",
        base_url = %api.base_url(),
        timeout_secs = config.order_api.timeout_secs,
        "order API client configured"
    );

    let presenter = OrderPresenter::from_config(&config)?;
    let controller = Arc::new(WorkflowController::new(api, presenter));
    let slack_runner = SocketModeRunner::noop(lookup_dispatcher(controller.clone()));
    info!(
        event_name = "system.bootstrap.dispatcher_ready",
        correlation_id = "bootstrap",
        handlers = slack_runner.handler_count(),
        "slack dispatcher wired to the lookup workflow"
    );

    Ok(Application { config, controller, slack_runner })
}

#[cfg(test)]
mod tests {
    use orderdesk_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use crate::bootstrap::{bootstrap_with_config, Application, BootstrapError};

    fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        bootstrap_with_config(AppConfig::load(options)?)
    }

    fn overrides() -> ConfigOverrides {
        ConfigOverrides {
            slack_app_token: Some("xapp-test".to_string()),
            slack_bot_token: Some("xoxb-test".to_string()),
            order_api_token: Some("api-token".to_string()),
            order_api_base_url: Some("http://127.0.0.1:9/v1/app".to_string()),
            ..ConfigOverrides::default()
        }
    }

    #[test]
    fn bootstrap_fails_fast_without_required_slack_tokens() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                slack_app_token: Some("invalid-token".to_string()),
                ..overrides()
            },
            ..LoadOptions::default()
        });

        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.app_token"));
    }

    #[test]
    fn bootstrap_rejects_an_unknown_timezone() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                timezone: Some("Mars/Olympus".to_string()),
                ..overrides()
            },
            ..LoadOptions::default()
        });

        assert!(matches!(result, Err(BootstrapError::Config(_))));
    }

    #[test]
    fn bootstrap_wires_the_lookup_dispatcher() {
        let app = bootstrap(LoadOptions { overrides: overrides(), ..LoadOptions::default() })
            .expect("bootstrap should succeed with valid overrides");

        assert!(app.slack_runner.is_noop_transport());
        assert_eq!(app.slack_runner.handler_count(), 3);
        assert_eq!(app.controller.api().base_url().as_str(), "http://127.0.0.1:9/v1/app");
        assert_eq!(app.controller.presenter().link_base_url(), "https://centralcart.com.br/");
    }
}
