use orderdesk_core::config::{AppConfig, LoadOptions};
use orderdesk_core::{HttpOrderApiClient, OrderPresenter};
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::commands::{to_json, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report(AppConfig::load(LoadOptions::default()));
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output { to_json("doctor", &report, true) } else { render_human(&report) };

    CommandResult::new(exit_code, output)
}

fn build_report(loaded: Result<AppConfig, orderdesk_core::ConfigError>) -> DoctorReport {
    let mut checks = Vec::new();

    match loaded {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_slack_tokens(&config));
            checks.push(check_order_api(&config));
            checks.push(check_display(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["slack_token_readiness", "order_api_settings", "display_settings"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_slack_tokens(config: &AppConfig) -> DoctorCheck {
    let app_token = config.slack.app_token.expose_secret();
    let bot_token = config.slack.bot_token.expose_secret();
    let ready = app_token.starts_with("xapp-") && bot_token.starts_with("xoxb-");

    DoctorCheck {
        name: "slack_token_readiness",
        status: if ready { CheckStatus::Pass } else { CheckStatus::Fail },
        details: if ready {
            "app token (xapp-) and bot token (xoxb-) are present".to_string()
        } else {
            "slack tokens are missing or have the wrong prefix".to_string()
        },
    }
}

fn check_order_api(config: &AppConfig) -> DoctorCheck {
    match HttpOrderApiClient::from_config(&config.order_api) {
        Ok(client) => DoctorCheck {
            name: "order_api_settings",
            status: CheckStatus::Pass,
            details: format!(
                "client ready for `{}` (timeout {}s, links under `{}`)",
                client.base_url(),
                config.order_api.timeout_secs,
                config.order_api.link_base_url
            ),
        },
        Err(error) => DoctorCheck {
            name: "order_api_settings",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_display(config: &AppConfig) -> DoctorCheck {
    match OrderPresenter::from_config(config) {
        Ok(_) => DoctorCheck {
            name: "display_settings",
            status: CheckStatus::Pass,
            details: format!("purchase dates rendered in `{}`", config.display.timezone),
        },
        Err(error) => DoctorCheck {
            name: "display_settings",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
