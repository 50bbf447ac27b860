use orderdesk_core::config::{AppConfig, LoadOptions, ValidationScope};
use orderdesk_core::{
    HttpOrderApiClient, OrderApi, OrderLink, OrderPresenter, QueryInput, WorkflowController,
    WorkflowReport, WorkflowRun, WorkflowState,
};
use serde::Serialize;
use uuid::Uuid;

use crate::commands::{to_json, CommandResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupTarget {
    Email(String),
    User(String),
    Order(String),
}

#[derive(Debug, Serialize)]
struct LookupOutput<'a> {
    command: &'static str,
    status: &'static str,
    run_id: Uuid,
    state: WorkflowState,
    outcome: Option<&'static str>,
    report: Option<&'a WorkflowReport>,
}

/// Loads the order API settings (Slack tokens are not needed here), runs one
/// workflow and renders its report.
pub fn run(target: LookupTarget, json_output: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions {
        scope: ValidationScope::OrderApiOnly,
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "lookup",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let api = match HttpOrderApiClient::from_config(&config.order_api) {
        Ok(api) => api,
        Err(error) => {
            return CommandResult::failure("lookup", "order_api_client", error.to_string(), 4);
        }
    };
    let presenter = match OrderPresenter::from_config(&config) {
        Ok(presenter) => presenter,
        Err(error) => {
            return CommandResult::failure(
                "lookup",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "lookup",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let controller = WorkflowController::new(api, presenter);
    let run = runtime.block_on(execute(&controller, target));
    render(&run, json_output)
}

pub async fn execute<A>(controller: &WorkflowController<A>, target: LookupTarget) -> WorkflowRun
where
    A: OrderApi,
{
    match target {
        LookupTarget::Email(email) => controller.run_query(QueryInput::email(email)).await,
        LookupTarget::User(user) => controller.run_query(QueryInput::external_id(user)).await,
        LookupTarget::Order(order_id) => controller.verify(&order_id).await,
    }
}

pub fn render(run: &WorkflowRun, json_output: bool) -> CommandResult {
    let exit_code = exit_code_for(run.report.as_ref());

    let output = if json_output {
        let payload = LookupOutput {
            command: "lookup",
            status: if exit_code == 0 { "ok" } else { "error" },
            run_id: run.id,
            state: run.state,
            outcome: run.report.as_ref().map(WorkflowReport::outcome),
            report: run.report.as_ref(),
        };
        to_json("lookup", &payload, true)
    } else {
        render_human(run)
    };

    CommandResult::new(exit_code, output)
}

fn exit_code_for(report: Option<&WorkflowReport>) -> u8 {
    match report {
        Some(WorkflowReport::Order { .. })
        | Some(WorkflowReport::Candidates(_))
        | Some(WorkflowReport::NoResults { .. }) => 0,
        Some(WorkflowReport::InvalidInput { .. }) => 2,
        Some(WorkflowReport::Failed { .. }) => 5,
        Some(WorkflowReport::DisplayFailed { .. }) => 6,
        None => 7,
    }
}

fn render_human(run: &WorkflowRun) -> String {
    let mut lines = Vec::new();

    match &run.report {
        Some(WorkflowReport::Order { display, link }) => {
            lines.push(display.title.clone());
            lines.push(String::new());
            lines.push(display.description.clone());
            lines.push(String::new());
            lines.push(display.footer.clone());
            if let OrderLink::Available { url, .. } = link {
                lines.push(format!("Link: {url}"));
            }
        }
        Some(WorkflowReport::Candidates(list)) => {
            lines.push(list.summary.title.clone());
            lines.push(list.summary.description.clone());
            for candidate in &list.candidates {
                let key = candidate.key.as_deref().unwrap_or("-");
                lines.push(format!("- {} [{key}] {}", candidate.label, candidate.description));
            }
            lines.push("Use `orderdesk lookup --order <id>` to see one of them.".to_string());
        }
        Some(report) => lines.push(report.message().unwrap_or_default().to_string()),
        None => lines.push("lookup produced no report".to_string()),
    }

    lines.push(format!("(run {})", run.id));
    lines.join("\n")
}
