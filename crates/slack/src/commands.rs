use std::sync::Arc;

use orderdesk_core::{OrderApi, QueryInput, WorkflowController};
use thiserror::Error;
use tracing::info;

use crate::blocks::{self, MessageTemplate, ModalTemplate};

pub const ORDER_COMMAND: &str = "/pedido";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_id: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEnvelope {
    pub verb: String,
    pub argument: Option<String>,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_id: String,
    pub request_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderCommand {
    ByEmail { email: String },
    ByExternalId { external_id: String },
    Verify { order_id: String },
    Panel,
    Search,
    Help,
    Unknown { verb: String },
}

/// What a command asks the chat surface to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandReply {
    Message(MessageTemplate),
    Modal(ModalTemplate),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
}

pub fn normalize_order_command(
    payload: SlashCommandPayload,
) -> Result<CommandEnvelope, CommandParseError> {
    if payload.command != ORDER_COMMAND {
        return Err(CommandParseError::UnsupportedCommand(payload.command));
    }

    let text = payload.text.trim();
    let (verb, argument) = match text.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, Some(rest.trim()).filter(|rest| !rest.is_empty())),
        None => (text, None),
    };
    let verb = if verb.is_empty() { "ajuda".to_owned() } else { verb.to_lowercase() };

    Ok(CommandEnvelope {
        verb,
        argument: argument.map(str::to_owned),
        channel_id: payload.channel_id,
        user_id: payload.user_id,
        trigger_id: payload.trigger_id,
        request_id: payload.request_id,
    })
}

pub struct CommandRouter<A> {
    controller: Arc<WorkflowController<A>>,
}

impl<A> CommandRouter<A>
where
    A: OrderApi,
{
    pub fn new(controller: Arc<WorkflowController<A>>) -> Self {
        Self { controller }
    }

    pub async fn route(&self, envelope: CommandEnvelope) -> CommandReply {
        let argument = envelope.argument.clone().unwrap_or_default();
        let command = classify_order_command(&envelope.verb, argument);
        info!(
            event_name = "ingress.slack.command_routed",
            correlation_id = %envelope.request_id,
            verb = %envelope.verb,
            "routing /pedido command"
        );

        match command {
            OrderCommand::ByEmail { email } => {
                self.lookup(QueryInput { email: Some(email), external_id: None }).await
            }
            OrderCommand::ByExternalId { external_id } => {
                self.lookup(QueryInput { email: None, external_id: Some(external_id) }).await
            }
            OrderCommand::Verify { order_id } => {
                let run = self.controller.verify(&order_id).await;
                CommandReply::Message(run_message(run.report.as_ref(), &run.correlation_id()))
            }
            OrderCommand::Panel => CommandReply::Message(blocks::panel_message()),
            OrderCommand::Search => CommandReply::Modal(blocks::lookup_modal()),
            OrderCommand::Help => CommandReply::Message(blocks::help_message()),
            OrderCommand::Unknown { verb } => CommandReply::Message(blocks::error_message(
                &format!("Comando desconhecido `/pedido {verb}`. Use `/pedido ajuda`."),
                &envelope.request_id,
            )),
        }
    }

    async fn lookup(&self, input: QueryInput) -> CommandReply {
        let run = self.controller.run_query(input).await;
        CommandReply::Message(run_message(run.report.as_ref(), &run.correlation_id()))
    }
}

pub(crate) fn run_message(
    report: Option<&orderdesk_core::WorkflowReport>,
    correlation_id: &str,
) -> MessageTemplate {
    match report {
        Some(report) => blocks::report_message(report),
        None => blocks::error_message("A busca não produziu resposta.", correlation_id),
    }
}

fn classify_order_command(verb: &str, argument: String) -> OrderCommand {
    match verb {
        "email" => OrderCommand::ByEmail { email: argument },
        "usuario" | "usuário" | "user" => OrderCommand::ByExternalId { external_id: argument },
        "verificar" | "pedido" => OrderCommand::Verify { order_id: argument },
        "painel" => OrderCommand::Panel,
        "buscar" => OrderCommand::Search,
        "ajuda" | "help" => OrderCommand::Help,
        _ => OrderCommand::Unknown { verb: verb.to_owned() },
    }
}
