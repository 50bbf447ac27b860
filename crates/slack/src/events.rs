use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use orderdesk_core::{
    order_link, OrderApi, OrderId, QueryInput, WorkflowController, WorkflowEvent, WorkflowRun,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    blocks::{
        self, MessageTemplate, ModalTemplate, CANDIDATE_SELECT_ACTION, LOOKUP_EMAIL_INPUT,
        LOOKUP_EXTERNAL_ID_INPUT, LOOKUP_MODAL_CALLBACK, OPEN_LOOKUP_ACTION, ORDER_LINK_ACTION,
        ORDER_LINK_UNAVAILABLE_ACTION,
    },
    commands::{
        normalize_order_command, run_message, CommandParseError, CommandReply, CommandRouter,
        SlashCommandPayload,
    },
};

const STALE_SELECTION: &str = "Esta seleção não está mais disponível. Inicie uma nova busca.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlackEnvelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    SlashCommand(SlashCommandPayload),
    BlockAction(BlockActionEvent),
    ViewSubmission(ViewSubmissionEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::SlashCommand(_) => SlackEventType::SlashCommand,
            Self::BlockAction(_) => SlackEventType::BlockAction,
            Self::ViewSubmission(_) => SlackEventType::ViewSubmission,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    SlashCommand,
    BlockAction,
    ViewSubmission,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockActionEvent {
    pub channel_id: String,
    pub message_ts: String,
    pub user_id: String,
    pub trigger_id: String,
    pub action_id: String,
    pub block_id: String,
    /// Button value, or the selected option value of a select.
    pub value: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewSubmissionEvent {
    pub view_id: String,
    pub callback_id: String,
    pub user_id: String,
    /// Submitted input values keyed by action id.
    pub values: BTreeMap<String, String>,
}

impl ViewSubmissionEvent {
    pub fn value(&self, action_id: &str) -> Option<&str> {
        self.values.get(action_id).map(String::as_str)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(MessageTemplate),
    OpenModal { trigger_id: String, modal: ModalTemplate },
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Parse(#[from] CommandParseError),
    #[error("block action `{action_id}` is missing its value")]
    MissingActionValue { action_id: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher wired for the order lookup workflow: `/pedido` commands,
/// panel and result interactions, and lookup modal submissions.
pub fn lookup_dispatcher<A>(controller: Arc<WorkflowController<A>>) -> EventDispatcher
where
    A: OrderApi + 'static,
{
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(controller.clone()));
    dispatcher.register(BlockActionHandler::new(controller.clone()));
    dispatcher.register(ViewSubmissionHandler::new(controller));
    dispatcher
}

pub struct SlashCommandHandler<A> {
    router: CommandRouter<A>,
}

impl<A> SlashCommandHandler<A>
where
    A: OrderApi,
{
    pub fn new(controller: Arc<WorkflowController<A>>) -> Self {
        Self { router: CommandRouter::new(controller) }
    }
}

#[async_trait]
impl<A> EventHandler for SlashCommandHandler<A>
where
    A: OrderApi + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let normalized = normalize_order_command(payload.clone())?;
        let trigger_id = normalized.trigger_id.clone();
        Ok(match self.router.route(normalized).await {
            CommandReply::Message(message) => HandlerResult::Responded(message),
            CommandReply::Modal(modal) => HandlerResult::OpenModal { trigger_id, modal },
        })
    }
}

pub struct BlockActionHandler<A> {
    controller: Arc<WorkflowController<A>>,
}

impl<A> BlockActionHandler<A>
where
    A: OrderApi,
{
    pub fn new(controller: Arc<WorkflowController<A>>) -> Self {
        Self { controller }
    }

    async fn select_candidate(
        &self,
        event: &BlockActionEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let value = required_value(event)?;
        let Some(run_id) = blocks::run_id_from_block_id(&event.block_id) else {
            warn!(
                event_name = "ingress.slack.selection_uncorrelated",
                correlation_id = %ctx.correlation_id,
                block_id = %event.block_id,
                "candidate selection does not carry a run id"
            );
            return Ok(HandlerResult::Responded(blocks::warning_message(STALE_SELECTION)));
        };

        let mut run = WorkflowRun::awaiting_selection(run_id);
        let report =
            self.controller.advance(&mut run, WorkflowEvent::SelectionMade(value.to_owned())).await;
        Ok(HandlerResult::Responded(blocks::report_message(&report)))
    }

    fn link_reply(&self, event: &BlockActionEvent) -> Result<HandlerResult, EventHandlerError> {
        let value = required_value(event)?;
        let presenter = self.controller.presenter();
        let link = order_link(presenter.link_base_url(), &OrderId::parse(value));
        Ok(match presenter.link_reply(&link) {
            Some(text) => HandlerResult::Responded(blocks::link_reply_message(&text)),
            None => HandlerResult::Processed,
        })
    }
}

#[async_trait]
impl<A> EventHandler for BlockActionHandler<A>
where
    A: OrderApi + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::BlockAction
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::BlockAction(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        info!(
            event_name = "ingress.slack.block_action",
            correlation_id = %ctx.correlation_id,
            action_id = %event.action_id,
            "handling block action"
        );

        match event.action_id.as_str() {
            OPEN_LOOKUP_ACTION => Ok(HandlerResult::OpenModal {
                trigger_id: event.trigger_id.clone(),
                modal: blocks::lookup_modal(),
            }),
            CANDIDATE_SELECT_ACTION => self.select_candidate(event, ctx).await,
            ORDER_LINK_ACTION => self.link_reply(event),
            ORDER_LINK_UNAVAILABLE_ACTION => Ok(HandlerResult::Processed),
            _ => Ok(HandlerResult::Ignored),
        }
    }
}

pub struct ViewSubmissionHandler<A> {
    controller: Arc<WorkflowController<A>>,
}

impl<A> ViewSubmissionHandler<A>
where
    A: OrderApi,
{
    pub fn new(controller: Arc<WorkflowController<A>>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl<A> EventHandler for ViewSubmissionHandler<A>
where
    A: OrderApi + 'static,
{
    fn event_type(&self) -> SlackEventType {
        SlackEventType::ViewSubmission
    }

    async fn handle(
        &self,
        envelope: &SlackEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::ViewSubmission(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if event.callback_id != LOOKUP_MODAL_CALLBACK {
            return Ok(HandlerResult::Ignored);
        }

        let input = QueryInput {
            email: event.value(LOOKUP_EMAIL_INPUT).map(str::to_owned),
            external_id: event.value(LOOKUP_EXTERNAL_ID_INPUT).map(str::to_owned),
        };
        let run = self.controller.run_query(input).await;
        Ok(HandlerResult::Responded(run_message(run.report.as_ref(), &run.correlation_id())))
    }
}

fn required_value(event: &BlockActionEvent) -> Result<&str, EventHandlerError> {
    event
        .value
        .as_deref()
        .ok_or_else(|| EventHandlerError::MissingActionValue { action_id: event.action_id.clone() })
}
