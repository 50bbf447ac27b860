use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::blocks::run_id_from_block_id;
use crate::events::{EventContext, EventDispatcher, HandlerResult, SlackEnvelope, SlackEvent};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport delivery failed: {0}")]
    Deliver(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Connection to the chat platform. Session handling and the wire protocol
/// live behind this trait.
#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    /// Posts a handler response (message or modal) for the envelope.
    async fn deliver(
        &self,
        envelope: &SlackEnvelope,
        result: &HandlerResult,
    ) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopSocketTransport;

#[async_trait]
impl SocketTransport for NoopSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        Ok(None)
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn deliver(
        &self,
        _envelope: &SlackEnvelope,
        _result: &HandlerResult,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// What happened to one envelope after it was acknowledged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvelopeOutcome {
    Delivered,
    /// The handler produced nothing to post back.
    Silent,
    DispatchFailed,
    DeliveryFailed,
}

/// Per-connection tally, logged when the stream closes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub received: usize,
    pub delivered: usize,
    pub silent: usize,
    pub failed: usize,
}

impl SessionStats {
    fn record(&mut self, outcome: EnvelopeOutcome) {
        self.received += 1;
        match outcome {
            EnvelopeOutcome::Delivered => self.delivered += 1,
            EnvelopeOutcome::Silent => self.silent += 1,
            EnvelopeOutcome::DispatchFailed | EnvelopeOutcome::DeliveryFailed => self.failed += 1,
        }
    }
}

pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: Arc<EventDispatcher>,
    reconnect_policy: ReconnectPolicy,
    noop_transport: bool,
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self {
            transport,
            dispatcher: Arc::new(dispatcher),
            reconnect_policy,
            noop_transport: false,
        }
    }

    /// Runner that accepts no traffic, for processes started without a live
    /// socket connection.
    pub fn noop(dispatcher: EventDispatcher) -> Self {
        Self {
            transport: Arc::new(NoopSocketTransport),
            dispatcher: Arc::new(dispatcher),
            reconnect_policy: ReconnectPolicy::default(),
            noop_transport: true,
        }
    }

    pub fn is_noop_transport(&self) -> bool {
        self.noop_transport
    }

    pub fn handler_count(&self) -> usize {
        self.dispatcher.handler_count()
    }

    /// Serves lookup traffic until the stream closes. Failures are retried
    /// with backoff and the retry budget is restored by every successful
    /// connect. Once retries run out the runner returns `Ok` so the process
    /// (and its health endpoint) stays up.
    pub async fn start(&self) -> Result<SessionStats> {
        let mut attempt = 0;
        loop {
            let session = match self.transport.connect().await {
                Ok(()) => {
                    info!(
                        event_name = "system.slack.session_opened",
                        attempt,
                        "slack session connected"
                    );
                    attempt = 0;
                    self.serve_session().await
                }
                Err(error) => Err(error),
            };

            match session {
                Ok(stats) => return Ok(stats),
                Err(error) if attempt < self.reconnect_policy.max_retries => {
                    let delay = self.reconnect_policy.backoff(attempt);
                    warn!(
                        event_name = "system.slack.session_failed",
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %error,
                        "slack session failed; reconnecting"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(error) => {
                    warn!(
                        event_name = "system.slack.retries_exhausted",
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %error,
                        "giving up on the slack session; lookups are unavailable"
                    );
                    return Ok(SessionStats::default());
                }
            }
        }
    }

    /// Each envelope is acknowledged in arrival order, then answered on its
    /// own task so a slow order API call never holds up other users.
    async fn serve_session(&self) -> Result<SessionStats, TransportError> {
        let mut stats = SessionStats::default();
        let mut in_flight = JoinSet::new();

        let stream = loop {
            match self.transport.next_envelope().await {
                Ok(Some(envelope)) => {
                    self.acknowledge(&envelope).await;
                    in_flight.spawn(respond(
                        Arc::clone(&self.dispatcher),
                        Arc::clone(&self.transport),
                        envelope,
                    ));
                    while let Some(joined) = in_flight.try_join_next() {
                        stats.record(joined_outcome(joined));
                    }
                }
                Ok(None) => break Ok(()),
                Err(error) => break Err(error),
            }
        };

        while let Some(joined) = in_flight.join_next().await {
            stats.record(joined_outcome(joined));
        }

        info!(
            event_name = "system.slack.session_closed",
            received = stats.received,
            delivered = stats.delivered,
            silent = stats.silent,
            failed = stats.failed,
            "slack session closed"
        );
        stream?;
        self.transport.disconnect().await?;
        Ok(stats)
    }

    /// Acks before dispatching so Slack does not redeliver while the order
    /// API is slow.
    async fn acknowledge(&self, envelope: &SlackEnvelope) {
        let envelope_id = envelope.envelope_id.as_str();
        let (run_id, channel_id) = correlation_fields(envelope);
        info!(
            event_name = "ingress.slack.envelope_received",
            correlation_id = envelope_id,
            event_type = ?envelope.event.event_type(),
            run_id = run_id.as_deref().unwrap_or("none"),
            channel_id = channel_id.as_deref().unwrap_or("none"),
            "received slack envelope"
        );

        match self.transport.acknowledge(envelope_id).await {
            Ok(()) => debug!(
                event_name = "ingress.slack.ack_sent",
                correlation_id = envelope_id,
                "acknowledged slack envelope"
            ),
            Err(error) => warn!(
                event_name = "ingress.slack.ack_failed",
                correlation_id = envelope_id,
                error = %error,
                "failed to acknowledge slack envelope"
            ),
        }
    }
}

async fn respond(
    dispatcher: Arc<EventDispatcher>,
    transport: Arc<dyn SocketTransport>,
    envelope: SlackEnvelope,
) -> EnvelopeOutcome {
    let envelope_id = envelope.envelope_id.as_str();
    let (run_id, _) = correlation_fields(&envelope);
    let run_id = run_id.as_deref().unwrap_or("none");

    let context = EventContext { correlation_id: envelope_id.to_owned() };
    let result = match dispatcher.dispatch(&envelope, &context).await {
        Ok(HandlerResult::Ignored | HandlerResult::Processed) => return EnvelopeOutcome::Silent,
        Ok(result) => result,
        Err(error) => {
            warn!(
                event_name = "ingress.slack.dispatch_failed",
                correlation_id = envelope_id,
                run_id,
                error = %error,
                "lookup event could not be handled"
            );
            return EnvelopeOutcome::DispatchFailed;
        }
    };

    match transport.deliver(&envelope, &result).await {
        Ok(()) => EnvelopeOutcome::Delivered,
        Err(error) => {
            warn!(
                event_name = "egress.slack.response_failed",
                correlation_id = envelope_id,
                run_id,
                error = %error,
                "failed to deliver slack response"
            );
            EnvelopeOutcome::DeliveryFailed
        }
    }
}

fn joined_outcome(joined: Result<EnvelopeOutcome, JoinError>) -> EnvelopeOutcome {
    joined.unwrap_or_else(|error| {
        warn!(
            event_name = "ingress.slack.handler_panicked",
            error = %error,
            "slack envelope task did not complete"
        );
        EnvelopeOutcome::DispatchFailed
    })
}

fn correlation_fields(envelope: &SlackEnvelope) -> (Option<String>, Option<String>) {
    match &envelope.event {
        SlackEvent::BlockAction(event) => (
            run_id_from_block_id(&event.block_id).map(|run_id| run_id.to_string()),
            Some(event.channel_id.clone()),
        ),
        SlackEvent::SlashCommand(payload) => (None, Some(payload.channel_id.clone())),
        SlackEvent::ViewSubmission(_) | SlackEvent::Unsupported { .. } => (None, None),
    }
}
