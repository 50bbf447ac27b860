use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use orderdesk_core::{LookupError, OrderApi, OrderPresenter, RawPayload, WorkflowController};
use orderdesk_slack::blocks::{ActionElement, Block, CANDIDATE_SELECT_ACTION};
use orderdesk_slack::commands::SlashCommandPayload;
use orderdesk_slack::events::{
    lookup_dispatcher, BlockActionEvent, HandlerResult, SlackEnvelope, SlackEvent,
};
use orderdesk_slack::socket::{ReconnectPolicy, SocketModeRunner, SocketTransport, TransportError};
use serde_json::json;
use tokio::sync::Mutex;

struct CatalogApi;

#[async_trait]
impl OrderApi for CatalogApi {
    async fn fetch_by_email(&self, email: &str) -> Result<RawPayload, LookupError> {
        match email {
            "ana@example.com" => Ok(json!({
                "orders": [
                    {
                        "internal_id": "9f8e7d6c5b4a",
                        "status": "PENDING",
                        "price_display": "R$ 10,00"
                    },
                    {
                        "internal_id": "1a2b3c4d5e6f",
                        "status": "APPROVED",
                        "price_display": "R$ 25,50"
                    }
                ]
            })),
            _ => Ok(json!([])),
        }
    }

    async fn fetch_by_external_id(&self, _external_id: &str) -> Result<RawPayload, LookupError> {
        Err(LookupError::Network { status: Some(500), reason: "Internal Server Error".to_owned() })
    }

    async fn fetch_by_id(&self, order_id: &str) -> Result<RawPayload, LookupError> {
        Ok(json!({ "internal_id": order_id, "status": "APPROVED", "client_name": "Ana" }))
    }
}

/// Feeds envelopes one at a time; later envelopes may be derived from
/// earlier deliveries.
#[derive(Default)]
struct ConversationTransport {
    inbox: Mutex<VecDeque<SlackEnvelope>>,
    delivered: Mutex<Vec<(String, HandlerResult)>>,
}

#[async_trait]
impl SocketTransport for ConversationTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        Ok(self.inbox.lock().await.pop_front())
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn deliver(
        &self,
        envelope: &SlackEnvelope,
        result: &HandlerResult,
    ) -> Result<(), TransportError> {
        self.delivered.lock().await.push((envelope.envelope_id.clone(), result.clone()));
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

fn slash(envelope_id: &str, text: &str) -> SlackEnvelope {
    SlackEnvelope {
        envelope_id: envelope_id.to_owned(),
        event: SlackEvent::SlashCommand(SlashCommandPayload {
            command: "/pedido".to_owned(),
            text: text.to_owned(),
            channel_id: "C1".to_owned(),
            user_id: "U1".to_owned(),
            trigger_id: format!("trigger-{envelope_id}"),
            request_id: format!("req-{envelope_id}"),
        }),
    }
}

fn runner(transport: Arc<ConversationTransport>) -> SocketModeRunner {
    let controller = Arc::new(WorkflowController::new(CatalogApi, OrderPresenter::default()));
    SocketModeRunner::new(
        transport,
        lookup_dispatcher(controller),
        ReconnectPolicy { max_retries: 0, base_delay_ms: 0, max_delay_ms: 0 },
    )
}

fn message(result: &HandlerResult) -> &orderdesk_slack::blocks::MessageTemplate {
    match result {
        HandlerResult::Responded(message) => message,
        other => panic!("expected a message, got {other:?}"),
    }
}

#[tokio::test]
async fn search_then_select_resolves_the_chosen_order() {
    let transport = Arc::new(ConversationTransport::default());
    transport.inbox.lock().await.push_back(slash("env-1", "email ana@example.com"));
    runner(transport.clone()).start().await.expect("first pass");

    let delivered = transport.delivered.lock().await.clone();
    assert_eq!(delivered.len(), 1);
    let candidates = message(&delivered[0].1);
    let (block_id, option_value) = candidates
        .blocks
        .iter()
        .find_map(|block| match block {
            Block::Actions { block_id, elements } => match elements.first() {
                Some(ActionElement::StaticSelect(select)) => {
                    Some((block_id.clone(), select.options[1].value.clone()))
                }
                _ => None,
            },
            _ => None,
        })
        .expect("candidate select");
    assert_eq!(option_value, "1a2b3c4d5e6f");

    transport.inbox.lock().await.push_back(SlackEnvelope {
        envelope_id: "env-2".to_owned(),
        event: SlackEvent::BlockAction(BlockActionEvent {
            channel_id: "C1".to_owned(),
            message_ts: "1730000000.0001".to_owned(),
            user_id: "U1".to_owned(),
            trigger_id: "trigger-env-2".to_owned(),
            action_id: CANDIDATE_SELECT_ACTION.to_owned(),
            block_id,
            value: Some(option_value),
        }),
    });
    runner(transport.clone()).start().await.expect("second pass");

    let delivered = transport.delivered.lock().await.clone();
    assert_eq!(delivered.len(), 2);
    let order = message(&delivered[1].1);
    assert_eq!(order.fallback_text, "Pedido #1a2b3c4d5e6f");
    assert_eq!(order.color.as_deref(), Some("#00FF00"));
}

#[tokio::test]
async fn failures_and_empty_results_are_delivered_as_messages() {
    let transport = Arc::new(ConversationTransport::default());
    {
        let mut inbox = transport.inbox.lock().await;
        inbox.push_back(slash("env-a", "usuario 123"));
        inbox.push_back(slash("env-b", "email nobody@example.com"));
        inbox.push_back(slash("env-c", "buscar"));
    }

    runner(transport.clone()).start().await.expect("runner");

    let mut delivered = transport.delivered.lock().await.clone();
    delivered.sort_by(|left, right| left.0.cmp(&right.0));
    assert_eq!(delivered.len(), 3);
    assert_eq!(
        message(&delivered[0].1).fallback_text,
        "Erro ao buscar compras: Erro na API: 500 - Internal Server Error"
    );
    assert!(message(&delivered[1].1)
        .fallback_text
        .starts_with("Não encontramos compras associadas ao e-mail nobody@example.com."));
    assert!(matches!(
        &delivered[2].1,
        HandlerResult::OpenModal { trigger_id, .. } if trigger_id == "trigger-env-c"
    ));
}

/// Answers one mailbox slowly so overlapping lookups can be observed.
struct SlowMailboxApi;

#[async_trait]
impl OrderApi for SlowMailboxApi {
    async fn fetch_by_email(&self, email: &str) -> Result<RawPayload, LookupError> {
        if email == "slow@example.com" {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        Ok(json!({ "internal_id": format!("order-{email}"), "status": "APPROVED" }))
    }

    async fn fetch_by_external_id(&self, _external_id: &str) -> Result<RawPayload, LookupError> {
        Ok(json!([]))
    }

    async fn fetch_by_id(&self, order_id: &str) -> Result<RawPayload, LookupError> {
        Ok(json!({ "internal_id": order_id }))
    }
}

#[tokio::test]
async fn slow_lookup_does_not_hold_up_other_users() {
    let transport = Arc::new(ConversationTransport::default());
    {
        let mut inbox = transport.inbox.lock().await;
        inbox.push_back(slash("env-slow", "email slow@example.com"));
        inbox.push_back(slash("env-fast", "email fast@example.com"));
    }

    let controller = Arc::new(WorkflowController::new(SlowMailboxApi, OrderPresenter::default()));
    let runner = SocketModeRunner::new(
        transport.clone(),
        lookup_dispatcher(controller),
        ReconnectPolicy { max_retries: 0, base_delay_ms: 0, max_delay_ms: 0 },
    );
    let stats = runner.start().await.expect("runner");

    assert_eq!(stats.delivered, 2);
    let delivered = transport.delivered.lock().await.clone();
    let order: Vec<&str> = delivered.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(order, vec!["env-fast", "env-slow"]);
    assert_eq!(message(&delivered[0].1).fallback_text, "Pedido #order-fast@example.com");
}
