use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use orderdesk_core::{
    Color, ErrorKind, LookupError, OrderApi, OrderLink, OrderPresenter, Query, QueryInput,
    RawPayload, WorkflowController, WorkflowEvent, WorkflowReport, WorkflowRun, WorkflowState,
};
use serde_json::json;

#[derive(Default)]
struct FakeOrderApi {
    by_email: HashMap<String, Result<RawPayload, LookupError>>,
    by_external_id: HashMap<String, Result<RawPayload, LookupError>>,
    by_id: HashMap<String, Result<RawPayload, LookupError>>,
    calls: Mutex<Vec<String>>,
}

impl FakeOrderApi {
    fn email(mut self, email: &str, result: Result<RawPayload, LookupError>) -> Self {
        self.by_email.insert(email.to_owned(), result);
        self
    }

    fn external_id(mut self, id: &str, result: Result<RawPayload, LookupError>) -> Self {
        self.by_external_id.insert(id.to_owned(), result);
        self
    }

    fn order(mut self, id: &str, result: Result<RawPayload, LookupError>) -> Self {
        self.by_id.insert(id.to_owned(), result);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn answer(
        &self,
        table: &HashMap<String, Result<RawPayload, LookupError>>,
        key: &str,
        call: String,
    ) -> Result<RawPayload, LookupError> {
        self.calls.lock().expect("calls lock").push(call);
        table.get(key).cloned().unwrap_or_else(|| {
            Err(LookupError::Network { status: Some(404), reason: "Not Found".to_owned() })
        })
    }
}

#[async_trait]
impl OrderApi for FakeOrderApi {
    async fn fetch_by_email(&self, email: &str) -> Result<RawPayload, LookupError> {
        self.answer(&self.by_email, email, format!("email:{email}"))
    }

    async fn fetch_by_external_id(&self, external_id: &str) -> Result<RawPayload, LookupError> {
        self.answer(&self.by_external_id, external_id, format!("q:{external_id}"))
    }

    async fn fetch_by_id(&self, order_id: &str) -> Result<RawPayload, LookupError> {
        self.answer(&self.by_id, order_id, format!("id:{order_id}"))
    }
}

fn controller(api: FakeOrderApi) -> (Arc<FakeOrderApi>, WorkflowController<Arc<FakeOrderApi>>) {
    let api = Arc::new(api);
    (api.clone(), WorkflowController::new(api, OrderPresenter::default()))
}

#[tokio::test]
async fn list_of_two_orders_presents_two_candidates() {
    let (_, controller) = controller(FakeOrderApi::default().email(
        "ana@example.com",
        Ok(json!([
            { "internal_id": "9f8e7d6c5b4a", "status": "APPROVED", "price_display": "R$ 10,00" },
            { "internal_id": "1a2b3c4d5e6f", "status": "PENDING", "price": 25.5 }
        ])),
    ));

    let run = controller.run_query(QueryInput::email("ana@example.com")).await;

    assert_eq!(run.state, WorkflowState::Selecting);
    assert!(run.visited().contains(&WorkflowState::MultipleResults));
    let Some(WorkflowReport::Candidates(list)) = &run.report else {
        panic!("expected a candidate list, got {:?}", run.report);
    };
    assert_eq!(list.run_id, run.id);
    assert_eq!(list.len(), 2);
    assert_eq!(list.candidates[0].label, "Pedido #9f8e7d6c...");
    assert_eq!(list.candidates[1].label, "Pedido #1a2b3c4d...");
    assert_eq!(list.candidates[1].description, "PENDING - 25.5");
}

#[tokio::test]
async fn single_object_payload_is_presented_directly() {
    let (api, controller) = controller(FakeOrderApi::default().external_id(
        "123456789",
        Ok(json!({ "internal_id": "abc123", "status": "PENDING", "client_name": "Bia" })),
    ));

    let run = controller.run_query(QueryInput::external_id("123456789")).await;

    assert_eq!(
        run.visited(),
        vec![WorkflowState::Searching, WorkflowState::SingleResult, WorkflowState::Done]
    );
    let Some(WorkflowReport::Order { display, link }) = run.report else {
        panic!("expected an order report");
    };
    assert!(display.title.contains("abc123"));
    assert_eq!(display.color, Color::Amber);
    assert!(matches!(
        link,
        OrderLink::Available { ref url, .. } if url == "https://centralcart.com.br/abc123"
    ));
    assert_eq!(api.calls(), vec!["q:123456789".to_owned()]);
}

#[tokio::test]
async fn status_drives_the_display_color() {
    let (_, controller) = controller(
        FakeOrderApi::default()
            .email("ok@example.com", Ok(json!({ "internal_id": "g1", "status": "APPROVED" })))
            .email("no@example.com", Ok(json!({ "internal_id": "r1", "status": "CANCELED" }))),
    );

    for (email, color) in [("ok@example.com", Color::Green), ("no@example.com", Color::Red)] {
        let run = controller.run_query(QueryInput::email(email)).await;
        match run.report {
            Some(WorkflowReport::Order { display, .. }) => assert_eq!(display.color, color),
            other => panic!("unexpected report for {email}: {other:?}"),
        }
    }
}

#[tokio::test]
async fn blank_inputs_fail_without_calling_the_api() {
    let (api, controller) = controller(FakeOrderApi::default());

    let run = controller
        .run_query(QueryInput { email: Some("   ".to_owned()), external_id: Some(String::new()) })
        .await;

    assert_eq!(
        run.report,
        Some(WorkflowReport::InvalidInput {
            message: "Por favor, forneça um e-mail ou um ID de usuário válido.".to_owned()
        })
    );
    assert!(run.is_finished());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn logical_api_errors_are_surfaced_verbatim() {
    let (_, controller) = controller(FakeOrderApi::default().email(
        "ana@example.com",
        Ok(json!({ "errors": [{ "message": "invalid token" }] })),
    ));

    let run = controller.run_query(QueryInput::email("ana@example.com")).await;

    match &run.report {
        Some(WorkflowReport::Failed { kind, message }) => {
            assert_eq!(*kind, ErrorKind::Api);
            assert_eq!(message, "Erro ao buscar compras: invalid token");
        }
        other => panic!("unexpected report {other:?}"),
    }
    assert_eq!(run.state, WorkflowState::Done);
}

#[tokio::test]
async fn network_errors_end_the_run_with_the_search_prefix() {
    let (_, controller) = controller(FakeOrderApi::default().email(
        "ana@example.com",
        Err(LookupError::Network { status: Some(503), reason: "Service Unavailable".to_owned() }),
    ));

    let run = controller.run_query(QueryInput::email("ana@example.com")).await;

    assert_eq!(
        run.report,
        Some(WorkflowReport::Failed {
            kind: ErrorKind::Network,
            message: "Erro ao buscar compras: Erro na API: 503 - Service Unavailable".to_owned()
        })
    );
}

#[tokio::test]
async fn empty_and_unrecognized_payloads_report_no_results() {
    let (_, controller) = controller(
        FakeOrderApi::default()
            .email("empty@example.com", Ok(json!({ "orders": [] })))
            .external_id("42", Ok(json!({ "message": "nothing here" }))),
    );

    let run = controller.run_query(QueryInput::email("empty@example.com")).await;
    match run.report {
        Some(WorkflowReport::NoResults { query, message }) => {
            assert_eq!(query, Query::ByEmail("empty@example.com".to_owned()));
            assert!(message.starts_with(
                "Não encontramos compras associadas ao e-mail empty@example.com."
            ));
        }
        other => panic!("unexpected report {other:?}"),
    }

    let run = controller.run_query(QueryInput::external_id("42")).await;
    assert!(matches!(run.report, Some(WorkflowReport::NoResults { .. })));
    assert!(run.visited().contains(&WorkflowState::NoResults));
}

#[tokio::test]
async fn selection_resolves_through_fetch_by_id() {
    let (api, controller) = controller(
        FakeOrderApi::default()
            .email(
                "ana@example.com",
                Ok(json!({ "data": [{ "internal_id": "first" }, { "internal_id": "second" }] })),
            )
            .order("second", Ok(json!({ "internal_id": "second", "status": "REFUNDED" }))),
    );

    let run = controller.run_query(QueryInput::email("ana@example.com")).await;
    let Some(WorkflowReport::Candidates(list)) = &run.report else {
        panic!("expected candidates");
    };
    let key = list.candidates[1].option_value();

    let mut resumed = WorkflowRun::awaiting_selection(list.run_id);
    let report = controller.advance(&mut resumed, WorkflowEvent::SelectionMade(key)).await;

    match report {
        WorkflowReport::Order { display, .. } => {
            assert_eq!(display.title, "Pedido #second");
            assert_eq!(display.color, Color::Red);
        }
        other => panic!("unexpected report {other:?}"),
    }
    assert_eq!(resumed.state, WorkflowState::Done);
    assert!(resumed.visited().contains(&WorkflowState::Resolved));
    assert_eq!(api.calls(), vec!["email:ana@example.com".to_owned(), "id:second".to_owned()]);
}

#[tokio::test]
async fn stale_selection_fails_when_the_backend_cannot_resolve_it() {
    let (_, controller) = controller(FakeOrderApi::default());

    let run = controller.verify("from-an-old-run").await;

    assert_eq!(
        run.report,
        Some(WorkflowReport::Failed {
            kind: ErrorKind::Network,
            message: "Erro ao verificar o pedido: Erro na API: 404 - Not Found".to_owned()
        })
    );
    assert!(run.is_finished());
}

#[tokio::test]
async fn unselectable_candidates_never_reach_the_api() {
    let (api, controller) = controller(FakeOrderApi::default().email(
        "ana@example.com",
        Ok(json!([{ "status": "PENDING" }, { "internal_id": "known" }])),
    ));

    let run = controller.run_query(QueryInput::email("ana@example.com")).await;
    let Some(WorkflowReport::Candidates(list)) = &run.report else {
        panic!("expected candidates");
    };
    assert_eq!(list.candidates[0].key, None);

    let mut resumed = WorkflowRun::awaiting_selection(list.run_id);
    let report = controller
        .advance(&mut resumed, WorkflowEvent::SelectionMade(list.candidates[0].option_value()))
        .await;

    assert!(matches!(report, WorkflowReport::Failed { kind: ErrorKind::UserInput, .. }));
    assert_eq!(api.calls(), vec!["email:ana@example.com".to_owned()]);
}

#[tokio::test]
async fn undisplayable_order_is_distinct_from_not_found() {
    let (_, controller) = controller(
        FakeOrderApi::default()
            .order("empty-body", Ok(json!([])))
            .order("ok", Ok(json!({ "internal_id": "ok" }))),
    );

    let run = controller.verify("empty-body").await;
    match &run.report {
        Some(WorkflowReport::DisplayFailed { message }) => {
            assert!(message.starts_with(
                "Encontramos o pedido, mas houve um erro ao exibir os detalhes:"
            ));
        }
        other => panic!("unexpected report {other:?}"),
    }
    assert!(run.visited().contains(&WorkflowState::Failed));

    let run = controller.verify("ok").await;
    assert!(matches!(run.report, Some(WorkflowReport::Order { .. })));
}

#[tokio::test]
async fn overlapping_runs_are_independent() {
    let (_, controller) = controller(
        FakeOrderApi::default()
            .email("a@example.com", Ok(json!([{ "internal_id": "a1" }, { "internal_id": "a2" }])))
            .email("b@example.com", Ok(json!({ "internal_id": "b1" }))),
    );

    let (first, second) = tokio::join!(
        controller.run_query(QueryInput::email("a@example.com")),
        controller.run_query(QueryInput::email("b@example.com")),
    );

    assert_ne!(first.id, second.id);
    assert_eq!(first.state, WorkflowState::Selecting);
    assert_eq!(second.state, WorkflowState::Done);
}
