//! Drives one lookup run from the initial query to its final report.
//!
//! The controller owns no per-run state. A [`WorkflowRun`] is created for
//! each query and handed back to the caller; the only suspension point is
//! `Selecting`, which a chat adapter resumes with
//! [`WorkflowRun::awaiting_selection`] once the user picks a candidate.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{check_logical_errors, OrderApi, RawPayload};
use crate::domain::query::{Query, QueryInput};
use crate::errors::{ErrorKind, LookupError};
use crate::flows::engine::{FlowEngine, FlowTransitionError, LookupFlow};
use crate::flows::states::{FlowEvent, TransitionOutcome, WorkflowState};
use crate::normalize::{normalize, order_from_payload};
use crate::presenter::{DisplayModel, OrderLink, OrderPresenter};
use crate::selection::{CandidateList, SelectionKey};

pub const STALE_INTERACTION: &str =
    "Esta interação não está mais disponível. Inicie uma nova busca.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkflowEvent {
    QueryReceived(QueryInput),
    /// The raw option value the user picked.
    SelectionMade(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WorkflowReport {
    InvalidInput { message: String },
    Failed { kind: ErrorKind, message: String },
    NoResults { query: Query, message: String },
    Order { display: DisplayModel, link: OrderLink },
    DisplayFailed { message: String },
    Candidates(CandidateList),
}

impl WorkflowReport {
    /// Plain text for reports that are a single message.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::InvalidInput { message }
            | Self::Failed { message, .. }
            | Self::NoResults { message, .. }
            | Self::DisplayFailed { message } => Some(message),
            Self::Order { .. } | Self::Candidates(_) => None,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::Failed { .. } => "failed",
            Self::NoResults { .. } => "no_results",
            Self::Order { .. } => "order",
            Self::DisplayFailed { .. } => "display_failed",
            Self::Candidates(_) => "candidates",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: Uuid,
    pub state: WorkflowState,
    pub query: Option<Query>,
    pub transitions: Vec<TransitionOutcome>,
    pub report: Option<WorkflowReport>,
}

impl Default for WorkflowRun {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowRun {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: WorkflowState::Idle,
            query: None,
            transitions: Vec::new(),
            report: None,
        }
    }

    /// Rebuilds a run parked at the selection step, keyed by the id that was
    /// carried through the chat surface.
    pub fn awaiting_selection(id: Uuid) -> Self {
        Self { id, state: WorkflowState::Selecting, ..Self::new() }
    }

    pub fn correlation_id(&self) -> String {
        self.id.to_string()
    }

    pub fn is_finished(&self) -> bool {
        self.state == WorkflowState::Done
    }

    pub fn visited(&self) -> Vec<WorkflowState> {
        self.transitions.iter().map(|outcome| outcome.to).collect()
    }
}

pub struct WorkflowController<A> {
    api: A,
    presenter: OrderPresenter,
    engine: FlowEngine<LookupFlow>,
}

impl<A> WorkflowController<A>
where
    A: OrderApi,
{
    pub fn new(api: A, presenter: OrderPresenter) -> Self {
        Self { api, presenter, engine: FlowEngine::default() }
    }

    pub fn presenter(&self) -> &OrderPresenter {
        &self.presenter
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Starts a run from the lookup form inputs.
    pub async fn run_query(&self, input: QueryInput) -> WorkflowRun {
        let mut run = WorkflowRun::new();
        self.advance(&mut run, WorkflowEvent::QueryReceived(input)).await;
        run
    }

    /// Fetches and presents one order by id, as a run resumed at selection.
    pub async fn verify(&self, order_id: &str) -> WorkflowRun {
        let mut run = WorkflowRun::awaiting_selection(Uuid::new_v4());
        self.advance(&mut run, WorkflowEvent::SelectionMade(order_id.to_owned())).await;
        run
    }

    /// Feeds one external event into the run. Events the run cannot accept in
    /// its current state leave it untouched and yield a stale interaction
    /// failure.
    pub async fn advance(&self, run: &mut WorkflowRun, event: WorkflowEvent) -> WorkflowReport {
        let result = match event {
            WorkflowEvent::QueryReceived(input) => self.search(run, &input).await,
            WorkflowEvent::SelectionMade(raw) => self.select(run, &raw).await,
        };

        match result {
            Ok(report) => {
                run.report = Some(report.clone());
                report
            }
            Err(error) => {
                warn!(
                    event_name = "workflow.event.rejected",
                    correlation_id = %run.id,
                    state = ?run.state,
                    error = %error,
                    "workflow event does not apply to the current state"
                );
                WorkflowReport::Failed {
                    kind: ErrorKind::UserInput,
                    message: STALE_INTERACTION.to_owned(),
                }
            }
        }
    }

    async fn search(
        &self,
        run: &mut WorkflowRun,
        input: &QueryInput,
    ) -> Result<WorkflowReport, FlowTransitionError> {
        let query = match input.to_query() {
            Ok(query) => query,
            Err(error) => {
                self.step(run, FlowEvent::InputRejected)?;
                return self
                    .finish(run, WorkflowReport::InvalidInput { message: error.to_string() });
            }
        };

        self.step(run, FlowEvent::QueryReceived)?;
        run.query = Some(query.clone());
        info!(
            event_name = "workflow.search.dispatched",
            correlation_id = %run.id,
            lookup_key = query.key().as_str(),
            "dispatching order search"
        );

        let fetched = match &query {
            Query::ByEmail(email) => self.api.fetch_by_email(email).await,
            Query::ByExternalId(external_id) => self.api.fetch_by_external_id(external_id).await,
        };
        let payload = match fetched.and_then(accept_payload) {
            Ok(payload) => payload,
            Err(error) => {
                self.step(run, FlowEvent::LookupFailed)?;
                return self.finish(run, failed(&error, "Erro ao buscar compras"));
            }
        };

        let normalized = normalize(&payload);
        for diagnostic in &normalized.diagnostics {
            warn!(
                event_name = "workflow.normalize.shape_mismatch",
                correlation_id = %run.id,
                shape = normalized.shape,
                diagnostic = %diagnostic.describe(),
                "order payload did not fully match a known shape"
            );
        }
        info!(
            event_name = "workflow.search.completed",
            correlation_id = %run.id,
            shape = normalized.shape,
            count = normalized.orders.len(),
            "order search completed"
        );

        let orders = normalized.orders;
        match self.step(run, FlowEvent::ResultsLoaded { count: orders.len() })? {
            WorkflowState::NoResults => {
                let message = format!(
                    "Não encontramos compras associadas ao {}. Verifique se as informações estão corretas ou se o cliente já realizou alguma compra.",
                    query.describe()
                );
                self.finish(run, WorkflowReport::NoResults { query, message })
            }
            WorkflowState::SingleResult => {
                let Some(order) = orders.first() else {
                    return Err(self.mismatch(run, FlowEvent::ResultsLoaded { count: 0 }));
                };
                match self.presenter.present(order) {
                    Ok(display) => {
                        let link = self.presenter.link_for(order);
                        self.finish(run, WorkflowReport::Order { display, link })
                    }
                    Err(error) => {
                        self.step(run, FlowEvent::DisplayFailed)?;
                        let message = format!(
                            "Encontramos o pedido, mas houve um erro ao exibir os detalhes: {error}"
                        );
                        self.finish(run, WorkflowReport::DisplayFailed { message })
                    }
                }
            }
            _ => match CandidateList::build(run.id, &query, &orders, &self.presenter) {
                Ok(list) => {
                    self.step(run, FlowEvent::CandidatesPresented)?;
                    Ok(WorkflowReport::Candidates(list))
                }
                Err(error) => {
                    self.step(run, FlowEvent::DisplayFailed)?;
                    let message = format!(
                        "Encontramos {} pedidos, mas houve um erro ao criar o menu de seleção: {error}",
                        orders.len()
                    );
                    self.finish(run, WorkflowReport::DisplayFailed { message })
                }
            },
        }
    }

    async fn select(
        &self,
        run: &mut WorkflowRun,
        raw: &str,
    ) -> Result<WorkflowReport, FlowTransitionError> {
        self.step(run, FlowEvent::SelectionMade)?;

        let fetched = match SelectionKey::parse(raw) {
            Ok(key) => {
                info!(
                    event_name = "workflow.selection.fetching",
                    correlation_id = %run.id,
                    order_id = key.as_str(),
                    "fetching selected order"
                );
                self.api.fetch_by_id(key.as_str()).await
            }
            Err(error) => Err(error),
        };
        let payload = match fetched.and_then(accept_payload) {
            Ok(payload) => payload,
            Err(error) => {
                self.step(run, FlowEvent::LookupFailed)?;
                return self.finish(run, failed(&error, "Erro ao verificar o pedido"));
            }
        };

        self.step(run, FlowEvent::OrderFetched)?;
        let presented = order_from_payload(&payload).and_then(|order| {
            let display = self.presenter.present(&order)?;
            Ok((display, self.presenter.link_for(&order)))
        });

        match presented {
            Ok((display, link)) => self.finish(run, WorkflowReport::Order { display, link }),
            Err(error) => {
                self.step(run, FlowEvent::DisplayFailed)?;
                let message = format!(
                    "Encontramos o pedido, mas houve um erro ao exibir os detalhes: {error}"
                );
                self.finish(run, WorkflowReport::DisplayFailed { message })
            }
        }
    }

    fn step(
        &self,
        run: &mut WorkflowRun,
        event: FlowEvent,
    ) -> Result<WorkflowState, FlowTransitionError> {
        let outcome = self.engine.apply_traced(&run.state, &event, &run.correlation_id())?;
        run.state = outcome.to;
        run.transitions.push(outcome);
        Ok(run.state)
    }

    fn finish(
        &self,
        run: &mut WorkflowRun,
        report: WorkflowReport,
    ) -> Result<WorkflowReport, FlowTransitionError> {
        self.step(run, FlowEvent::Reported)?;
        info!(
            event_name = "workflow.run.finished",
            correlation_id = %run.id,
            outcome = report.outcome(),
            "workflow run finished"
        );
        Ok(report)
    }

    fn mismatch(&self, run: &WorkflowRun, event: FlowEvent) -> FlowTransitionError {
        FlowTransitionError::InvalidTransition { state: run.state, event }
    }
}

fn accept_payload(payload: RawPayload) -> Result<RawPayload, LookupError> {
    check_logical_errors(&payload).map(|()| payload)
}

fn failed(error: &LookupError, context: &str) -> WorkflowReport {
    WorkflowReport::Failed { kind: error.kind(), message: format!("{context}: {error}") }
}
