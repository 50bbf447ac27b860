use thiserror::Error;
use tracing::{debug, warn};

use crate::flows::states::{FlowAction, FlowEvent, TransitionOutcome, WorkflowState};

pub trait FlowDefinition {
    fn initial_state(&self) -> WorkflowState;
    fn transition(
        &self,
        current: &WorkflowState,
        event: &FlowEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// The order lookup workflow: search, branch on result count, optionally
/// wait for a selection, report.
#[derive(Clone, Copy, Debug, Default)]
pub struct LookupFlow;

impl FlowDefinition for LookupFlow {
    fn initial_state(&self) -> WorkflowState {
        WorkflowState::Idle
    }

    fn transition(
        &self,
        current: &WorkflowState,
        event: &FlowEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_lookup(current, event)
    }
}

#[derive(Clone, Debug)]
pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> WorkflowState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &WorkflowState,
        event: &FlowEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event)
    }

    /// Same as [`FlowEngine::apply`], recording the outcome under the run's
    /// correlation id.
    pub fn apply_traced(
        &self,
        current: &WorkflowState,
        event: &FlowEvent,
        correlation_id: &str,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        let result = self.apply(current, event);
        match &result {
            Ok(outcome) => debug!(
                event_name = "workflow.transition.applied",
                correlation_id,
                from = ?outcome.from,
                to = ?outcome.to,
                event = ?outcome.event,
                "workflow transition applied"
            ),
            Err(error) => warn!(
                event_name = "workflow.transition.rejected",
                correlation_id,
                error = %error,
                "workflow transition rejected"
            ),
        }
        result
    }
}

impl Default for FlowEngine<LookupFlow> {
    fn default() -> Self {
        Self::new(LookupFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: WorkflowState, event: FlowEvent },
}

fn transition_lookup(
    current: &WorkflowState,
    event: &FlowEvent,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowAction::{
        AwaitSelection, DispatchSearch, FetchSelected, Finish, PresentCandidates, PresentOrder,
        RejectInput, ReportFailure, ReportNoResults,
    };
    use FlowEvent::{
        CandidatesPresented, DisplayFailed, InputRejected, LookupFailed, OrderFetched,
        QueryReceived, Reported, ResultsLoaded, SelectionMade,
    };
    use WorkflowState::{
        Done, Failed, Idle, MultipleResults, NoResults, Resolved, Searching, Selecting,
        SingleResult,
    };

    let (to, actions) = match (current, event) {
        (Idle, QueryReceived) => (Searching, vec![DispatchSearch]),
        (Idle, InputRejected) => (Failed, vec![RejectInput]),
        (Searching, ResultsLoaded { count: 0 }) => (NoResults, vec![ReportNoResults]),
        (Searching, ResultsLoaded { count: 1 }) => (SingleResult, vec![PresentOrder]),
        (Searching, ResultsLoaded { .. }) => (MultipleResults, vec![PresentCandidates]),
        (Searching, LookupFailed) => (Failed, vec![ReportFailure]),
        (MultipleResults, CandidatesPresented) => (Selecting, vec![AwaitSelection]),
        (MultipleResults, DisplayFailed)
        | (SingleResult, DisplayFailed)
        | (Resolved, DisplayFailed) => (Failed, vec![ReportFailure]),
        (Selecting, SelectionMade) => (Selecting, vec![FetchSelected]),
        (Selecting, OrderFetched) => (Resolved, vec![PresentOrder]),
        (Selecting, LookupFailed) => (Failed, vec![ReportFailure]),
        (NoResults, Reported)
        | (SingleResult, Reported)
        | (Resolved, Reported)
        | (Failed, Reported) => (Done, vec![Finish]),
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: *current,
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: event.clone(), actions })
}

#[cfg(test)]
mod tests {
    use crate::flows::engine::{FlowDefinition, FlowEngine, FlowTransitionError, LookupFlow};
    use crate::flows::states::{FlowAction, FlowEvent, WorkflowState};

    fn walk(events: &[FlowEvent]) -> WorkflowState {
        let engine = FlowEngine::default();
        events.iter().fold(engine.initial_state(), |state, event| {
            engine.apply(&state, event).expect("valid transition").to
        })
    }

    #[test]
    fn result_count_picks_the_branch() {
        let engine = FlowEngine::default();
        let cases = [
            (0, WorkflowState::NoResults, FlowAction::ReportNoResults),
            (1, WorkflowState::SingleResult, FlowAction::PresentOrder),
            (2, WorkflowState::MultipleResults, FlowAction::PresentCandidates),
            (57, WorkflowState::MultipleResults, FlowAction::PresentCandidates),
        ];

        for (count, state, action) in cases {
            let outcome = engine
                .apply(&WorkflowState::Searching, &FlowEvent::ResultsLoaded { count })
                .expect("searching accepts results");
            assert_eq!(outcome.to, state, "count {count}");
            assert_eq!(outcome.actions, vec![action]);
        }
    }

    #[test]
    fn single_result_path_reaches_done() {
        let state = walk(&[
            FlowEvent::QueryReceived,
            FlowEvent::ResultsLoaded { count: 1 },
            FlowEvent::Reported,
        ]);
        assert_eq!(state, WorkflowState::Done);
    }

    #[test]
    fn selection_path_suspends_then_resolves() {
        let suspended = walk(&[
            FlowEvent::QueryReceived,
            FlowEvent::ResultsLoaded { count: 3 },
            FlowEvent::CandidatesPresented,
        ]);
        assert!(suspended.is_suspended());

        let engine = FlowEngine::default();
        let fetch = engine.apply(&suspended, &FlowEvent::SelectionMade).expect("selection");
        assert_eq!(fetch.to, WorkflowState::Selecting);
        assert_eq!(fetch.actions, vec![FlowAction::FetchSelected]);

        let resolved = engine.apply(&fetch.to, &FlowEvent::OrderFetched).expect("fetched");
        assert_eq!(resolved.to, WorkflowState::Resolved);
        assert!(resolved.to.is_reporting());
    }

    #[test]
    fn every_failure_path_reports_then_finishes() {
        let paths: [&[FlowEvent]; 4] = [
            &[FlowEvent::InputRejected],
            &[FlowEvent::QueryReceived, FlowEvent::LookupFailed],
            &[
                FlowEvent::QueryReceived,
                FlowEvent::ResultsLoaded { count: 1 },
                FlowEvent::DisplayFailed,
            ],
            &[
                FlowEvent::QueryReceived,
                FlowEvent::ResultsLoaded { count: 2 },
                FlowEvent::CandidatesPresented,
                FlowEvent::SelectionMade,
                FlowEvent::LookupFailed,
            ],
        ];

        for events in paths {
            assert_eq!(walk(events), WorkflowState::Failed, "path {events:?}");
            let mut with_report = events.to_vec();
            with_report.push(FlowEvent::Reported);
            assert_eq!(walk(&with_report), WorkflowState::Done);
        }
    }

    #[test]
    fn out_of_order_events_are_rejected() {
        let engine = FlowEngine::default();
        for (state, event) in [
            (WorkflowState::Idle, FlowEvent::SelectionMade),
            (WorkflowState::Done, FlowEvent::QueryReceived),
            (WorkflowState::SingleResult, FlowEvent::SelectionMade),
            (WorkflowState::Selecting, FlowEvent::Reported),
        ] {
            let error = engine.apply(&state, &event).expect_err("must reject");
            assert_eq!(error, FlowTransitionError::InvalidTransition { state, event });
        }
    }

    #[test]
    fn replay_is_deterministic_for_same_event_sequence() {
        let events = [
            FlowEvent::QueryReceived,
            FlowEvent::ResultsLoaded { count: 2 },
            FlowEvent::CandidatesPresented,
            FlowEvent::SelectionMade,
            FlowEvent::OrderFetched,
            FlowEvent::Reported,
        ];
        let run = || {
            let mut state = LookupFlow.initial_state();
            let mut actions = Vec::new();
            for event in &events {
                let outcome = LookupFlow.transition(&state, event).expect("deterministic run");
                actions.push(outcome.actions);
                state = outcome.to;
            }
            (state, actions)
        };

        assert_eq!(run(), run());
        assert_eq!(run().0, WorkflowState::Done);
    }
}
