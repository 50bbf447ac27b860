use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowState {
    Idle,
    Searching,
    NoResults,
    SingleResult,
    MultipleResults,
    Selecting,
    Resolved,
    Failed,
    Done,
}

impl WorkflowState {
    /// Terminal states emit their final report and then move to `Done`.
    pub fn is_reporting(&self) -> bool {
        matches!(self, Self::NoResults | Self::SingleResult | Self::Resolved | Self::Failed)
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Selecting)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    QueryReceived,
    InputRejected,
    ResultsLoaded { count: usize },
    CandidatesPresented,
    SelectionMade,
    OrderFetched,
    LookupFailed,
    DisplayFailed,
    Reported,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    RejectInput,
    DispatchSearch,
    ReportNoResults,
    PresentOrder,
    PresentCandidates,
    AwaitSelection,
    FetchSelected,
    ReportFailure,
    Finish,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: WorkflowState,
    pub to: WorkflowState,
    pub event: FlowEvent,
    pub actions: Vec<FlowAction>,
}
