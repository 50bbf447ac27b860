pub mod controller;
pub mod engine;
pub mod states;

pub use controller::{WorkflowController, WorkflowEvent, WorkflowReport, WorkflowRun};
pub use engine::{FlowDefinition, FlowEngine, FlowTransitionError, LookupFlow};
pub use states::{FlowAction, FlowEvent, TransitionOutcome, WorkflowState};
