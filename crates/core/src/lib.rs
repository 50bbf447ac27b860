pub mod api;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod normalize;
pub mod presenter;
pub mod selection;

pub use api::{ClientBuildError, HttpOrderApiClient, OrderApi, RawPayload};
pub use config::{AppConfig, ConfigError, LoadOptions, ValidationScope};
pub use domain::order::{Order, OrderId, OrderSet, OrderStatus, Package};
pub use domain::query::{LookupKey, Query, QueryInput};
pub use errors::{ErrorKind, LookupError, PresentError};
pub use flows::{
    FlowAction, FlowEngine, FlowEvent, LookupFlow, TransitionOutcome, WorkflowController,
    WorkflowEvent, WorkflowReport, WorkflowRun, WorkflowState,
};
pub use normalize::{normalize, Normalized, PayloadShape, ShapeDiagnostic};
pub use presenter::{
    label_for, order_link, Color, DisplayLimits, DisplayModel, OrderLink, OrderPresenter,
};
pub use selection::{Candidate, CandidateList, SelectionKey};
