use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::OrderSet;
use crate::domain::query::Query;
use crate::errors::{LookupError, PresentError};
use crate::presenter::{label_for, Color, DisplayModel, OrderPresenter};

/// Option value used for candidates that cannot be selected. Chat surfaces
/// need a unique non-empty value per option even when the id is unknown.
pub const UNSELECTABLE_PREFIX: &str = "indisponivel:";

pub const SUMMARY_TITLE: &str = "Compras Encontradas";
pub const SELECT_PLACEHOLDER: &str = "Selecione uma compra para ver os detalhes";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub position: usize,
    /// The order id. `None` when the backend gave no id; such entries are
    /// listed but never resolve.
    pub key: Option<String>,
    pub label: String,
    pub description: String,
}

impl Candidate {
    pub fn option_value(&self) -> String {
        match &self.key {
            Some(key) => key.clone(),
            None => format!("{UNSELECTABLE_PREFIX}{}", self.position),
        }
    }
}

/// What a multi-result run presents: a summary plus one entry per order,
/// in backend order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateList {
    pub run_id: Uuid,
    pub query: Query,
    pub summary: DisplayModel,
    pub candidates: Vec<Candidate>,
}

impl CandidateList {
    pub fn build(
        run_id: Uuid,
        query: &Query,
        orders: &OrderSet,
        presenter: &OrderPresenter,
    ) -> Result<Self, PresentError> {
        let limit = presenter.limits().candidates;
        if orders.len() > limit {
            return Err(PresentError::TooManyCandidates { count: orders.len(), limit });
        }

        let candidates = orders
            .iter()
            .enumerate()
            .map(|(position, order)| Candidate {
                position,
                key: order.id.as_key().map(str::to_owned),
                label: format!("Pedido #{}", label_for(order, position)),
                description: format!("{} - {}", order.status_display, order.price_display),
            })
            .collect();

        Ok(Self {
            run_id,
            query: query.clone(),
            summary: DisplayModel {
                title: SUMMARY_TITLE.to_owned(),
                description: format!(
                    "Foram encontradas {} compras para o {}",
                    orders.len(),
                    query.describe_labeled()
                ),
                color: Color::Neutral,
                footer: String::new(),
            },
            candidates,
        })
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().filter_map(|candidate| candidate.key.as_deref())
    }

    pub fn resolve(&self, key: &SelectionKey) -> Option<&Candidate> {
        self.candidates.iter().find(|candidate| candidate.key.as_deref() == Some(key.as_str()))
    }
}

/// A user's choice from a candidate list, validated as a usable order id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionKey(String);

impl SelectionKey {
    pub fn parse(raw: &str) -> Result<Self, LookupError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with(UNSELECTABLE_PREFIX) {
            return Err(LookupError::UnavailableOrderId);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
