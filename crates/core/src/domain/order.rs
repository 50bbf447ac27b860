use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rendered in place of an order id the backend did not provide.
pub const UNAVAILABLE_ID: &str = "ID não disponível";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OrderId {
    Known(String),
    Unavailable,
}

impl OrderId {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == UNAVAILABLE_ID {
            return Self::Unavailable;
        }
        Self::Known(trimmed.to_owned())
    }

    /// The id usable as a selection or lookup key. Never the placeholder.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Known(id) => Some(id),
            Self::Unavailable => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(id) => id,
            Self::Unavailable => UNAVAILABLE_ID,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Approved,
    Pending,
    Rejected,
    Canceled,
    Expired,
    Refunded,
    Chargedback,
    Unknown,
}

impl OrderStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "APPROVED" => Self::Approved,
            "PENDING" => Self::Pending,
            "REJECTED" => Self::Rejected,
            "CANCELED" => Self::Canceled,
            "EXPIRED" => Self::Expired,
            "REFUNDED" => Self::Refunded,
            "CHARGEDBACK" => Self::Chargedback,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Pending => "PENDING",
            Self::Rejected => "REJECTED",
            Self::Canceled => "CANCELED",
            Self::Expired => "EXPIRED",
            Self::Refunded => "REFUNDED",
            Self::Chargedback => "CHARGEDBACK",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub kind: Option<String>,
    pub price_display: String,
}

/// One purchase record, with every display fallback already applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub status_display: String,
    pub client_name: String,
    pub client_email: String,
    pub price_display: String,
    pub gateway_display: String,
    pub created_at: Option<DateTime<Utc>>,
    pub packages: Vec<Package>,
}

/// Orders from one query, in backend order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSet {
    orders: Vec<Order>,
}

impl OrderSet {
    pub fn new(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn first(&self) -> Option<&Order> {
        self.orders.first()
    }

    pub fn get(&self, position: usize) -> Option<&Order> {
        self.orders.get(position)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Order> {
        self.orders.iter()
    }

    pub fn into_vec(self) -> Vec<Order> {
        self.orders
    }
}

impl<'a> IntoIterator for &'a OrderSet {
    type Item = &'a Order;
    type IntoIter = std::slice::Iter<'a, Order>;

    fn into_iter(self) -> Self::IntoIter {
        self.orders.iter()
    }
}
