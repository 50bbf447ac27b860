//! Turns the order backend's loosely shaped payloads into [`OrderSet`]s.
//!
//! The backend answers the same endpoint with a bare list, a single order
//! object, or an object wrapping the list under `orders` or `data`. The shape
//! is classified once into [`PayloadShape`] and every element is mapped by
//! [`order_from_object`], which applies the display fallbacks.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::order::{Order, OrderId, OrderSet, OrderStatus, Package};
use crate::errors::PresentError;

pub const ID_FIELD: &str = "internal_id";

pub const STATUS_FALLBACK: &str = "Status desconhecido";
pub const CLIENT_FALLBACK: &str = "Cliente não identificado";
pub const EMAIL_FALLBACK: &str = "E-mail não disponível";
pub const PRICE_FALLBACK: &str = "0";
pub const GATEWAY_FALLBACK: &str = "Método não especificado";
pub const PACKAGE_NAME_FALLBACK: &str = "Pacote sem nome";
pub const PACKAGE_TYPE_FALLBACK: &str = "Tipo não especificado";

/// Which of the known payload layouts a response uses. Evaluated in
/// declaration order, first match wins.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PayloadShape<'a> {
    List(&'a [Value]),
    SingleOrder(&'a Map<String, Value>),
    OrdersField(&'a [Value]),
    DataField(&'a [Value]),
    Unrecognized,
}

impl<'a> PayloadShape<'a> {
    pub fn classify(payload: &'a Value) -> Self {
        match payload {
            Value::Array(items) => Self::List(items),
            Value::Object(map) if has_identifier(map) => Self::SingleOrder(map),
            Value::Object(map) => match (map.get("orders"), map.get("data")) {
                (Some(Value::Array(items)), _) => Self::OrdersField(items),
                (_, Some(Value::Array(items))) => Self::DataField(items),
                _ => Self::Unrecognized,
            },
            _ => Self::Unrecognized,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::SingleOrder(_) => "single_order",
            Self::OrdersField(_) => "orders_field",
            Self::DataField(_) => "data_field",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// Non-fatal findings surfaced to operators. A payload that produced
/// diagnostics is still a valid (possibly empty) result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeDiagnostic {
    UnrecognizedShape { top_level: &'static str, keys: Vec<String> },
    NonObjectElements { skipped: usize },
}

impl ShapeDiagnostic {
    pub fn describe(&self) -> String {
        match self {
            Self::UnrecognizedShape { top_level, keys } if keys.is_empty() => {
                format!("unrecognized {top_level} payload")
            }
            Self::UnrecognizedShape { top_level, keys } => {
                format!("unrecognized {top_level} payload with keys [{}]", keys.join(", "))
            }
            Self::NonObjectElements { skipped } => {
                format!("skipped {skipped} list element(s) that were not objects")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Normalized {
    pub orders: OrderSet,
    pub shape: &'static str,
    pub diagnostics: Vec<ShapeDiagnostic>,
}

impl Normalized {
    pub fn is_shape_mismatch(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| matches!(diagnostic, ShapeDiagnostic::UnrecognizedShape { .. }))
    }
}

/// Normalizes any JSON payload. Never fails: shapes it cannot interpret
/// yield an empty set plus a diagnostic.
pub fn normalize(payload: &Value) -> Normalized {
    let shape = PayloadShape::classify(payload);
    let mut diagnostics = Vec::new();

    let orders = match shape {
        PayloadShape::SingleOrder(map) => vec![order_from_object(map)],
        PayloadShape::List(items)
        | PayloadShape::OrdersField(items)
        | PayloadShape::DataField(items) => {
            let orders: Vec<Order> =
                items.iter().filter_map(Value::as_object).map(order_from_object).collect();
            let skipped = items.len() - orders.len();
            if skipped > 0 {
                diagnostics.push(ShapeDiagnostic::NonObjectElements { skipped });
            }
            orders
        }
        PayloadShape::Unrecognized => {
            diagnostics.push(ShapeDiagnostic::UnrecognizedShape {
                top_level: json_type(payload),
                keys: payload
                    .as_object()
                    .map(|map| map.keys().cloned().collect())
                    .unwrap_or_default(),
            });
            Vec::new()
        }
    };

    Normalized { orders: OrderSet::new(orders), shape: shape.name(), diagnostics }
}

/// Interprets the response of a by-id fetch. Wrapped payloads resolve to
/// their first element; any other object is taken as the order itself.
pub fn order_from_payload(payload: &Value) -> Result<Order, PresentError> {
    match PayloadShape::classify(payload) {
        PayloadShape::SingleOrder(map) => Ok(order_from_object(map)),
        PayloadShape::Unrecognized => match payload {
            Value::Object(map) if !map.is_empty() => Ok(order_from_object(map)),
            other => Err(PresentError::Malformed(format!(
                "resposta do tipo {} sem pedido",
                json_type(other)
            ))),
        },
        _ => normalize(payload)
            .orders
            .into_vec()
            .into_iter()
            .next()
            .ok_or_else(|| PresentError::Malformed("resposta sem pedidos".to_owned())),
    }
}

pub fn order_from_object(map: &Map<String, Value>) -> Order {
    let status_raw = text_field(map, "status");
    let status = status_raw.as_deref().map(OrderStatus::parse).unwrap_or(OrderStatus::Unknown);

    let status_display = text_field(map, "status_display")
        .or(status_raw)
        .unwrap_or_else(|| STATUS_FALLBACK.to_owned());

    let id = text_field(map, ID_FIELD)
        .map(|raw| OrderId::parse(&raw))
        .unwrap_or(OrderId::Unavailable);

    let packages = match map.get("packages") {
        Some(Value::Array(items)) => {
            items.iter().filter_map(Value::as_object).map(package_from_object).collect()
        }
        _ => Vec::new(),
    };

    Order {
        id,
        status,
        status_display,
        client_name: text_field(map, "client_name").unwrap_or_else(|| CLIENT_FALLBACK.to_owned()),
        client_email: text_field(map, "client_email")
            .unwrap_or_else(|| EMAIL_FALLBACK.to_owned()),
        price_display: price_text(map),
        gateway_display: text_field(map, "gateway_display")
            .or_else(|| text_field(map, "gateway"))
            .unwrap_or_else(|| GATEWAY_FALLBACK.to_owned()),
        created_at: map.get("created_at").and_then(parse_timestamp),
        packages,
    }
}

fn package_from_object(map: &Map<String, Value>) -> Package {
    Package {
        name: text_field(map, "name").unwrap_or_else(|| PACKAGE_NAME_FALLBACK.to_owned()),
        kind: map.get("meta").and_then(Value::as_object).and_then(|meta| text_field(meta, "type")),
        price_display: price_text(map),
    }
}

fn has_identifier(map: &Map<String, Value>) -> bool {
    text_field(map, ID_FIELD).is_some()
}

/// Non-empty strings verbatim, numbers as their decimal text.
fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn price_text(map: &Map<String, Value>) -> String {
    if let Some(display) = text_field(map, "price_display") {
        return display;
    }

    match map.get("price") {
        Some(Value::Number(number)) => format_number(&number.to_string()),
        Some(Value::String(text)) if !text.trim().is_empty() => format_number(text.trim()),
        _ => PRICE_FALLBACK.to_owned(),
    }
}

fn format_number(raw: &str) -> String {
    match Decimal::from_str(raw) {
        Ok(value) if value.is_zero() => PRICE_FALLBACK.to_owned(),
        Ok(value) => value.normalize().to_string(),
        Err(_) => raw.to_owned(),
    }
}

pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => {
            let raw = raw.trim();
            if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
                return Some(parsed.with_timezone(&Utc));
            }
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                .map(|naive| naive.and_utc())
        }
        Value::Number(number) => number.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
