use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::LookupError;

pub mod http;

pub use http::{ClientBuildError, HttpOrderApiClient};

pub type RawPayload = Value;

pub const UNKNOWN_API_ERROR: &str = "Erro desconhecido na API";

/// The three order backend queries. Implementations return the decoded body
/// of a successful response; transport failures, non-success statuses and
/// bodies carrying `errors` come back as [`LookupError`].
#[async_trait]
pub trait OrderApi: Send + Sync {
    async fn fetch_by_email(&self, email: &str) -> Result<RawPayload, LookupError>;

    async fn fetch_by_external_id(&self, external_id: &str) -> Result<RawPayload, LookupError>;

    async fn fetch_by_id(&self, order_id: &str) -> Result<RawPayload, LookupError>;
}

#[async_trait]
impl<T> OrderApi for Arc<T>
where
    T: OrderApi + ?Sized,
{
    async fn fetch_by_email(&self, email: &str) -> Result<RawPayload, LookupError> {
        (**self).fetch_by_email(email).await
    }

    async fn fetch_by_external_id(&self, external_id: &str) -> Result<RawPayload, LookupError> {
        (**self).fetch_by_external_id(external_id).await
    }

    async fn fetch_by_id(&self, order_id: &str) -> Result<RawPayload, LookupError> {
        (**self).fetch_by_id(order_id).await
    }
}

/// A 2xx body can still report failure through an `errors` key. Only a
/// truthy value counts: `0`, `""`, `false` and `null` mean no errors.
pub fn check_logical_errors(payload: &RawPayload) -> Result<(), LookupError> {
    let Some(errors) = payload.as_object().and_then(|map| map.get("errors")) else {
        return Ok(());
    };
    if !is_truthy(errors) {
        return Ok(());
    }

    let message = match errors {
        Value::Array(items) => items.first().and_then(error_message),
        other => error_message(other),
    };

    Err(LookupError::Api(message.unwrap_or_else(|| UNKNOWN_API_ERROR.to_owned())))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn error_message(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.as_str(),
        Value::Object(map) => map.get("message").and_then(Value::as_str)?,
        _ => return None,
    };
    (!text.trim().is_empty()).then(|| text.to_owned())
}
