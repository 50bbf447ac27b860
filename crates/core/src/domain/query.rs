use serde::{Deserialize, Serialize};

use crate::errors::LookupError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKey {
    Email,
    ExternalId,
}

impl LookupKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::ExternalId => "external_id",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Email => "e-mail",
            Self::ExternalId => "ID de usuário",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "key", content = "value", rename_all = "snake_case")]
pub enum Query {
    ByEmail(String),
    ByExternalId(String),
}

impl Query {
    /// Builds the query from the two optional form inputs. Email wins when
    /// both are filled; both blank is a user input error.
    pub fn from_inputs(
        email: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<Self, LookupError> {
        let email = email.map(str::trim).filter(|value| !value.is_empty());
        let external_id = external_id.map(str::trim).filter(|value| !value.is_empty());

        match (email, external_id) {
            (Some(email), _) => Ok(Self::ByEmail(email.to_owned())),
            (None, Some(external_id)) => Ok(Self::ByExternalId(external_id.to_owned())),
            (None, None) => Err(LookupError::UserInput),
        }
    }

    pub fn key(&self) -> LookupKey {
        match self {
            Self::ByEmail(_) => LookupKey::Email,
            Self::ByExternalId(_) => LookupKey::ExternalId,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::ByEmail(value) | Self::ByExternalId(value) => value,
        }
    }

    /// `e-mail someone@example.com`
    pub fn describe(&self) -> String {
        format!("{} {}", self.key().label(), self.value())
    }

    /// `e-mail: someone@example.com`
    pub fn describe_labeled(&self) -> String {
        format!("{}: {}", self.key().label(), self.value())
    }
}

/// Raw lookup inputs as submitted by the user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryInput {
    pub email: Option<String>,
    pub external_id: Option<String>,
}

impl QueryInput {
    pub fn email(email: impl Into<String>) -> Self {
        Self { email: Some(email.into()), external_id: None }
    }

    pub fn external_id(external_id: impl Into<String>) -> Self {
        Self { email: None, external_id: Some(external_id.into()) }
    }

    pub fn to_query(&self) -> Result<Query, LookupError> {
        Query::from_inputs(self.email.as_deref(), self.external_id.as_deref())
    }
}
