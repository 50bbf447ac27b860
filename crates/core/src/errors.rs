use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of lookup failures, as surfaced to operators and
/// the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Api,
    Shape,
    UserInput,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network_error",
            Self::Api => "api_error",
            Self::Shape => "shape_error",
            Self::UserInput => "user_input_error",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("Por favor, forneça um e-mail ou um ID de usuário válido.")]
    UserInput,
    #[error("O pedido selecionado não possui um ID disponível.")]
    UnavailableOrderId,
    #[error("{}", network_message(.status, .reason))]
    Network { status: Option<u16>, reason: String },
    #[error("Resposta inválida da API: {0}")]
    InvalidBody(String),
    #[error("{0}")]
    Api(String),
}

impl LookupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserInput | Self::UnavailableOrderId => ErrorKind::UserInput,
            Self::Network { .. } | Self::InvalidBody(_) => ErrorKind::Network,
            Self::Api(_) => ErrorKind::Api,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network { status, .. } => *status,
            _ => None,
        }
    }
}

fn network_message(status: &Option<u16>, reason: &str) -> String {
    match status {
        Some(code) => format!("Erro na API: {code} - {reason}"),
        None => format!("Falha de comunicação com a API: {reason}"),
    }
}

/// An order was found but could not be turned into something displayable.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PresentError {
    #[error("pedido em formato inválido ({0})")]
    Malformed(String),
    #[error("o título tem {len} caracteres (limite {limit})")]
    TitleTooLong { len: usize, limit: usize },
    #[error("a descrição tem {len} caracteres (limite {limit})")]
    DescriptionTooLong { len: usize, limit: usize },
    #[error("{count} pedidos excedem o limite de {limit} opções")]
    TooManyCandidates { count: usize, limit: usize },
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, LookupError, PresentError};

    #[test]
    fn network_error_carries_status_and_reason_phrase() {
        let error = LookupError::Network { status: Some(404), reason: "Not Found".to_owned() };

        assert_eq!(error.to_string(), "Erro na API: 404 - Not Found");
        assert_eq!(error.kind(), ErrorKind::Network);
        assert_eq!(error.status(), Some(404));
    }

    #[test]
    fn transport_failure_without_status_is_still_network_class() {
        let error = LookupError::Network { status: None, reason: "connection refused".to_owned() };

        assert!(error.to_string().contains("connection refused"));
        assert_eq!(error.kind(), ErrorKind::Network);
    }

    #[test]
    fn api_error_is_reported_verbatim() {
        let error = LookupError::Api("invalid token".to_owned());
        assert_eq!(error.to_string(), "invalid token");
        assert_eq!(error.kind(), ErrorKind::Api);
    }

    #[test]
    fn invalid_body_is_network_class() {
        assert_eq!(LookupError::InvalidBody("eof".to_owned()).kind(), ErrorKind::Network);
    }

    #[test]
    fn user_input_errors_share_a_kind() {
        assert_eq!(LookupError::UserInput.kind(), ErrorKind::UserInput);
        assert_eq!(LookupError::UnavailableOrderId.kind(), ErrorKind::UserInput);
        assert_eq!(ErrorKind::UserInput.as_str(), "user_input_error");
    }

    #[test]
    fn present_errors_describe_the_limit() {
        let error = PresentError::DescriptionTooLong { len: 3200, limit: 3000 };
        assert_eq!(error.to_string(), "a descrição tem 3200 caracteres (limite 3000)");
    }
}
