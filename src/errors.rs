use serde::Serialize;

use crate::models::EmployeeId;

/// Coarse classification of a [`ServiceError`], for callers that only need to
/// decide how to present the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    InvalidState,
    Authorization,
    Transport,
    NotFound,
    Serialization,
}

#[derive(Debug, Clone, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Several employees were selected and none of them could be elevated to
    /// main representative without asking the caller.
    #[error(
        "Validation error: choose a main representative among {candidates:?} \
         (suggested {suggested})"
    )]
    MainRepresentativeRequired {
        candidates: Vec<EmployeeId>,
        suggested: EmployeeId,
    },

    #[error("Invalid state: {0}")]
    InvalidStateError(String),

    #[error("Forbidden: {0}")]
    AuthorizationError(String),

    #[error("Transport error: {message}")]
    TransportError {
        message: String,
        status: Option<u16>,
        retryable: bool,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ServiceError::SerializationError(err.to_string());
        }
        let status = err.status().map(|s| s.as_u16());
        let retryable = err.is_timeout()
            || err.is_connect()
            || status.map(is_retryable_status).unwrap_or(false);
        ServiceError::TransportError {
            message: err.to_string(),
            status,
            retryable,
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

/// HTTP statuses worth another attempt on an idempotent request.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::ValidationError(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        ServiceError::InvalidStateError(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::AuthorizationError(message.into())
    }

    pub fn transport(message: impl Into<String>, status: Option<u16>) -> Self {
        ServiceError::TransportError {
            message: message.into(),
            retryable: status.map(is_retryable_status).unwrap_or(false),
            status,
        }
    }

    /// Returns the kind of this error.
    /// This is the single source of truth for error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError(_) | Self::MainRepresentativeRequired { .. } => {
                ErrorKind::Validation
            }
            Self::InvalidStateError(_) => ErrorKind::InvalidState,
            Self::AuthorizationError(_) => ErrorKind::Authorization,
            Self::TransportError { .. } => ErrorKind::Transport,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::SerializationError(_) => ErrorKind::Serialization,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportError { retryable: true, .. })
    }

    /// Returns the message suitable for showing to the acting user.
    /// Transport and decoding failures get generic wording so server
    /// internals are not echoed back.
    pub fn user_message(&self) -> String {
        match self {
            Self::ValidationError(msg)
            | Self::InvalidStateError(msg)
            | Self::AuthorizationError(msg) => msg.clone(),
            Self::MainRepresentativeRequired { .. } => {
                "Several employees are selected; choose which one is the main representative"
                    .to_string()
            }
            Self::NotFound(msg) => format!("{} could not be found", msg),
            Self::TransportError {
                status: Some(401) | Some(403),
                ..
            } => "Your session is not authorized for this action; sign in again".to_string(),
            Self::TransportError { .. } => {
                "The shop service could not be reached; try again shortly".to_string()
            }
            Self::SerializationError(_) => {
                "The shop service sent an unexpected response".to_string()
            }
        }
    }
}

pub type WorkflowResult<T> = Result<T, ServiceError>;
