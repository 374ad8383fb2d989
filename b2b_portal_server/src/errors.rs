use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use b2b_credit_engine::{CreditApiError, CreditGatewayError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient credit. {0}")]
    InsufficientCredit(String),
    #[error("The ledger is busy. Retry shortly. {0}")]
    TransientConflict(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientCredit(_) => StatusCode::CONFLICT,
            Self::TransientConflict(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<CreditApiError> for ServerError {
    fn from(e: CreditApiError) -> Self {
        match e {
            CreditApiError::CompanyNotFound(_) | CreditApiError::UserNotFound(_) => Self::NoRecordFound(e.to_string()),
            CreditApiError::OrderDoesNotExist(_) => Self::NoRecordFound(e.to_string()),
            CreditApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
        }
    }
}

impl From<CreditGatewayError> for ServerError {
    fn from(e: CreditGatewayError) -> Self {
        match e {
            CreditGatewayError::LedgerWriteConflict(msg) => Self::TransientConflict(msg),
            CreditGatewayError::InsufficientCredit { message, .. } => Self::InsufficientCredit(message),
            CreditGatewayError::OrderNotFound(_)
            | CreditGatewayError::CompanyNotFound(_)
            | CreditGatewayError::UserNotFound(_) => Self::NoRecordFound(e.to_string()),
            CreditGatewayError::MalformedEvent(msg) => Self::InvalidRequestBody(msg),
            CreditGatewayError::AccountError(e) => e.into(),
            CreditGatewayError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
        }
    }
}
