use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use thiserror::Error;
use wallet_payment_engine::{
    traits::{GatewayError, WalletApiError},
    PaymentFlowError,
    WebhookError,
};

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
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    PaymentError(#[from] PaymentFlowError),
    #[error("{0}")]
    CallbackError(#[from] WebhookError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::PaymentError(e) => match e {
                PaymentFlowError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
                PaymentFlowError::TransactionBlocked => StatusCode::FORBIDDEN,
                PaymentFlowError::TooManyPending => StatusCode::TOO_MANY_REQUESTS,
                PaymentFlowError::PaymentInProgress => StatusCode::CONFLICT,
                PaymentFlowError::Gateway(g) => match g {
                    GatewayError::Unavailable(_) | GatewayError::Network(_) => StatusCode::BAD_GATEWAY,
                    GatewayError::Rejected(_) | GatewayError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
                },
                PaymentFlowError::DatabaseError(_) | PaymentFlowError::LockError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                },
                PaymentFlowError::WalletError(w) => match w {
                    WalletApiError::WalletNotFound(_) => StatusCode::NOT_FOUND,
                    WalletApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                },
            },
            Self::CallbackError(e) => match e {
                WebhookError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
                WebhookError::InvalidSignature(_) => StatusCode::UNAUTHORIZED,
                WebhookError::UnknownTransaction(_) => StatusCode::NOT_FOUND,
                WebhookError::UnsupportedStatus(_) => StatusCode::BAD_REQUEST,
                WebhookError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
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
