use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use pi_market_engine::{
    traits::{ChainVerifierError, LedgerError, PlatformApiError},
    CheckoutError,
    ReconciliationError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("User needs to sign in first")]
    Unauthenticated,
    #[error("The caller may not act on this resource. {0}")]
    Forbidden(String),
    #[error("Webhook signature invalid or not provided")]
    InvalidSignature,
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the recorded state. {0}")]
    Conflict(String),
    #[error("Payment verification failed. {0}")]
    PaymentMismatch(String),
    #[error("Stock cannot honor a settled payment. {0}")]
    StockExhausted(String),
    #[error("An upstream service did not answer in time. {0}")]
    UpstreamTimeout(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InvalidSignature => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentMismatch(_) => StatusCode::CONFLICT,
            Self::StockExhausted(_) => StatusCode::CONFLICT,
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<ReconciliationError> for ServerError {
    fn from(e: ReconciliationError) -> Self {
        match e {
            ReconciliationError::Ledger(le) => le.into(),
            ReconciliationError::Platform(pe) => pe.into(),
            ReconciliationError::Chain(ce) => ce.into(),
            ReconciliationError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            ReconciliationError::PaymentMismatch { .. } => Self::PaymentMismatch(e.to_string()),
            ReconciliationError::TxidConflict { .. } |
            ReconciliationError::OrderCancelled(_) |
            ReconciliationError::CancelAfterSettlement(_) |
            ReconciliationError::AmountMismatch { .. } => Self::Conflict(e.to_string()),
            ReconciliationError::ForeignOrder(_) => Self::Forbidden(e.to_string()),
            ReconciliationError::InvalidMetadata(_) => Self::InvalidRequestBody(e.to_string()),
        }
    }
}

impl From<LedgerError> for ServerError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::StockExhausted { .. } => {
                // Funds already settled on-chain. The process keeps running; this order needs an operator.
                error!("🚨️ Reconciliation failure requiring manual intervention: {e}");
                Self::StockExhausted(e.to_string())
            },
            LedgerError::OrderNotFound(_) | LedgerError::ProductNotFound(_) => Self::NoRecordFound(e.to_string()),
            LedgerError::StatusConflict { .. } |
            LedgerError::PaymentIdAlreadySet(_) |
            LedgerError::OrderAlreadyExists(_) => Self::Conflict(e.to_string()),
            LedgerError::DatabaseError(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<PlatformApiError> for ServerError {
    fn from(e: PlatformApiError) -> Self {
        match e {
            PlatformApiError::Timeout(_) => Self::UpstreamTimeout(e.to_string()),
            PlatformApiError::PaymentNotFound(_) => Self::NoRecordFound(e.to_string()),
            _ => Self::BackendError(e.to_string()),
        }
    }
}

impl From<ChainVerifierError> for ServerError {
    fn from(e: ChainVerifierError) -> Self {
        match e {
            ChainVerifierError::Timeout(_) => Self::UpstreamTimeout(e.to_string()),
            ChainVerifierError::InvalidUrl(_) => Self::InvalidRequestBody(e.to_string()),
            _ => Self::BackendError(e.to_string()),
        }
    }
}

impl From<CheckoutError> for ServerError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::EmptyCart(_) | CheckoutError::OutOfStock { .. } => Self::InvalidRequestBody(e.to_string()),
            CheckoutError::ProductNotFound(_) => Self::NoRecordFound(e.to_string()),
            CheckoutError::Ledger(le) => le.into(),
        }
    }
}
