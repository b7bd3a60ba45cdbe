//! Client error types

use shared::error::{AppError, ErrorCode};
use shared::order::OrderStatus;
use thiserror::Error;
use uuid::Uuid;

/// Client error type
///
/// Every failure a terminal can observe, from local validation up to the
/// order service's verdict. None of them is fatal to the terminal.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Submission attempted with nothing in the cart
    #[error("Cart is empty")]
    EmptyCart,

    /// Input rejected before any request was issued
    #[error("{0}")]
    Validation(AppError),

    /// Resource not found (barcode miss, unknown order)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Pay/cancel on an order that is no longer pending
    #[error("{message}")]
    Conflict {
        order_id: Uuid,
        status: OrderStatus,
        message: String,
    },

    /// Connect, timeout or transport failure; never retried automatically
    #[error("Network error: {0}")]
    TransientNetwork(String),

    /// Request refused by the server, message kept verbatim
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A submission from this terminal is still awaiting its response
    #[error("An order submission is already in progress")]
    SubmissionInFlight,
}

impl ClientError {
    /// Stable error code for display and logging
    pub fn code(&self) -> ErrorCode {
        match self {
            ClientError::EmptyCart => ErrorCode::CartEmpty,
            ClientError::Validation(e) => e.code,
            ClientError::NotFound(_) => ErrorCode::NotFound,
            ClientError::Conflict { .. } => ErrorCode::OrderNotPending,
            ClientError::TransientNetwork(_) => ErrorCode::NetworkError,
            ClientError::Rejected { .. } => ErrorCode::OrderRejected,
            ClientError::InvalidResponse(_) => ErrorCode::InvalidResponse,
            ClientError::SubmissionInFlight => ErrorCode::SubmissionInFlight,
        }
    }

    /// Only transport failures may succeed if the user tries again unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::TransientNetwork(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}

impl From<AppError> for ClientError {
    fn from(err: AppError) -> Self {
        match err.code {
            ErrorCode::CartEmpty => ClientError::EmptyCart,
            _ => ClientError::Validation(err),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::InvalidResponse(err.to_string())
        } else {
            ClientError::TransientNetwork(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::InvalidResponse(err.to_string())
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_conversion() {
        let err: ClientError = AppError::empty_cart().into();
        assert!(matches!(err, ClientError::EmptyCart));
        assert_eq!(err.code(), ErrorCode::CartEmpty);

        let err: ClientError = AppError::invalid_quantity("Weight must be greater than zero").into();
        assert_eq!(err.code(), ErrorCode::InvalidQuantity);
        assert_eq!(err.to_string(), "Weight must be greater than zero");
    }

    #[test]
    fn test_only_network_errors_are_retryable() {
        assert!(ClientError::TransientNetwork("timeout".into()).is_retryable());
        assert!(!ClientError::EmptyCart.is_retryable());
        assert!(
            !ClientError::Rejected {
                status: 400,
                message: "Product x not found".into()
            }
            .is_retryable()
        );
        assert!(
            !ClientError::Conflict {
                order_id: Uuid::nil(),
                status: OrderStatus::Paid,
                message: "Order is already PAID".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_rejected_message_is_verbatim() {
        let err = ClientError::Rejected {
            status: 400,
            message: "Insufficient stock for Beras".into(),
        };
        assert_eq!(err.to_string(), "Insufficient stock for Beras");
    }
}
