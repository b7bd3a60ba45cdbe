//! Error types raised by the pure domain components

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Domain error with structured error code and details
///
/// Raised by the quantity resolver and the cart before any request is
/// issued, so it never carries transport information.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (field-level errors, context, etc.)
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    // ==================== Convenience constructors ====================

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create an invalid quantity error
    pub fn invalid_quantity(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidQuantity, msg)
    }

    /// Create an empty cart error
    pub fn empty_cart() -> Self {
        Self::new(ErrorCode::CartEmpty)
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{} not found", r))
            .with_detail("resource", r)
    }

    /// Whether this error is one of the validation-class codes that block a
    /// cart mutation
    pub fn is_validation(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ValidationFailed
                | ErrorCode::InvalidQuantity
                | ErrorCode::InvalidFormat
                | ErrorCode::ProductInvalidPrice
                | ErrorCode::ProductInactive
                | ErrorCode::InvalidBarcode
        )
    }
}

/// Result type for domain operations
pub type AppResult<T> = Result<T, AppError>;

/// Error body returned by the order and catalog services
///
/// The services answer failures with `{"detail": "..."}`; older gateways use
/// `message` or `error` instead. `detail` may also be a structured list of
/// field errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceErrorBody {
    /// Extract the human-readable message, verbatim
    pub fn into_message(self) -> Option<String> {
        match self.detail {
            Some(Value::String(s)) => return Some(s),
            Some(Value::Null) | None => {}
            Some(other) => return Some(other.to_string()),
        }
        self.message.or(self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_default_message() {
        let err = AppError::new(ErrorCode::CartEmpty);
        assert_eq!(err.message, "Cart is empty");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_not_found_carries_resource() {
        let err = AppError::not_found("Product");
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.to_string(), "Product not found");
        let details = err.details.unwrap();
        assert_eq!(details.get("resource"), Some(&Value::from("Product")));
    }

    #[test]
    fn test_is_validation() {
        assert!(AppError::invalid_quantity("bad").is_validation());
        assert!(AppError::validation("bad").is_validation());
        assert!(!AppError::empty_cart().is_validation());
    }

    #[test]
    fn test_service_error_body_detail_string() {
        let body: ServiceErrorBody =
            serde_json::from_str(r#"{"detail":"Order is already PAID"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Order is already PAID"));
    }

    #[test]
    fn test_service_error_body_structured_detail() {
        let body: ServiceErrorBody =
            serde_json::from_str(r#"{"detail":[{"loc":["body","items"],"msg":"too short"}]}"#)
                .unwrap();
        let message = body.into_message().unwrap();
        assert!(message.contains("too short"));
    }

    #[test]
    fn test_service_error_body_fallbacks() {
        let body: ServiceErrorBody = serde_json::from_str(r#"{"message":"nope"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("nope"));

        let body: ServiceErrorBody = serde_json::from_str(r#"{}"#).unwrap();
        assert!(body.into_message().is_none());
    }
}
