//! Unified error codes for the terminal core
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 5xxx: Cart errors
//! - 6xxx: Product errors
//! - 9xxx: Network and system errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility with the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid format
    InvalidFormat = 6,

    // ==================== 4xxx: Order ====================
    /// Order is no longer pending (paid or cancelled elsewhere)
    OrderNotPending = 4002,
    /// Order was rejected by the order service
    OrderRejected = 4003,
    /// A submission is already in flight for this terminal
    SubmissionInFlight = 4004,

    // ==================== 5xxx: Cart ====================
    /// Cart is empty
    CartEmpty = 5001,
    /// Quantity is not a positive number
    InvalidQuantity = 5002,
    /// Line item not found in cart
    CartItemNotFound = 5003,

    // ==================== 6xxx: Product ====================
    /// Product has invalid price
    ProductInvalidPrice = 6002,
    /// Product is not available for sale
    ProductInactive = 6003,
    /// Barcode is malformed
    InvalidBarcode = 6004,

    // ==================== 9xxx: Network / System ====================
    /// Network failure talking to a service
    NetworkError = 9001,
    /// Service returned a response that could not be decoded
    InvalidResponse = 9002,
    /// Push channel is unavailable
    ChannelUnavailable = 9003,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidFormat => "Invalid format",

            // Order
            ErrorCode::OrderNotPending => "Order is no longer pending",
            ErrorCode::OrderRejected => "Order service rejected the request",
            ErrorCode::SubmissionInFlight => "An order submission is already in progress",

            // Cart
            ErrorCode::CartEmpty => "Cart is empty",
            ErrorCode::InvalidQuantity => "Quantity must be a positive number",
            ErrorCode::CartItemNotFound => "Item is not in the cart",

            // Product
            ErrorCode::ProductInvalidPrice => "Product has an invalid price",
            ErrorCode::ProductInactive => "Product is not available",
            ErrorCode::InvalidBarcode => "Barcode is invalid",

            // Network / System
            ErrorCode::NetworkError => "Network error, please retry",
            ErrorCode::InvalidResponse => "Invalid response from server",
            ErrorCode::ChannelUnavailable => "Realtime channel is unavailable",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            6 => Ok(ErrorCode::InvalidFormat),

            // Order
            4002 => Ok(ErrorCode::OrderNotPending),
            4003 => Ok(ErrorCode::OrderRejected),
            4004 => Ok(ErrorCode::SubmissionInFlight),

            // Cart
            5001 => Ok(ErrorCode::CartEmpty),
            5002 => Ok(ErrorCode::InvalidQuantity),
            5003 => Ok(ErrorCode::CartItemNotFound),

            // Product
            6002 => Ok(ErrorCode::ProductInvalidPrice),
            6003 => Ok(ErrorCode::ProductInactive),
            6004 => Ok(ErrorCode::InvalidBarcode),

            // Network / System
            9001 => Ok(ErrorCode::NetworkError),
            9002 => Ok(ErrorCode::InvalidResponse),
            9003 => Ok(ErrorCode::ChannelUnavailable),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
