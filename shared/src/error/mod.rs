//! Unified error system for the terminal core
//!
//! This module provides:
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`AppError`]: Domain error with codes, messages, and details
//! - [`ServiceErrorBody`]: Error payload returned by the backend services
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 5xxx: Cart errors
//! - 6xxx: Product errors
//! - 9xxx: Network and system errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::CartEmpty);
//! assert_eq!(err.code.code(), 5001);
//!
//! let err = AppError::invalid_quantity("Weight must be greater than zero")
//!     .with_detail("input", "-1");
//! assert!(err.is_validation());
//! ```

mod codes;
mod types;

pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult, ServiceErrorBody};
