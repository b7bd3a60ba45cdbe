//! Order lifecycle state machine
//!
//! ```text
//! PENDING ──pay──▶ PAID
//!    │
//!    └──cancel──▶ CANCELLED
//! ```
//!
//! `PAID` and `CANCELLED` are terminal. The backend is the only place a
//! transition is decided; terminals only learn the outcome.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Submitted, awaiting payment or cancellation
    #[default]
    Pending,
    Paid,
    Cancelled,
}

impl OrderStatus {
    /// Terminal states never transition again
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Cancelled)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Apply a user action, as the arbiter does
    pub fn apply(self, action: OrderAction) -> Transition {
        if self.is_terminal() {
            return Transition::AlreadyFinal(self);
        }
        Transition::Applied {
            from: self,
            to: action.target(),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing an order status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(OrderStatus::Pending),
            "PAID" => Ok(OrderStatus::Paid),
            "CANCELLED" | "CANCELED" => Ok(OrderStatus::Cancelled),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// User-initiated lifecycle action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderAction {
    Pay,
    Cancel,
}

impl OrderAction {
    /// Status reached when this action wins
    pub const fn target(&self) -> OrderStatus {
        match self {
            OrderAction::Pay => OrderStatus::Paid,
            OrderAction::Cancel => OrderStatus::Cancelled,
        }
    }
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderAction::Pay => write!(f, "pay"),
            OrderAction::Cancel => write!(f, "cancel"),
        }
    }
}

/// Outcome of applying an action to a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied { from: OrderStatus, to: OrderStatus },
    /// The order was already decided; the action is a no-op
    AlreadyFinal(OrderStatus),
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied { .. })
    }

    /// Status after the transition (or the unchanged terminal status)
    pub fn status(&self) -> OrderStatus {
        match self {
            Transition::Applied { to, .. } => *to,
            Transition::AlreadyFinal(status) => *status,
        }
    }
}
