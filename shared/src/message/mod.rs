//! Push channel message types
//!
//! Order mutations are broadcast by the backend as row-change events:
//!
//! ```json
//! {"event": "INSERT", "table": "orders",
//!  "new": {"id": "…", "daily_id": 7, "total_amount": 35000, "status": "PENDING",
//!          "created_at": "2025-01-14T09:00:00Z"}}
//! ```
//!
//! On a byte stream every event travels as one frame: a 4-byte little-endian
//! payload length followed by the JSON payload.

use crate::models::OrderSummary;
use crate::order::{OrderStatus, format_short_id, invoice_id_for};
use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Table the order events are published for
pub const ORDERS_TABLE: &str = "orders";

/// Upper bound for a single frame payload (1 MiB)
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Length prefix size in bytes
pub const FRAME_HEADER_LEN: usize = 4;

/// Row change kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Insert => write!(f, "INSERT"),
            ChangeKind::Update => write!(f, "UPDATE"),
            ChangeKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// Order row carried by a change event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: Uuid,
    #[serde(default)]
    pub daily_id: u32,
    #[serde(default)]
    pub total_amount: Decimal,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
}

impl OrderRecord {
    /// Project the row into a queue entry.
    ///
    /// Identifiers the row omits are synthesized with the server's rule.
    /// `received_at` stands in for a missing `created_at`.
    pub fn to_summary(&self, offset: FixedOffset, received_at: DateTime<Utc>) -> OrderSummary {
        let created_at = self.created_at.unwrap_or(received_at);
        OrderSummary {
            id: self.id,
            daily_id: self.daily_id,
            short_id: self
                .short_id
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format_short_id(self.daily_id)),
            invoice_id: self
                .invoice_id
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| invoice_id_for(self.daily_id, created_at, offset)),
            total_amount: self.total_amount,
            status: self.status,
            item_count: 0,
            created_at,
        }
    }
}

/// Primary key of a deleted row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordKey {
    pub id: Uuid,
}

/// Row change event published on the push channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(alias = "eventType")]
    pub event: ChangeKind,
    pub table: String,
    /// Row after the change; absent (or `{}`) for deletes
    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub new: Option<OrderRecord>,
    /// Key of the row before the change, sent for deletes
    #[serde(
        default,
        deserialize_with = "non_empty",
        skip_serializing_if = "Option::is_none"
    )]
    pub old: Option<RecordKey>,
}

impl ChangeEvent {
    pub fn insert(record: OrderRecord) -> Self {
        Self {
            event: ChangeKind::Insert,
            table: ORDERS_TABLE.to_string(),
            new: Some(record),
            old: None,
        }
    }

    pub fn update(record: OrderRecord) -> Self {
        Self {
            event: ChangeKind::Update,
            table: ORDERS_TABLE.to_string(),
            new: Some(record),
            old: None,
        }
    }

    pub fn delete(id: Uuid) -> Self {
        Self {
            event: ChangeKind::Delete,
            table: ORDERS_TABLE.to_string(),
            new: None,
            old: Some(RecordKey { id }),
        }
    }

    pub fn is_orders(&self) -> bool {
        self.table == ORDERS_TABLE
    }

    /// Id of the affected order, from whichever row image is present
    pub fn order_id(&self) -> Option<Uuid> {
        self.new
            .as_ref()
            .map(|r| r.id)
            .or_else(|| self.old.map(|k| k.id))
    }

    /// Encode into a length-prefixed frame
    pub fn to_frame(&self) -> Result<Vec<u8>, FrameError> {
        encode_frame(self)
    }
}

/// Treat `null` and `{}` as absent
fn non_empty<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(v) => serde_json::from_value(v)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Frame encode/decode errors
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame too large: {0} bytes")]
    TooLarge(usize),

    #[error("incomplete frame: expected {expected} bytes, got {actual}")]
    Incomplete { expected: usize, actual: usize },

    #[error("invalid frame payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize a value into `len (u32 LE) ++ json`
pub fn encode_frame<T: Serialize>(value: &T) -> Result<Vec<u8>, FrameError> {
    let payload = serde_json::to_vec(value)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(payload.len()));
    }
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::TooLarge(payload.len()))?;

    let mut data = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    data.extend_from_slice(&len.to_le_bytes());
    data.extend_from_slice(&payload);
    Ok(data)
}

/// Read the payload length from a frame header
pub fn frame_len(header: [u8; FRAME_HEADER_LEN]) -> Result<usize, FrameError> {
    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len));
    }
    Ok(len)
}

/// Decode one complete frame
pub fn decode_frame<T: DeserializeOwned>(frame: &[u8]) -> Result<T, FrameError> {
    if frame.len() < FRAME_HEADER_LEN {
        return Err(FrameError::Incomplete {
            expected: FRAME_HEADER_LEN,
            actual: frame.len(),
        });
    }
    let mut header = [0u8; FRAME_HEADER_LEN];
    header.copy_from_slice(&frame[..FRAME_HEADER_LEN]);
    let len = frame_len(header)?;

    let payload = &frame[FRAME_HEADER_LEN..];
    if payload.len() != len {
        return Err(FrameError::Incomplete {
            expected: len,
            actual: payload.len(),
        });
    }
    Ok(serde_json::from_slice(payload)?)
}
