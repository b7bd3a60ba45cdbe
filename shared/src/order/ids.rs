//! Human-facing order identifiers
//!
//! Both identifiers derive from the server-assigned daily sequence number:
//! - short id: `#` + sequence zero-padded to 3 digits (`#007`)
//! - invoice id: `INV-YYYYMMDD-` + padded sequence, dated by the store's
//!   calendar day of creation (`INV-20250114-007`)

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Format the short id shown on the queue (`#001`)
pub fn format_short_id(daily_id: u32) -> String {
    format!("#{:03}", daily_id)
}

/// Format the invoice id for a given store calendar day
pub fn format_invoice_id(daily_id: u32, date: NaiveDate) -> String {
    format!("INV-{}-{:03}", date.format("%Y%m%d"), daily_id)
}

/// Store calendar day an order was created on
pub fn store_date(created_at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    created_at.with_timezone(&offset).date_naive()
}

/// Synthesize the invoice id from the creation timestamp
pub fn invoice_id_for(daily_id: u32, created_at: DateTime<Utc>, offset: FixedOffset) -> String {
    format_invoice_id(daily_id, store_date(created_at, offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_short_id_padding() {
        assert_eq!(format_short_id(7), "#007");
        assert_eq!(format_short_id(42), "#042");
        assert_eq!(format_short_id(1234), "#1234");
    }

    #[test]
    fn test_invoice_id() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 14).unwrap();
        assert_eq!(format_invoice_id(3, date), "INV-20250114-003");
    }

    #[test]
    fn test_invoice_uses_store_calendar_day() {
        // 17:30 UTC on the 14th is already the 15th in UTC+8
        let created_at = Utc.with_ymd_and_hms(2025, 1, 14, 17, 30, 0).unwrap();
        let wita = FixedOffset::east_opt(8 * 3600).unwrap();
        assert_eq!(invoice_id_for(12, created_at, wita), "INV-20250115-012");

        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(invoice_id_for(12, created_at, utc), "INV-20250114-012");
    }
}
