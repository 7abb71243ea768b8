// Core data structures shared by the clients and the workflow

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Wire format of window bounds
pub const WINDOW_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Seller account identifier at the order-management system
pub type SellerId = u64;

/// Half-open local-time interval `[start, end)` used to filter shipments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateWindow {
    /// Window covering the calendar day of `now`
    pub fn containing(now: NaiveDateTime) -> Self {
        Self::for_day(now.date())
    }

    /// Window covering `day`, midnight to next midnight
    pub fn for_day(day: NaiveDate) -> Self {
        let start = day.and_time(NaiveTime::default());
        let end = day
            .succ_opt()
            .map(|next| next.and_time(NaiveTime::default()))
            .unwrap_or(NaiveDateTime::MAX);
        Self { start, end }
    }

    /// Window covering today in the host's local time zone
    pub fn today() -> Self {
        Self::containing(Local::now().naive_local())
    }

    /// `start` in wire format
    pub fn start_param(&self) -> String {
        self.start.format(WINDOW_FORMAT).to_string()
    }

    /// `end` in wire format
    pub fn end_param(&self) -> String {
        self.end.format(WINDOW_FORMAT).to_string()
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant < self.end
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start_param(), self.end_param())
    }
}

/// Accept ids sent either as JSON numbers or numeric strings
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s.trim().parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Shipment as returned by the order-management API
///
/// Only the fields the workflow reads are typed; the rest is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<u64>,

    #[serde(default, deserialize_with = "lenient_id")]
    pub order_id: Option<u64>,

    #[serde(default, deserialize_with = "lenient_id")]
    pub seller_id: Option<u64>,

    /// Carrier tracking code, the barcode handed to the carrier
    #[serde(default)]
    pub track_and_trace: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ShipmentRecord {
    /// Tracking code, if present and non-blank
    pub fn tracking_code(&self) -> Option<&str> {
        self.track_and_trace
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }

    /// Short identity for log lines
    pub fn label(&self) -> String {
        match (self.id, self.order_id) {
            (Some(id), Some(order)) => format!("shipment {id} (order {order})"),
            (Some(id), None) => format!("shipment {id}"),
            (None, Some(order)) => format!("shipment of order {order}"),
            (None, None) => String::from("shipment without id"),
        }
    }
}

/// One page of a shipment listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipmentPage {
    #[serde(default)]
    pub shipments: Option<Vec<ShipmentRecord>>,

    /// Item count reported by the server for this page
    #[serde(default)]
    pub shipments_count: Option<usize>,
}

impl ShipmentPage {
    /// Items on this page
    pub fn into_shipments(self) -> Vec<ShipmentRecord> {
        self.shipments.unwrap_or_default()
    }

    /// Reported item count, falling back to the number of items received
    pub fn count(&self) -> usize {
        self.shipments_count
            .unwrap_or_else(|| self.shipments.as_ref().map_or(0, Vec::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_covers_calendar_day() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 14)
            .unwrap()
            .and_hms_opt(16, 59, 12)
            .unwrap();
        let window = DateWindow::containing(now);

        assert_eq!(window.start_param(), "2024-03-14 00:00:00");
        assert_eq!(window.end_param(), "2024-03-15 00:00:00");
        assert!(window.contains(now));
        assert!(!window.contains(window.end));
    }

    #[test]
    fn test_window_rolls_over_month_and_year() {
        let eom = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(DateWindow::for_day(eom).end_param(), "2024-03-01 00:00:00");

        let eoy = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert_eq!(DateWindow::for_day(eoy).end_param(), "2024-01-01 00:00:00");
    }

    #[test]
    fn test_shipment_record_parsing() {
        let record: ShipmentRecord = serde_json::from_value(serde_json::json!({
            "id": 991,
            "order_id": "12345",
            "seller_id": 3477,
            "track_and_trace": " JVGL0001 ",
            "carrier": "dhl"
        }))
        .unwrap();

        assert_eq!(record.id, Some(991));
        assert_eq!(record.order_id, Some(12345));
        assert_eq!(record.tracking_code(), Some("JVGL0001"));
        assert_eq!(record.extra["carrier"], "dhl");
        assert_eq!(record.label(), "shipment 991 (order 12345)");
    }

    #[test]
    fn test_blank_tracking_code_is_missing() {
        let record: ShipmentRecord =
            serde_json::from_value(serde_json::json!({"id": 1, "track_and_trace": ""})).unwrap();
        assert_eq!(record.tracking_code(), None);

        let record: ShipmentRecord =
            serde_json::from_value(serde_json::json!({"id": 1, "track_and_trace": null})).unwrap();
        assert_eq!(record.tracking_code(), None);
    }

    #[test]
    fn test_page_count_fallback() {
        let page: ShipmentPage = serde_json::from_value(serde_json::json!({
            "shipments": [{"id": 1}, {"id": 2}]
        }))
        .unwrap();
        assert_eq!(page.count(), 2);

        let page: ShipmentPage =
            serde_json::from_value(serde_json::json!({"shipments": null, "shipments_count": 0}))
                .unwrap();
        assert_eq!(page.count(), 0);
        assert!(page.into_shipments().is_empty());
    }
}
