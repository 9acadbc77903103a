use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::VehicleId;

/// Certification status derived from an expiration date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuvStatus {
    Current,
    Warning,
    Expired,
}

impl TuvStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TuvStatus::Current => "current",
            TuvStatus::Warning => "warning",
            TuvStatus::Expired => "expired",
        }
    }
}

/// Expirations this many days out (inclusive) are flagged as warnings.
pub const WARNING_WINDOW_DAYS: i64 = 30;

/// Signed whole-day distance to the expiration date; negative once lapsed.
pub fn days_remaining(expires_on: NaiveDate, today: NaiveDate) -> i64 {
    (expires_on - today).num_days()
}

/// `expired` strictly before today, `warning` inside the 30-day window with
/// today itself included, `current` beyond it.
pub fn classify(expires_on: NaiveDate, today: NaiveDate) -> TuvStatus {
    let days = days_remaining(expires_on, today);
    if days < 0 {
        TuvStatus::Expired
    } else if days <= WARNING_WINDOW_DAYS {
        TuvStatus::Warning
    } else {
        TuvStatus::Current
    }
}

/// One aggregated deadline entry, carrying the signed days-remaining so
/// alert consumers can sort and render without re-deriving dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuvAlert {
    pub vehicle_id: VehicleId,
    pub plate: String,
    pub expires_on: NaiveDate,
    pub status: TuvStatus,
    pub days_remaining: i64,
}

/// Deadline aggregation buckets, each sorted by expiration ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TuvAlerts {
    pub expired: Vec<TuvAlert>,
    pub warning: Vec<TuvAlert>,
}
