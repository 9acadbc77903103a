use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use fleetcheck::inspections::Clock;
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Clock pinned to a CLI-supplied date, for reproducible demo output.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PinnedClock {
    now: DateTime<Utc>,
}

impl PinnedClock {
    pub(crate) fn at(date: NaiveDate) -> Self {
        Self {
            now: Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).expect("valid time")),
        }
    }
}

impl Clock for PinnedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
