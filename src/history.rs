//! Spray history and runtime counters.
//!
//! Keeps the last [`HISTORY_LEN`] spray records in RAM (oldest evicted
//! first) plus running counters per outcome.  Like the schedules, the
//! history is volatile and starts empty on every boot.

use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::fsm::context::{SprayOutcome, SprayReport};
use crate::scheduler::PumpId;

pub const HISTORY_LEN: usize = 16;

/// One completed firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprayRecord {
    pub pump: PumpId,
    pub at: PrimitiveDateTime,
    pub outcome: SprayOutcome,
    pub delivered: bool,
    pub attempts: u8,
}

impl From<&SprayReport> for SprayRecord {
    fn from(r: &SprayReport) -> Self {
        Self {
            pump: r.pump,
            at: r.at,
            outcome: r.outcome,
            delivered: r.notification.delivered,
            attempts: r.notification.attempts,
        }
    }
}

/// Running totals since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprayCounters {
    pub sprayed: u32,
    pub postponed_rain: u32,
    pub postponed_network: u32,
    /// Reports whose notification pass never reached every recipient.
    pub notification_failures: u32,
}

#[derive(Default)]
pub struct SprayLog {
    records: heapless::HistoryBuffer<SprayRecord, HISTORY_LEN>,
    counters: SprayCounters,
}

impl SprayLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, report: &SprayReport) {
        let c = &mut self.counters;
        match report.outcome {
            SprayOutcome::Sprayed => c.sprayed = c.sprayed.saturating_add(1),
            SprayOutcome::PostponedRain => c.postponed_rain = c.postponed_rain.saturating_add(1),
            SprayOutcome::PostponedNetwork => {
                c.postponed_network = c.postponed_network.saturating_add(1)
            }
        }
        if report.notification.failed() {
            c.notification_failures = c.notification_failures.saturating_add(1);
        }
        self.records.write(SprayRecord::from(report));
    }

    pub fn counters(&self) -> SprayCounters {
        self.counters
    }

    /// Most recent record.
    pub fn last(&self) -> Option<&SprayRecord> {
        self.records.recent()
    }

    /// Most recent record for `pump`.
    pub fn last_for(&self, pump: PumpId) -> Option<&SprayRecord> {
        self.records.oldest_ordered().filter(|r| r.pump == pump).last()
    }

    /// Records oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &SprayRecord> {
        self.records.oldest_ordered()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationResult;
    use time::macros::datetime;

    fn report(pump: PumpId, outcome: SprayOutcome, attempts: u8, delivered: bool) -> SprayReport {
        SprayReport {
            pump,
            at: datetime!(2024-05-01 06:30),
            outcome,
            notification: NotificationResult {
                attempts,
                delivered,
                per_recipient: heapless::Vec::new(),
            },
            rescheduled: outcome == SprayOutcome::PostponedRain,
        }
    }

    #[test]
    fn counts_outcomes_and_failures() {
        let mut log = SprayLog::new();
        log.record(&report(PumpId::P1, SprayOutcome::Sprayed, 1, true));
        log.record(&report(PumpId::P2, SprayOutcome::PostponedRain, 3, false));
        log.record(&report(PumpId::P1, SprayOutcome::PostponedNetwork, 3, false));

        let c = log.counters();
        assert_eq!(c.sprayed, 1);
        assert_eq!(c.postponed_rain, 1);
        assert_eq!(c.postponed_network, 1);
        assert_eq!(c.notification_failures, 2);
        assert_eq!(log.last().map(|r| r.outcome), Some(SprayOutcome::PostponedNetwork));
    }

    #[test]
    fn ring_evicts_oldest() {
        let mut log = SprayLog::new();
        for _ in 0..HISTORY_LEN + 4 {
            log.record(&report(PumpId::P1, SprayOutcome::Sprayed, 1, true));
        }
        log.record(&report(PumpId::P2, SprayOutcome::Sprayed, 0, false));
        assert_eq!(log.len(), HISTORY_LEN);
        assert_eq!(log.counters().sprayed, HISTORY_LEN as u32 + 5);
        assert_eq!(log.last_for(PumpId::P2).map(|r| r.attempts), Some(0));
    }

    #[test]
    fn record_serializes_to_json() {
        let rec = SprayRecord::from(&report(PumpId::P2, SprayOutcome::Sprayed, 1, true));
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"Sprayed\""));
        let back: SprayRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }
}
