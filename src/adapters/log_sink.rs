//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A cloud adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { pump_count } => {
                info!("START | pumps={}", pump_count);
            }
            AppEvent::ScheduleInstalled {
                pump,
                hour,
                minute,
                alarm,
            } => {
                info!(
                    "SCHED | pump={} at={:02}:{:02} alarm={:?}",
                    pump.number(),
                    hour,
                    minute,
                    alarm
                );
            }
            AppEvent::ScheduleCancelled { pump, existed } => {
                info!("SCHED | pump={} cancelled existed={}", pump.number(), existed);
            }
            AppEvent::AllCancelled { count } => {
                info!("SCHED | all cancelled count={}", count);
            }
            AppEvent::SprayFinished(r) => {
                info!(
                    "SPRAY | pump={} outcome={} delivered={} attempts={} at={} {:02}:{:02}",
                    r.pump.number(),
                    r.outcome.label(),
                    r.delivered,
                    r.attempts,
                    r.at.date(),
                    r.at.hour(),
                    r.at.minute(),
                );
            }
            AppEvent::WifiResetRequested => {
                info!("NET | wifi reset requested");
            }
            AppEvent::ConfigUpdated(c) => {
                info!(
                    "CONFIG | updated: {} pump(s), {} recipient(s), UTC{:+} min",
                    c.pump_count,
                    c.recipients.len(),
                    c.utc_offset_minutes
                );
            }
            AppEvent::CommandRejected(e) => {
                warn!("CMD | rejected: {}", e);
            }
        }
    }
}
