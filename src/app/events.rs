//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, forward to a cloud
//! store, and so on.

use crate::config::SystemConfig;
use crate::error::Error;
use crate::history::SprayRecord;
use crate::scheduler::{AlarmId, PumpId};

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The service has started.
    Started { pump_count: u8 },

    /// A daily schedule was installed (or replaced).
    ScheduleInstalled {
        pump: PumpId,
        hour: u8,
        minute: u8,
        alarm: AlarmId,
    },

    /// A pump's schedule was cancelled.  `existed` is `false` for a no-op.
    ScheduleCancelled { pump: PumpId, existed: bool },

    /// "Cancel all" ran; `count` schedules were live.
    AllCancelled { count: usize },

    /// One guarded spray sequence completed.
    SprayFinished(SprayRecord),

    /// The operator pressed the reset button.
    WifiResetRequested,

    /// New configuration accepted.  Adapters that hold their own copy
    /// of a setting (relay count, rain threshold, UTC offset) apply it
    /// from here.
    ConfigUpdated(SystemConfig),

    /// A command was refused.
    CommandRejected(Error),
}
