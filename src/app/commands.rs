//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (serial
//! console, a future cloud link) that the
//! [`AppService`](super::service::AppService) interprets and acts upon.
//! Pumps are addressed by their operator-facing 1-based number and
//! checked against the configured pump count.

use crate::config::SystemConfig;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Install or replace the daily schedule of pump `pump`.
    Schedule { pump: u8, hour: u8, minute: u8 },

    /// Cancel one pump's schedule.
    Cancel(u8),

    /// Cancel every schedule.
    CancelAll,

    /// Run the guarded spray sequence for a pump right away.
    SprayNow(u8),

    /// Hot-reload configuration.  Rejected unless it validates.
    UpdateConfig(SystemConfig),
}
