//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (relays, modem, weather service, LCD, feedback) implement
//! these traits.  The [`AppService`](super::service::AppService) and the
//! spray engine consume them, so the domain core never touches hardware
//! directly.  Blocking waits are not a port of their own: the core takes
//! any [`embedded_hal::delay::DelayNs`].

use time::PrimitiveDateTime;

use crate::menu::{MenuItem, Session};
use crate::scheduler::{AlarmKind, PumpId, ScheduleEntry};

// ───────────────────────────────────────────────────────────────
// Weather oracle (driven adapter: forecast service → domain)
// ───────────────────────────────────────────────────────────────

pub trait WeatherPort {
    /// `true` if rain is falling or forecast for today.
    ///
    /// Implementations fail open: an unreachable service or unreadable
    /// payload reports `false`.
    fn is_rain_expected_or_occurring(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Cellular link (driven adapter: modem → domain)
// ───────────────────────────────────────────────────────────────

pub trait NetworkPort {
    /// Whether the modem is currently registered on the network.
    fn is_registered(&mut self) -> bool;

    /// Run one reconnect cycle.  May block for several seconds.
    /// Returns the registration state at the end of the cycle.
    fn reconnect(&mut self) -> bool;
}

/// Per-recipient message delivery (SMS).
pub trait NotificationTransport {
    /// Deliver `message` to one recipient.  `true` once the network
    /// acknowledged the submission.
    fn deliver(&mut self, recipient: &str, message: &str) -> bool;
}

/// A modem that is both the network link and the SMS transport.
pub trait CellularPort: NetworkPort + NotificationTransport {}

impl<T: NetworkPort + NotificationTransport> CellularPort for T {}

// ───────────────────────────────────────────────────────────────
// Relay actuator (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

pub trait RelayPort {
    /// Energise or release the relay feeding `pump`.  No feedback path.
    fn set_pump(&mut self, pump: PumpId, energized: bool);

    /// Release every relay.
    fn all_off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Feedback signaler (driven adapter: domain → buzzer / LEDs)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget audio/visual cues.
pub trait FeedbackPort {
    fn start_pattern(&mut self);
    fn success_pattern(&mut self);
    fn alert_pattern(&mut self);
    fn error_pattern(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Clock (driven adapter: RTC / NTP → domain)
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// Current local wall-clock time.  Authoritative for alarm matching.
    fn now(&self) -> PrimitiveDateTime;
}

// ───────────────────────────────────────────────────────────────
// Display (driven adapter: domain → LCD)
// ───────────────────────────────────────────────────────────────

/// Pure side effect; nothing the display returns feeds back into the core.
pub trait DisplayPort {
    /// Main menu with `item` highlighted (`position` of `count`, zero-based).
    fn render_menu(&mut self, item: MenuItem, position: usize, count: usize);

    /// Scheduling session editor.
    fn render_scheduling(&mut self, session: &Session);

    /// Current time plus the next pending spray, if any.
    fn show_time(&mut self, now: PrimitiveDateTime, next: Option<(PumpId, PrimitiveDateTime)>);

    /// Two free-form status lines (spray progress, outcomes).
    fn show_status(&mut self, top: &str, bottom: &str);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples the alarm registry from dispatch)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the alarm registry invokes when an alarm fires.
///
/// The registry knows nothing about the spray engine; the service's
/// [`EventQueue`](crate::events::EventQueue) implements this and the
/// main loop drains it afterwards, so no firing re-enters shared state.
pub trait SchedulerDelegate {
    fn on_alarm_fired(&mut self, entry: ScheduleEntry, kind: AlarmKind);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from configuration validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
        }
    }
}
