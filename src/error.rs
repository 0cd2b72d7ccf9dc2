//! Unified error types for the CropSpray firmware.
//!
//! Registry and configuration rejections convert into a single `Error`
//! so commands report uniformly.  All variants are `Copy` so they can be
//! passed through the service and logged without allocation.
//!
//! Nothing in the core is fatal: weather and network problems become
//! [`SprayOutcome`](crate::fsm::context::SprayOutcome)s, delivery failures
//! become a `false` in the notification result, and registry misuse is
//! reported back to the caller as one of these errors.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every rejected command funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An alarm-registry request referenced something that does not exist.
    Registry(RegistryError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// Pump number (1-based, as the operator sees it) is not fitted.
    InvalidPump(u8),
    /// Hour or minute outside 0..=23 / 0..=59.
    InvalidTime { hour: u8, minute: u8 },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPump(n) => write!(f, "no pump {n}"),
            Self::InvalidTime { hour, minute } => {
                write!(f, "invalid time {hour:02}:{minute:02}")
            }
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

/// Adapter-level I/O failures.  These never reach the core: the weather
/// adapter fails open and the modem adapter reports `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// Weather service unreachable or returned an unusable payload.
    WeatherUnavailable,
    /// Serial link to the modem failed.
    UartFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WeatherUnavailable => write!(f, "weather unavailable"),
            Self::UartFailed => write!(f, "modem UART failed"),
        }
    }
}
