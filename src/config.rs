//! System configuration parameters
//!
//! All tunable parameters for the CropSpray controller.  Schedules are not
//! part of the configuration: they live only in the alarm registry and are
//! lost on restart.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Maximum number of SMS recipients.
pub const MAX_RECIPIENTS: usize = 4;

/// A phone number in international format, e.g. `+639171234567`.
pub type PhoneNumber = heapless::String<20>;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Hardware ---
    /// Number of fitted pumps (1 or 2).
    pub pump_count: u8,

    // --- Input ---
    /// Minimum stable-level duration before a button reading is trusted.
    pub debounce_ms: u32,
    /// Button poll interval (milliseconds)
    pub poll_interval_ms: u32,

    // --- Scheduling ---
    /// Local time offset from UTC (minutes).  Alarms match local time.
    pub utc_offset_minutes: i16,
    /// How often the wall clock is compared against pending alarms.
    pub clock_check_interval_ms: u32,
    /// Relay hold time for one spray (seconds)
    pub spray_duration_secs: u16,

    // --- Notifications ---
    /// Full passes over the recipient list before giving up.
    pub sms_max_retries: u8,
    /// Pause between two passes (seconds)
    pub sms_retry_delay_secs: u16,
    /// Pause after each recipient so the modem can settle (milliseconds)
    pub sms_recipient_gap_ms: u32,
    /// Recipients of every spray report.
    pub recipients: heapless::Vec<PhoneNumber, MAX_RECIPIENTS>,

    // --- Network ---
    /// Bounded wait inside one reconnect cycle (seconds)
    pub network_reconnect_wait_secs: u16,

    // --- Weather ---
    /// Forecast precipitation probability (0–1) above which rain is expected.
    pub rain_probability_threshold: f32,

    // --- Housekeeping ---
    /// Task watchdog timeout (seconds)
    pub watchdog_timeout_secs: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            pump_count: 2,

            debounce_ms: 50,
            poll_interval_ms: 10,

            utc_offset_minutes: 0,
            clock_check_interval_ms: 1000,
            spray_duration_secs: 5,

            sms_max_retries: 3,
            sms_retry_delay_secs: 5,
            sms_recipient_gap_ms: 5000,
            recipients: heapless::Vec::new(),

            network_reconnect_wait_secs: 10,

            rain_probability_threshold: 0.5,

            watchdog_timeout_secs: 30,
        }
    }
}

impl SystemConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=crate::scheduler::MAX_PUMPS as u8).contains(&self.pump_count) {
            return Err(ConfigError::ValidationFailed("pump_count must be 1 or 2"));
        }
        if self.debounce_ms == 0 {
            return Err(ConfigError::ValidationFailed("debounce_ms must be > 0"));
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms >= self.debounce_ms {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must be > 0 and shorter than debounce_ms",
            ));
        }
        if self.utc_offset_minutes.unsigned_abs() > 14 * 60 {
            return Err(ConfigError::ValidationFailed(
                "utc_offset_minutes must be within +/-14 h",
            ));
        }
        if self.spray_duration_secs == 0 {
            return Err(ConfigError::ValidationFailed("spray_duration_secs must be > 0"));
        }
        if self.sms_max_retries == 0 {
            return Err(ConfigError::ValidationFailed("sms_max_retries must be > 0"));
        }
        if !(self.rain_probability_threshold > 0.0 && self.rain_probability_threshold <= 1.0) {
            return Err(ConfigError::ValidationFailed(
                "rain_probability_threshold must be in (0, 1]",
            ));
        }
        if self.recipients.iter().any(|r| !is_phone_number(r)) {
            return Err(ConfigError::ValidationFailed("recipient is not a phone number"));
        }
        // The watchdog is fed between delay slices, but a single blocking
        // step (one relay hold) still has to fit inside the timeout.
        if self.watchdog_timeout_secs <= u32::from(self.spray_duration_secs) {
            return Err(ConfigError::ValidationFailed(
                "watchdog_timeout_secs must exceed spray_duration_secs",
            ));
        }
        Ok(())
    }

    /// Relay hold time in milliseconds.
    pub fn spray_duration_ms(&self) -> u32 {
        u32::from(self.spray_duration_secs) * 1000
    }
}

fn is_phone_number(s: &str) -> bool {
    let digits = s.strip_prefix('+').unwrap_or(s);
    (6..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
}
