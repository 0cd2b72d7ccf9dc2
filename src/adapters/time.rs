//! ESP32 clock adapter.
//!
//! Provides the wall clock used for alarm matching plus a monotonic
//! millisecond counter for button debouncing.
//!
//! - **`target_os = "espidf"`**: `gettimeofday()` (kept in sync by SNTP)
//!   and `esp_timer_get_time()`.
//! - **`not(target_os = "espidf")`**: `std::time` for host-side testing
//!   and simulation.
//!
//! The RTC keeps UTC; the configured offset converts it to local time.

use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::app::ports::ClockPort;

/// Anything before 2020-01-01 means the clock was never synced.
const EPOCH_2020: i64 = 1_577_836_800;

/// Clock adapter for the ESP32 platform.
pub struct SystemClock {
    offset: UtcOffset,
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl SystemClock {
    pub fn new(utc_offset_minutes: i16) -> Self {
        Self {
            offset: offset_from_minutes(utc_offset_minutes),
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    pub fn set_offset(&mut self, utc_offset_minutes: i16) {
        self.offset = offset_from_minutes(utc_offset_minutes);
    }

    /// Whether the wall clock has been set (SNTP or RTC).
    pub fn is_synced(&self) -> bool {
        self.unix_secs() >= EPOCH_2020
    }

    /// Milliseconds since boot (monotonic, wraps at `u32::MAX`).
    #[cfg(target_os = "espidf")]
    pub fn uptime_ms(&self) -> u32 {
        ((unsafe { esp_idf_svc::sys::esp_timer_get_time() }) / 1_000) as u32
    }

    /// Milliseconds since boot (monotonic, wraps at `u32::MAX`).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }

    #[cfg(target_os = "espidf")]
    fn unix_secs(&self) -> i64 {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return 0;
        }
        tv.tv_sec as i64
    }

    #[cfg(not(target_os = "espidf"))]
    fn unix_secs(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as i64)
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> PrimitiveDateTime {
        local_from_unix(self.unix_secs(), self.offset)
    }
}

fn offset_from_minutes(minutes: i16) -> UtcOffset {
    UtcOffset::from_whole_seconds(i32::from(minutes) * 60).unwrap_or(UtcOffset::UTC)
}

/// Local wall-clock time for a Unix timestamp.
pub fn local_from_unix(secs: i64, offset: UtcOffset) -> PrimitiveDateTime {
    let utc = OffsetDateTime::from_unix_timestamp(secs).unwrap_or(OffsetDateTime::UNIX_EPOCH);
    let local = utc.to_offset(offset);
    PrimitiveDateTime::new(local.date(), local.time())
}
