//! Watchdog-aware blocking delay.
//!
//! Every blocking wait in the spray sequence (relay hold, reconnect
//! wait, SMS retry gaps) goes through this [`DelayNs`] implementation.
//! It sleeps in slices and feeds the task watchdog after each one, so a
//! long notification chain never trips the TWDT.  With feedback outputs
//! attached the slices shrink so buzzer patterns keep playing while the
//! main loop is blocked.

use embedded_hal::delay::DelayNs;

use super::hardware::FeedbackOutputs;
use crate::drivers::watchdog::Watchdog;

/// Longest single sleep between two watchdog feeds.
pub const SLICE_MS: u32 = 1000;
/// Slice while feedback patterns are being ticked.
pub const FEEDBACK_SLICE_MS: u32 = 20;

pub struct WatchdogDelay<'w> {
    watchdog: &'w Watchdog,
    feedback: Option<&'w FeedbackOutputs>,
    slice_ms: u32,
    feeds: u32,
}

impl<'w> WatchdogDelay<'w> {
    pub fn new(watchdog: &'w Watchdog) -> Self {
        Self::with_slice(watchdog, SLICE_MS)
    }

    pub fn with_slice(watchdog: &'w Watchdog, slice_ms: u32) -> Self {
        Self {
            watchdog,
            feedback: None,
            slice_ms: slice_ms.max(1),
            feeds: 0,
        }
    }

    /// Tick `outputs` between slices.
    pub fn with_feedback(watchdog: &'w Watchdog, outputs: &'w FeedbackOutputs) -> Self {
        Self {
            feedback: Some(outputs),
            ..Self::with_slice(watchdog, FEEDBACK_SLICE_MS)
        }
    }

    /// Watchdog feeds performed so far.
    pub fn feeds(&self) -> u32 {
        self.feeds
    }

    #[cfg(target_os = "espidf")]
    fn sleep_ms(ms: u32) {
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn sleep_ms(ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}

impl DelayNs for WatchdogDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        let ms = ns / 1_000_000;
        if ms > 0 {
            self.delay_ms(ms);
        }
        let rest_us = (ns % 1_000_000) / 1_000;
        if rest_us > 0 {
            #[cfg(target_os = "espidf")]
            esp_idf_svc::hal::delay::Ets::delay_us(rest_us);
            #[cfg(not(target_os = "espidf"))]
            std::thread::sleep(std::time::Duration::from_micros(u64::from(rest_us)));
        }
    }

    fn delay_ms(&mut self, mut ms: u32) {
        while ms > 0 {
            let step = ms.min(self.slice_ms);
            Self::sleep_ms(step);
            if let Some(outputs) = self.feedback {
                outputs.tick(step);
            }
            self.watchdog.feed();
            self.feeds = self.feeds.saturating_add(1);
            ms -= step;
        }
    }
}
