//! SMS notification dispatcher with whole-pass retry.
//!
//! One *pass* sends the message to every configured recipient.  A pass
//! succeeds only if every recipient in it succeeded; failed passes are
//! repeated in full (not per recipient) up to `max_retries` times.
//!
//! ```text
//!  pass 1:  A ✔  gap  B ✘  gap ──▶ retry delay
//!  pass 2:  A ✔  gap  B ✘  gap ──▶ retry delay
//!  pass 3:  A ✔  gap  B ✔  gap ──▶ delivered
//! ```
//!
//! Nothing here is fatal.  The caller gets a [`NotificationResult`] and
//! picks a feedback pattern from it.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::app::ports::NotificationTransport;
use crate::config::{MAX_RECIPIENTS, PhoneNumber, SystemConfig};

/// Outcome of one [`Notifier::send_with_retry`] call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationResult {
    /// Passes made (0 when there is nobody to notify).
    pub attempts: u8,
    /// The last pass reached every recipient.
    pub delivered: bool,
    /// Per-recipient status of the last pass, in recipient order.
    pub per_recipient: heapless::Vec<bool, MAX_RECIPIENTS>,
}

impl NotificationResult {
    /// A pass was made and it did not reach everyone.
    pub fn failed(&self) -> bool {
        self.attempts > 0 && !self.delivered
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Notifier {
    max_retries: u8,
    retry_delay_ms: u32,
    recipient_gap_ms: u32,
}

impl Notifier {
    pub fn new(max_retries: u8, retry_delay_ms: u32, recipient_gap_ms: u32) -> Self {
        Self {
            max_retries,
            retry_delay_ms,
            recipient_gap_ms,
        }
    }

    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(
            config.sms_max_retries,
            u32::from(config.sms_retry_delay_secs) * 1000,
            config.sms_recipient_gap_ms,
        )
    }

    /// Deliver `message` to every recipient, retrying whole passes.
    ///
    /// Stops at the first fully successful pass.  Waits `recipient_gap`
    /// after every send and `retry_delay` between passes (not after the
    /// last one).
    pub fn send_with_retry<T, D>(
        &self,
        recipients: &[PhoneNumber],
        message: &str,
        transport: &mut T,
        delay: &mut D,
    ) -> NotificationResult
    where
        T: NotificationTransport + ?Sized,
        D: DelayNs + ?Sized,
    {
        let mut result = NotificationResult::default();
        if recipients.is_empty() {
            warn!("SMS: no recipients configured, nothing sent");
            return result;
        }

        for attempt in 1..=self.max_retries {
            result.attempts = attempt;
            result.per_recipient.clear();

            for recipient in recipients.iter().take(MAX_RECIPIENTS) {
                let ok = transport.deliver(recipient, message);
                if !ok {
                    warn!("SMS: delivery to {} failed (pass {})", recipient, attempt);
                }
                let _ = result.per_recipient.push(ok);
                delay.delay_ms(self.recipient_gap_ms);
            }

            if result.per_recipient.iter().all(|&ok| ok) {
                result.delivered = true;
                info!("SMS: delivered to {} recipient(s) on pass {}", recipients.len(), attempt);
                return result;
            }

            if attempt < self.max_retries {
                delay.delay_ms(self.retry_delay_ms);
            }
        }

        warn!("SMS: giving up after {} passes", result.attempts);
        result
    }
}
