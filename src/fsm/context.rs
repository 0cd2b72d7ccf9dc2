//! Per-firing context threaded through every spray state handler.
//!
//! `SprayContext` is the blackboard for one guarded spray: which pump,
//! the borrowed ports, the registry (for the rain reschedule) and the
//! outputs the handlers accumulate.  It lives only for the duration of
//! one [`SprayEngine::run`](super::SprayEngine::run).

use core::fmt::Write as _;

use embedded_hal::delay::DelayNs;
use serde::{Deserialize, Serialize};
use time::{Duration, PrimitiveDateTime};

use super::StateId;
use crate::app::ports::{CellularPort, DisplayPort, FeedbackPort, RelayPort, WeatherPort};
use crate::config::SystemConfig;
use crate::notify::{NotificationResult, Notifier};
use crate::scheduler::{AlarmRegistry, PumpId};

/// Maximum SMS body length (single GSM-7 segment).
pub const SMS_MAX_LEN: usize = 160;

pub type SmsText = heapless::String<SMS_MAX_LEN>;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of one alarm firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SprayOutcome {
    Sprayed,
    PostponedRain,
    PostponedNetwork,
}

impl SprayOutcome {
    pub fn is_postponed(self) -> bool {
        !matches!(self, Self::Sprayed)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sprayed => "Sprayed",
            Self::PostponedRain => "PostponedRain",
            Self::PostponedNetwork => "PostponedNetwork",
        }
    }
}

/// Build the SMS text for an outcome.
///
/// The sprayed message quotes the firing time; the rain message quotes
/// tomorrow at the request's slot.
pub fn compose_message(request: &SprayRequest, outcome: SprayOutcome) -> SmsText {
    let pump = request.pump;
    let at = request.now;
    let mut msg = SmsText::new();
    // Longest variant is well under 160 chars, so writes cannot fail.
    let _ = match outcome {
        SprayOutcome::Sprayed => write!(
            msg,
            "CropSpray: Pump {} sprayed at {:02}:{:02} on {}.",
            pump.number(),
            at.hour(),
            at.minute(),
            at.date()
        ),
        SprayOutcome::PostponedRain => {
            let tomorrow = (at + Duration::DAY).date();
            write!(
                msg,
                "CropSpray: Pump {} postponed, rain expected today. Rescheduled for {} {:02}:{:02}.",
                pump.number(),
                tomorrow,
                request.hour,
                request.minute
            )
        }
        SprayOutcome::PostponedNetwork => write!(
            msg,
            "CropSpray: Pump {} postponed, no cellular network. Next try at the regular time.",
            pump.number()
        ),
    };
    msg
}

// ---------------------------------------------------------------------------
// Ports bundle (borrowed from the main loop for one firing)
// ---------------------------------------------------------------------------

/// Every driven port the spray sequence touches.
pub struct SprayPorts<'p> {
    pub weather: &'p mut dyn WeatherPort,
    pub cellular: &'p mut dyn CellularPort,
    pub relays: &'p mut dyn RelayPort,
    pub feedback: &'p mut dyn FeedbackPort,
    pub display: &'p mut dyn DisplayPort,
    pub delay: &'p mut dyn DelayNs,
}

// ---------------------------------------------------------------------------
// SprayContext
// ---------------------------------------------------------------------------

/// What triggered the firing.  Decides the reschedule slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SprayRequest {
    pub pump: PumpId,
    /// Slot to postpone to on rain (the schedule's own hour:minute).
    pub hour: u8,
    pub minute: u8,
    /// Wall-clock time of the firing.
    pub now: PrimitiveDateTime,
}

pub struct SprayContext<'a, 'p> {
    // -- Input --
    pub request: SprayRequest,
    pub config: &'a SystemConfig,

    // -- Collaborators --
    pub ports: &'a mut SprayPorts<'p>,
    pub registry: &'a mut AlarmRegistry,
    pub notifier: &'a Notifier,

    // -- Output --
    pub outcome: Option<SprayOutcome>,
    pub notification: NotificationResult,
    pub rescheduled: bool,
    /// States visited, in order.
    pub trail: heapless::Vec<StateId, { StateId::COUNT }>,
}

impl<'a, 'p> SprayContext<'a, 'p> {
    pub fn new(
        request: SprayRequest,
        config: &'a SystemConfig,
        ports: &'a mut SprayPorts<'p>,
        registry: &'a mut AlarmRegistry,
        notifier: &'a Notifier,
    ) -> Self {
        Self {
            request,
            config,
            ports,
            registry,
            notifier,
            outcome: None,
            notification: NotificationResult::default(),
            rescheduled: false,
            trail: heapless::Vec::new(),
        }
    }

    pub fn pump(&self) -> PumpId {
        self.request.pump
    }

    pub fn report(&self) -> SprayReport {
        SprayReport {
            pump: self.request.pump,
            at: self.request.now,
            // Report always sets an outcome before Done.
            outcome: self.outcome.unwrap_or(SprayOutcome::PostponedNetwork),
            notification: self.notification.clone(),
            rescheduled: self.rescheduled,
        }
    }
}

/// Summary of one completed firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprayReport {
    pub pump: PumpId,
    pub at: PrimitiveDateTime,
    pub outcome: SprayOutcome,
    pub notification: NotificationResult,
    pub rescheduled: bool,
}
