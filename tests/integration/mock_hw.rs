//! Recording mocks for every driven port.
//!
//! All mocks share one [`Journal`], so tests can assert on the order of
//! calls across ports (relay released before the SMS goes out, and so on)
//! without touching real GPIO, UART or HTTP.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use cropspray::app::events::AppEvent;
use cropspray::app::ports::{
    DisplayPort, EventSink, FeedbackPort, NetworkPort, NotificationTransport, RelayPort,
    WeatherPort,
};
use cropspray::fsm::context::SprayPorts;
use cropspray::menu::{MenuItem, Session};
use cropspray::scheduler::PumpId;
use embedded_hal::delay::DelayNs;
use time::PrimitiveDateTime;

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Start,
    Success,
    Alert,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    WeatherQuery,
    RegistrationQuery,
    Reconnect,
    Sms { to: String, body: String, ok: bool },
    Relay { pump: PumpId, on: bool },
    AllRelaysOff,
    Pattern(Pattern),
    Wait(u32),
    Menu { item: MenuItem, position: usize },
    Scheduling(Session),
    Time { next: Option<(PumpId, PrimitiveDateTime)> },
    Status { top: String, bottom: String },
}

pub type Journal = Rc<RefCell<Vec<Call>>>;

// ── Weather ───────────────────────────────────────────────────

pub struct MockWeather {
    pub rain: bool,
    journal: Journal,
}

impl WeatherPort for MockWeather {
    fn is_rain_expected_or_occurring(&mut self) -> bool {
        self.journal.borrow_mut().push(Call::WeatherQuery);
        self.rain
    }
}

// ── Modem (network + SMS) ─────────────────────────────────────

pub struct MockModem {
    pub registered: bool,
    /// Registration state a reconnect cycle ends in.
    pub registered_after_reconnect: bool,
    /// Remaining failed deliveries per recipient.
    pub failures: HashMap<String, u32>,
    journal: Journal,
}

impl MockModem {
    pub fn fail(&mut self, recipient: &str, times: u32) {
        self.failures.insert(recipient.to_string(), times);
    }
}

impl NetworkPort for MockModem {
    fn is_registered(&mut self) -> bool {
        self.journal.borrow_mut().push(Call::RegistrationQuery);
        self.registered
    }

    fn reconnect(&mut self) -> bool {
        self.journal.borrow_mut().push(Call::Reconnect);
        self.registered = self.registered_after_reconnect;
        self.registered
    }
}

impl NotificationTransport for MockModem {
    fn deliver(&mut self, recipient: &str, message: &str) -> bool {
        let ok = match self.failures.get_mut(recipient) {
            Some(left) if *left > 0 => {
                *left -= 1;
                false
            }
            _ => true,
        };
        self.journal.borrow_mut().push(Call::Sms {
            to: recipient.to_string(),
            body: message.to_string(),
            ok,
        });
        ok
    }
}

// ── Relays ────────────────────────────────────────────────────

pub struct MockRelays {
    journal: Journal,
}

impl RelayPort for MockRelays {
    fn set_pump(&mut self, pump: PumpId, energized: bool) {
        self.journal.borrow_mut().push(Call::Relay { pump, on: energized });
    }

    fn all_off(&mut self) {
        self.journal.borrow_mut().push(Call::AllRelaysOff);
    }
}

// ── Feedback ──────────────────────────────────────────────────

pub struct MockFeedback {
    journal: Journal,
}

impl MockFeedback {
    fn push(&mut self, p: Pattern) {
        self.journal.borrow_mut().push(Call::Pattern(p));
    }
}

impl FeedbackPort for MockFeedback {
    fn start_pattern(&mut self) {
        self.push(Pattern::Start);
    }

    fn success_pattern(&mut self) {
        self.push(Pattern::Success);
    }

    fn alert_pattern(&mut self) {
        self.push(Pattern::Alert);
    }

    fn error_pattern(&mut self) {
        self.push(Pattern::Error);
    }
}

// ── Display ───────────────────────────────────────────────────

pub struct MockDisplay {
    journal: Journal,
}

impl DisplayPort for MockDisplay {
    fn render_menu(&mut self, item: MenuItem, position: usize, _count: usize) {
        self.journal.borrow_mut().push(Call::Menu { item, position });
    }

    fn render_scheduling(&mut self, session: &Session) {
        self.journal.borrow_mut().push(Call::Scheduling(*session));
    }

    fn show_time(&mut self, _now: PrimitiveDateTime, next: Option<(PumpId, PrimitiveDateTime)>) {
        self.journal.borrow_mut().push(Call::Time { next });
    }

    fn show_status(&mut self, top: &str, bottom: &str) {
        self.journal.borrow_mut().push(Call::Status {
            top: top.to_string(),
            bottom: bottom.to_string(),
        });
    }
}

// ── Delay ─────────────────────────────────────────────────────

/// Records waits instead of sleeping.
pub struct MockDelay {
    journal: Journal,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.journal.borrow_mut().push(Call::Wait(ns / 1_000_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.journal.borrow_mut().push(Call::Wait(ms));
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// One of every mock, wired to a shared journal.
pub struct Rig {
    pub journal: Journal,
    pub weather: MockWeather,
    pub modem: MockModem,
    pub relays: MockRelays,
    pub feedback: MockFeedback,
    pub display: MockDisplay,
    pub delay: MockDelay,
}

#[allow(dead_code)]
impl Rig {
    /// Dry weather, registered modem, every delivery succeeds.
    pub fn new() -> Self {
        let journal: Journal = Rc::default();
        Self {
            weather: MockWeather { rain: false, journal: journal.clone() },
            modem: MockModem {
                registered: true,
                registered_after_reconnect: true,
                failures: HashMap::new(),
                journal: journal.clone(),
            },
            relays: MockRelays { journal: journal.clone() },
            feedback: MockFeedback { journal: journal.clone() },
            display: MockDisplay { journal: journal.clone() },
            delay: MockDelay { journal: journal.clone() },
            journal,
        }
    }

    pub fn ports(&mut self) -> SprayPorts<'_> {
        SprayPorts {
            weather: &mut self.weather,
            cellular: &mut self.modem,
            relays: &mut self.relays,
            feedback: &mut self.feedback,
            display: &mut self.display,
            delay: &mut self.delay,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.journal.borrow().clone()
    }

    pub fn clear(&self) {
        self.journal.borrow_mut().clear();
    }

    pub fn relay_calls(&self) -> Vec<(PumpId, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Relay { pump, on } => Some((pump, on)),
                _ => None,
            })
            .collect()
    }

    pub fn sms(&self) -> Vec<(String, String, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Sms { to, body, ok } => Some((to, body, ok)),
                _ => None,
            })
            .collect()
    }

    pub fn patterns(&self) -> Vec<Pattern> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Pattern(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.journal.borrow().iter().filter(|c| *c == call).count()
    }

    /// Index of the first call matching `pred`.
    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.journal.borrow().iter().position(pred)
    }
}

impl Default for Rig {
    fn default() -> Self {
        Self::new()
    }
}
