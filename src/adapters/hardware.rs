//! Hardware adapters: bridge the relay bank, buttons and feedback outputs
//! to the domain port traits.
//!
//! - [`HardwareAdapter`] owns the [`RelayBank`] and implements
//!   [`RelayPort`]; it also samples the front-panel buttons.
//! - [`FeedbackOutputs`] owns the [`FeedbackEngine`] and drives the
//!   buzzer and LEDs.  Its state lives in `Cell`s so one instance can be
//!   both the spray sequence's [`FeedbackPort`] (via `&FeedbackOutputs`)
//!   and the thing the blocking delay ticks between sleep slices.
//!
//! On non-espidf targets the underlying GPIO helpers are cfg-gated
//! simulation stubs.

use core::cell::Cell;

use crate::app::ports::{FeedbackPort, RelayPort};
use crate::drivers::feedback::{FeedbackEngine, Levels, PatternId};
use crate::drivers::hw_init;
use crate::drivers::relay::RelayBank;
use crate::pins;
use crate::scheduler::PumpId;

// ── Relays + buttons ──────────────────────────────────────────

pub struct HardwareAdapter {
    relays: RelayBank,
}

impl HardwareAdapter {
    pub fn new(pump_count: u8) -> Self {
        Self {
            relays: RelayBank::new(pump_count),
        }
    }

    /// Raw button levels in [`Channel`](crate::drivers::button::Channel)
    /// order (`true` = released, pull-up HIGH).
    pub fn read_buttons(&self) -> [bool; 4] {
        pins::BUTTON_GPIOS.map(hw_init::gpio_read)
    }

    pub fn relays(&self) -> &RelayBank {
        &self.relays
    }

    pub fn set_pump_count(&mut self, pump_count: u8) {
        self.relays.set_pump_count(pump_count);
    }
}

impl RelayPort for HardwareAdapter {
    fn set_pump(&mut self, pump: PumpId, energized: bool) {
        self.relays.set(pump, energized);
    }

    fn all_off(&mut self) {
        self.relays.all_off();
    }
}

// ── Buzzer + LEDs ─────────────────────────────────────────────

#[derive(Default)]
pub struct FeedbackOutputs {
    engine: Cell<FeedbackEngine>,
    written: Cell<Option<Levels>>,
}

impl FeedbackOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self, pattern: PatternId) {
        let mut engine = self.engine.get();
        engine.request(pattern);
        self.engine.set(engine);
    }

    pub fn active(&self) -> Option<PatternId> {
        self.engine.get().active()
    }

    /// Advance the pattern and drive the pins if the levels changed.
    pub fn tick(&self, delta_ms: u32) -> Levels {
        let mut engine = self.engine.get();
        let levels = engine.tick(delta_ms);
        self.engine.set(engine);

        if self.written.get() != Some(levels) {
            hw_init::gpio_write(pins::BUZZER_GPIO, levels.buzzer);
            hw_init::gpio_write(pins::LED_OK_GPIO, levels.led_ok);
            hw_init::gpio_write(pins::LED_ERROR_GPIO, levels.led_error);
            self.written.set(Some(levels));
        }
        levels
    }
}

impl FeedbackPort for &FeedbackOutputs {
    fn start_pattern(&mut self) {
        self.request(PatternId::Start);
    }

    fn success_pattern(&mut self) {
        self.request(PatternId::Success);
    }

    fn alert_pattern(&mut self) {
        self.request(PatternId::Alert);
    }

    fn error_pattern(&mut self) {
        self.request(PatternId::Error);
    }
}
