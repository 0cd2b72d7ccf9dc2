//! Pump relay bank (one active-HIGH relay per pump).
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the relay GPIOs via hw_init helpers.
//! On host/test: tracks state in-memory only.

use log::{info, warn};

use crate::drivers::hw_init;
use crate::pins;
use crate::scheduler::{MAX_PUMPS, PumpId};

pub struct RelayBank {
    energized: [bool; MAX_PUMPS],
    pump_count: u8,
}

impl RelayBank {
    /// All relays start released.
    pub fn new(pump_count: u8) -> Self {
        let mut bank = Self {
            energized: [false; MAX_PUMPS],
            pump_count: pump_count.min(MAX_PUMPS as u8),
        };
        bank.all_off();
        bank
    }

    pub fn set(&mut self, pump: PumpId, on: bool) {
        if pump.number() > self.pump_count {
            warn!("Relay: {} not fitted, ignoring", pump);
            return;
        }
        let idx = pump.index();
        hw_init::gpio_write(pins::RELAY_GPIOS[idx], on);
        if self.energized[idx] != on {
            info!("Relay: {} {}", pump, if on { "ON" } else { "OFF" });
        }
        self.energized[idx] = on;
    }

    /// Release every relay, fitted or not.
    pub fn all_off(&mut self) {
        for (idx, &gpio) in pins::RELAY_GPIOS.iter().enumerate() {
            hw_init::gpio_write(gpio, false);
            self.energized[idx] = false;
        }
    }

    pub fn is_energized(&self, pump: PumpId) -> bool {
        self.energized.get(pump.index()).copied().unwrap_or(false)
    }

    pub fn any_energized(&self) -> bool {
        self.energized.iter().any(|&on| on)
    }

    pub fn set_pump_count(&mut self, pump_count: u8) {
        self.all_off();
        self.pump_count = pump_count.min(MAX_PUMPS as u8);
    }
}

impl Drop for RelayBank {
    fn drop(&mut self) {
        self.all_off();
    }
}
