//! CropSpray firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod fsm;
pub mod history;
pub mod menu;
pub mod notify;
pub mod pins;
pub mod scheduler;

// Hardware-facing modules; the device paths are cfg-gated inside.
pub mod adapters;
pub mod drivers;
