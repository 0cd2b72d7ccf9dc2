//! Application core: domain orchestration, no direct I/O.
//!
//! This module wires the CropSpray business rules together: input →
//! menu → alarm registry, and alarm → guarded spray → notification.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
