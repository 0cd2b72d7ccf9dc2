//! Input, actuator and feedback drivers, hardware initialisation, watchdog.

pub mod button;
pub mod feedback;
pub mod hw_init;
pub mod relay;
pub mod watchdog;
