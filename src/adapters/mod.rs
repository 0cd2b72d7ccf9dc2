//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements            | Connects to                  |
//! |-------------|-----------------------|------------------------------|
//! | `hardware`  | RelayPort             | Relay GPIOs, button inputs   |
//! |             | FeedbackPort          | Buzzer + LED GPIOs           |
//! | `gsm`       | NetworkPort           | SIM800 modem on UART1        |
//! |             | NotificationTransport |                              |
//! | `weather`   | WeatherPort           | OpenWeather HTTP forecast    |
//! | `display`   | DisplayPort           | 16x2 LCD over I²C            |
//! | `time`      | ClockPort             | SNTP-synced system clock     |
//! | `delay`     | DelayNs               | FreeRTOS delay + TWDT feed   |
//! | `log_sink`  | EventSink             | Serial log output            |
//! | `wifi`      | -                     | Station link for HTTP + SNTP |

pub mod delay;
pub mod display;
pub mod gsm;
pub mod hardware;
pub mod log_sink;
pub mod time;
pub mod weather;
pub mod wifi;
