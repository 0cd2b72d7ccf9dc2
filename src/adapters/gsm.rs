//! SIM800-class GSM modem adapter.
//!
//! Implements [`NetworkPort`] (registration check, reconnect) and
//! [`NotificationTransport`] (text-mode SMS) over a line-oriented AT
//! channel.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: [`UartLink`] drives UART1 via raw
//!   ESP-IDF driver calls.
//! - **all other targets**: [`SimModem`] answers AT commands in memory
//!   for host-side tests.
//!
//! Response parsing ([`parse_creg`], [`classify_send`]) is pure and
//! shared by both.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::app::ports::{NetworkPort, NotificationTransport};
use crate::drivers::hw_init;
use crate::error::CommsError;
use crate::pins;

/// Ctrl-Z terminates an SMS body in text mode.
const CTRL_Z: u8 = 0x1A;
/// Overall wait for the network's answer to `AT+CMGS`.
pub const SEND_TIMEOUT_MS: u32 = 10_000;
/// Wait for a plain command's `OK`.
const COMMAND_TIMEOUT_MS: u32 = 1_000;
/// Wait for the `>` body prompt after `AT+CMGS`.
const PROMPT_TIMEOUT_MS: u32 = 1_000;
/// Granularity of one channel read.
const POLL_MS: u32 = 10;

const RX_CAPACITY: usize = 256;

// ───────────────────────────────────────────────────────────────
// Response parsing
// ───────────────────────────────────────────────────────────────

/// Final state of an SMS submission as read from the modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// `OK` arrived first.
    Delivered,
    /// `ERROR` (or `+CMS ERROR`) arrived first.
    Rejected,
    /// Neither yet.
    Pending,
}

/// Classify an accumulated modem response.  Whichever final result
/// code appears first wins.
pub fn classify_send(response: &str) -> SendStatus {
    match (response.find("OK"), response.find("ERROR")) {
        (Some(ok), Some(err)) if err < ok => SendStatus::Rejected,
        (Some(_), _) => SendStatus::Delivered,
        (None, Some(_)) => SendStatus::Rejected,
        (None, None) => SendStatus::Pending,
    }
}

/// `true` if a `+CREG` response reports home (1) or roaming (5)
/// registration.  Accepts both the query form `+CREG: <n>,<stat>` and
/// the unsolicited form `+CREG: <stat>`.
pub fn parse_creg(response: &str) -> bool {
    let Some(start) = response.find("+CREG:") else {
        return false;
    };
    let line = response[start + "+CREG:".len()..]
        .lines()
        .next()
        .unwrap_or("");
    let mut fields = line.split(',').map(str::trim);
    let first = fields.next();
    let stat = match fields.next() {
        Some(second) => second,
        None => first.unwrap_or(""),
    };
    matches!(stat.parse::<u8>(), Ok(1 | 5))
}

// ───────────────────────────────────────────────────────────────
// AT channel
// ───────────────────────────────────────────────────────────────

/// Byte pipe to the modem.
pub trait AtChannel {
    fn send(&mut self, bytes: &[u8]) -> Result<(), CommsError>;

    /// Read whatever arrives within `timeout_ms`; `Ok(0)` on silence.
    fn recv(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, CommsError>;

    /// Discard unread input.
    fn flush_input(&mut self) {
        let mut scratch = [0u8; 32];
        while matches!(self.recv(&mut scratch, 0), Ok(n) if n > 0) {}
    }
}

// ───────────────────────────────────────────────────────────────
// Adapter
// ───────────────────────────────────────────────────────────────

pub struct GsmAdapter<C, D> {
    chan: C,
    delay: D,
    rx: heapless::Vec<u8, RX_CAPACITY>,
}

impl<C: AtChannel, D: DelayNs> GsmAdapter<C, D> {
    pub fn new(chan: C, delay: D) -> Self {
        Self {
            chan,
            delay,
            rx: heapless::Vec::new(),
        }
    }

    /// Pulse PWRKEY LOW for one second and wait for the module to boot.
    pub fn power_on(&mut self) {
        hw_init::gpio_write(pins::GSM_PWRKEY_GPIO, false);
        self.delay.delay_ms(1000);
        hw_init::gpio_write(pins::GSM_PWRKEY_GPIO, true);
        self.delay.delay_ms(5000);
        // Echo off, so a submitted body never reads back as a result code.
        if self.command("ATE0", COMMAND_TIMEOUT_MS) == SendStatus::Delivered {
            info!("GSM: modem answering");
        } else {
            warn!("GSM: no answer to AT after power-on");
        }
    }

    pub fn channel(&self) -> &C {
        &self.chan
    }

    /// Text received for the last command.
    pub fn last_response(&self) -> &str {
        core::str::from_utf8(&self.rx).unwrap_or("")
    }

    fn write_line(&mut self, line: &str) -> Result<(), CommsError> {
        self.chan.send(line.as_bytes())?;
        self.chan.send(b"\r")
    }

    /// Send one command and wait for its final result code.
    fn command(&mut self, line: &str, timeout_ms: u32) -> SendStatus {
        self.chan.flush_input();
        if let Err(e) = self.write_line(line) {
            warn!("GSM: write '{}' failed: {}", line, e);
            return SendStatus::Rejected;
        }
        self.await_status(timeout_ms)
    }

    fn await_status(&mut self, timeout_ms: u32) -> SendStatus {
        self.rx.clear();
        let mut waited = 0;
        loop {
            if let Err(e) = self.read_some() {
                warn!("GSM: read failed: {}", e);
                return SendStatus::Rejected;
            }
            let status = classify_send(self.last_response());
            if status != SendStatus::Pending || waited >= timeout_ms {
                return status;
            }
            waited += POLL_MS;
        }
    }

    fn await_prompt(&mut self, timeout_ms: u32) -> bool {
        self.rx.clear();
        let mut waited = 0;
        while waited < timeout_ms {
            if self.read_some().is_err() {
                return false;
            }
            if self.rx.contains(&b'>') {
                return true;
            }
            if classify_send(self.last_response()) == SendStatus::Rejected {
                return false;
            }
            waited += POLL_MS;
        }
        false
    }

    /// Append one read to `rx`, keeping only printable ASCII.
    fn read_some(&mut self) -> Result<(), CommsError> {
        let mut buf = [0u8; 64];
        let n = self.chan.recv(&mut buf, POLL_MS)?;
        for &b in &buf[..n] {
            let b = if b.is_ascii() { b } else { b'?' };
            if self.rx.push(b).is_err() {
                // Result codes arrive last; keep the tail.
                self.rx.clear();
                let _ = self.rx.push(b);
            }
        }
        Ok(())
    }
}

impl<C: AtChannel, D: DelayNs> NetworkPort for GsmAdapter<C, D> {
    fn is_registered(&mut self) -> bool {
        let status = self.command("AT+CREG?", COMMAND_TIMEOUT_MS);
        let registered = status == SendStatus::Delivered && parse_creg(self.last_response());
        debug!("GSM: CREG registered={}", registered);
        registered
    }

    fn reconnect(&mut self) -> bool {
        info!("GSM: cycling radio");
        let _ = self.command("AT+CFUN=0", COMMAND_TIMEOUT_MS);
        self.delay.delay_ms(1000);
        let _ = self.command("AT+CFUN=1", COMMAND_TIMEOUT_MS);
        self.delay.delay_ms(2000);
        self.is_registered()
    }
}

impl<C: AtChannel, D: DelayNs> NotificationTransport for GsmAdapter<C, D> {
    fn deliver(&mut self, recipient: &str, message: &str) -> bool {
        if self.command("AT+CMGF=1", COMMAND_TIMEOUT_MS) != SendStatus::Delivered {
            warn!("SMS: text mode refused");
            return false;
        }

        let mut cmgs = heapless::String::<40>::new();
        if core::fmt::write(&mut cmgs, format_args!("AT+CMGS=\"{}\"", recipient)).is_err() {
            warn!("SMS: recipient '{}' too long", recipient);
            return false;
        }
        self.chan.flush_input();
        if self.write_line(&cmgs).is_err() || !self.await_prompt(PROMPT_TIMEOUT_MS) {
            warn!("SMS: no prompt for {}", recipient);
            return false;
        }

        if self.chan.send(message.as_bytes()).is_err() || self.chan.send(&[CTRL_Z]).is_err() {
            warn!("SMS: body write failed for {}", recipient);
            return false;
        }

        match self.await_status(SEND_TIMEOUT_MS) {
            SendStatus::Delivered => {
                info!("SMS: sent to {}", recipient);
                true
            }
            SendStatus::Rejected => {
                warn!("SMS: rejected for {}", recipient);
                false
            }
            SendStatus::Pending => {
                warn!("SMS: timed out for {}", recipient);
                false
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// UART link (device)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use uart::UartLink;

#[cfg(target_os = "espidf")]
mod uart {
    use esp_idf_svc::sys::*;

    use super::AtChannel;
    use crate::drivers::hw_init::HwInitError;
    use crate::error::CommsError;
    use crate::pins;

    const PORT: uart_port_t = uart_port_t_UART_NUM_1;
    const RX_BUFFER: i32 = 1024;

    /// UART1 wired to the modem.
    pub struct UartLink {
        _private: (),
    }

    impl UartLink {
        /// Configure and install the UART driver.  Call once.
        pub fn install() -> Result<Self, HwInitError> {
            let cfg = uart_config_t {
                baud_rate: pins::GSM_BAUD as i32,
                data_bits: uart_word_length_t_UART_DATA_8_BITS,
                parity: uart_parity_t_UART_PARITY_DISABLE,
                stop_bits: uart_stop_bits_t_UART_STOP_BITS_1,
                flow_ctrl: uart_hw_flowcontrol_t_UART_HW_FLOWCTRL_DISABLE,
                ..Default::default()
            };
            // SAFETY: single call from main() before the loop starts.
            unsafe {
                let ret = uart_param_config(PORT, &cfg);
                if ret != ESP_OK {
                    return Err(HwInitError::UartInstallFailed(ret));
                }
                let ret = uart_set_pin(PORT, pins::GSM_TX_GPIO, pins::GSM_RX_GPIO, -1, -1);
                if ret != ESP_OK {
                    return Err(HwInitError::UartInstallFailed(ret));
                }
                let ret = uart_driver_install(PORT, RX_BUFFER, 0, 0, core::ptr::null_mut(), 0);
                if ret != ESP_OK {
                    return Err(HwInitError::UartInstallFailed(ret));
                }
            }
            log::info!("GSM: UART1 installed at {} baud", pins::GSM_BAUD);
            Ok(Self { _private: () })
        }
    }

    impl AtChannel for UartLink {
        fn send(&mut self, bytes: &[u8]) -> Result<(), CommsError> {
            // SAFETY: driver installed in `install()`; main-loop only.
            let written = unsafe { uart_write_bytes(PORT, bytes.as_ptr().cast(), bytes.len()) };
            if written < 0 || written as usize != bytes.len() {
                return Err(CommsError::UartFailed);
            }
            Ok(())
        }

        fn recv(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, CommsError> {
            let ticks = timeout_ms * configTICK_RATE_HZ / 1000;
            // SAFETY: driver installed in `install()`; `buf` outlives the call.
            let n = unsafe { uart_read_bytes(PORT, buf.as_mut_ptr().cast(), buf.len() as u32, ticks) };
            if n < 0 {
                return Err(CommsError::UartFailed);
            }
            Ok(n as usize)
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Simulated modem (host)
// ───────────────────────────────────────────────────────────────

/// In-memory modem that answers the AT subset the adapter uses.
#[cfg(not(target_os = "espidf"))]
pub struct SimModem {
    pub registered: bool,
    /// Recipients whose submissions are answered with `+CMS ERROR`.
    pub reject: heapless::Vec<heapless::String<20>, 4>,
    /// Registration state after `AT+CFUN=1`.
    pub registered_after_cycle: bool,
    /// Every recipient an SMS body was submitted for.
    pub sent: heapless::Vec<heapless::String<20>, 16>,
    line: heapless::Vec<u8, 200>,
    recipient: heapless::String<20>,
    in_body: bool,
    reply: heapless::Deque<u8, 128>,
}

#[cfg(not(target_os = "espidf"))]
impl Default for SimModem {
    fn default() -> Self {
        Self {
            registered: true,
            reject: heapless::Vec::new(),
            registered_after_cycle: true,
            sent: heapless::Vec::new(),
            line: heapless::Vec::new(),
            recipient: heapless::String::new(),
            in_body: false,
            reply: heapless::Deque::new(),
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl SimModem {
    pub fn new() -> Self {
        Self::default()
    }

    fn answer(&mut self, text: &str) {
        for &b in text.as_bytes() {
            let _ = self.reply.push_back(b);
        }
    }

    fn on_line(&mut self) {
        let line = core::str::from_utf8(&self.line).unwrap_or("");
        let line: heapless::String<200> = heapless::String::try_from(line.trim()).unwrap_or_default();
        self.line.clear();

        if line == "AT+CREG?" {
            let stat = if self.registered { 1 } else { 0 };
            let mut resp = heapless::String::<32>::new();
            let _ = core::fmt::write(&mut resp, format_args!("\r\n+CREG: 0,{}\r\n\r\nOK\r\n", stat));
            self.answer(&resp);
        } else if line == "AT+CFUN=1" {
            self.registered = self.registered_after_cycle;
            self.answer("\r\nOK\r\n");
        } else if let Some(rest) = line.strip_prefix("AT+CMGS=") {
            self.recipient = heapless::String::try_from(rest.trim_matches('"')).unwrap_or_default();
            self.in_body = true;
            self.answer("\r\n> ");
        } else if line.starts_with("AT") {
            self.answer("\r\nOK\r\n");
        }
    }

    fn on_body_end(&mut self) {
        self.in_body = false;
        self.line.clear();
        let _ = self.sent.push(self.recipient.clone());
        if self.reject.iter().any(|r| *r == self.recipient) || !self.registered {
            self.answer("\r\n+CMS ERROR: 500\r\n");
        } else {
            self.answer("\r\n+CMGS: 42\r\n\r\nOK\r\n");
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl AtChannel for SimModem {
    fn send(&mut self, bytes: &[u8]) -> Result<(), CommsError> {
        for &b in bytes {
            match b {
                CTRL_Z if self.in_body => self.on_body_end(),
                b'\r' if !self.in_body => self.on_line(),
                _ => {
                    if self.line.push(b).is_err() {
                        return Err(CommsError::UartFailed);
                    }
                }
            }
        }
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<usize, CommsError> {
        let mut n = 0;
        while n < buf.len() {
            match self.reply.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}
