//! 16x2 character LCD adapter (HD44780 behind a PCF8574 I²C backpack).
//!
//! Implements [`DisplayPort`].  Every render composes a [`Frame`] of two
//! 16-column lines first; the frame is then pushed over I²C only if it
//! differs from what is already on the glass.  The frame composition is
//! pure, so host tests check the text without a bus.
//!
//! ```text
//!  ┌────────────────┐   ┌────────────────┐   ┌────────────────┐
//!  │> Schedule P1   │   │P1 Set 06:30    │   │06:29:58 01/05  │
//!  │  item 3/4      │   │       ^^       │   │Next P1 06:30   │
//!  └────────────────┘   └────────────────┘   └────────────────┘
//!     main menu           scheduling           view time
//! ```

use core::fmt::{self, Write as _};

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::warn;
use time::PrimitiveDateTime;

use crate::app::ports::DisplayPort;
use crate::menu::{Field, MenuItem, Session};
use crate::scheduler::PumpId;

pub const COLS: usize = 16;
/// PCF8574 default address with A0..A2 open.
pub const DEFAULT_ADDRESS: u8 = 0x27;

pub type Line = heapless::String<COLS>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub top: Line,
    pub bottom: Line,
}

/// Writer that silently drops whatever does not fit in one line.
struct Truncate<'a>(&'a mut Line);

impl fmt::Write for Truncate<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            let c = if c.is_ascii() { c } else { '?' };
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

fn line(args: fmt::Arguments<'_>) -> Line {
    let mut l = Line::new();
    let _ = Truncate(&mut l).write_fmt(args);
    l
}

fn item_label(item: MenuItem) -> Line {
    match item {
        MenuItem::ViewTime => line(format_args!("View time")),
        MenuItem::CancelAll => line(format_args!("Cancel all")),
        MenuItem::SchedulePump(p) => line(format_args!("Schedule {}", p)),
    }
}

// ── Frame composition ─────────────────────────────────────────

pub fn menu_frame(item: MenuItem, position: usize, count: usize) -> Frame {
    Frame {
        top: line(format_args!("> {}", item_label(item))),
        bottom: line(format_args!("  item {}/{}", position + 1, count)),
    }
}

pub fn scheduling_frame(session: &Session) -> Frame {
    let top = line(format_args!(
        "{} Set {:02}:{:02}",
        session.pump, session.hour, session.minute
    ));
    let bottom = match session.field {
        Field::Hour => line(format_args!("       ^^")),
        Field::Minute => line(format_args!("          ^^")),
        Field::Confirm => line(format_args!("Select=confirm")),
    };
    Frame { top, bottom }
}

pub fn time_frame(now: PrimitiveDateTime, next: Option<(PumpId, PrimitiveDateTime)>) -> Frame {
    let top = line(format_args!(
        "{:02}:{:02}:{:02} {:02}/{:02}",
        now.hour(),
        now.minute(),
        now.second(),
        now.day(),
        u8::from(now.month())
    ));
    let bottom = match next {
        Some((pump, at)) => line(format_args!("Next {} {:02}:{:02}", pump, at.hour(), at.minute())),
        None => line(format_args!("No schedule")),
    };
    Frame { top, bottom }
}

pub fn status_frame(top: &str, bottom: &str) -> Frame {
    Frame {
        top: line(format_args!("{}", top)),
        bottom: line(format_args!("{}", bottom)),
    }
}

// ── HD44780 over PCF8574 ──────────────────────────────────────

const RS: u8 = 0x01;
const EN: u8 = 0x04;
const BACKLIGHT: u8 = 0x08;

const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_MODE: u8 = 0x06;
const CMD_DISPLAY_ON: u8 = 0x0C;
const CMD_FUNCTION_4BIT_2LINE: u8 = 0x28;
const CMD_SET_DDRAM: u8 = 0x80;
const ROW_OFFSETS: [u8; 2] = [0x00, 0x40];

pub struct LcdDisplay<I> {
    bus: I,
    address: u8,
    frame: Frame,
    shown: Option<Frame>,
    bus_errors: u32,
}

impl<I: I2c> LcdDisplay<I> {
    pub fn new(bus: I, address: u8) -> Self {
        Self {
            bus,
            address,
            frame: Frame::default(),
            shown: None,
            bus_errors: 0,
        }
    }

    /// Power-on initialisation into 4-bit, two-line mode.
    pub fn init(&mut self, delay: &mut impl DelayNs) {
        delay.delay_ms(50);
        // Three 8-bit function sets, then switch to 4-bit.
        for _ in 0..3 {
            self.nibble(0x30, 0);
            delay.delay_ms(5);
        }
        self.nibble(0x20, 0);
        for cmd in [CMD_FUNCTION_4BIT_2LINE, CMD_DISPLAY_ON, CMD_CLEAR, CMD_ENTRY_MODE] {
            self.byte(cmd, 0);
            delay.delay_ms(2);
        }
        self.shown = None;
    }

    /// Last composed frame.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn bus_errors(&self) -> u32 {
        self.bus_errors
    }

    fn present(&mut self, frame: Frame) {
        self.frame = frame;
        if self.shown.as_ref() == Some(&self.frame) {
            return;
        }
        let errors_before = self.bus_errors;
        let rows = [self.frame.top.clone(), self.frame.bottom.clone()];
        for (row, text) in rows.iter().enumerate() {
            self.byte(CMD_SET_DDRAM | ROW_OFFSETS[row], 0);
            for col in 0..COLS {
                let c = text.as_bytes().get(col).copied().unwrap_or(b' ');
                self.byte(c, RS);
            }
        }
        // Redraw everything next time if any write failed.
        self.shown = (self.bus_errors == errors_before).then(|| self.frame.clone());
    }

    fn byte(&mut self, value: u8, mode: u8) {
        self.nibble(value & 0xF0, mode);
        self.nibble(value << 4, mode);
    }

    fn nibble(&mut self, high_bits: u8, mode: u8) {
        let data = (high_bits & 0xF0) | mode | BACKLIGHT;
        if self.bus.write(self.address, &[data | EN, data]).is_err() {
            self.bus_errors = self.bus_errors.saturating_add(1);
            if self.bus_errors == 1 {
                warn!("LCD: I2C write to 0x{:02x} failed", self.address);
            }
        }
    }
}

impl<I: I2c> DisplayPort for LcdDisplay<I> {
    fn render_menu(&mut self, item: MenuItem, position: usize, count: usize) {
        self.present(menu_frame(item, position, count));
    }

    fn render_scheduling(&mut self, session: &Session) {
        self.present(scheduling_frame(session));
    }

    fn show_time(&mut self, now: PrimitiveDateTime, next: Option<(PumpId, PrimitiveDateTime)>) {
        self.present(time_frame(now, next));
    }

    fn show_status(&mut self, top: &str, bottom: &str) {
        self.present(status_frame(top, bottom));
    }
}
