//! Debounced front-panel input.
//!
//! ## Hardware
//!
//! Four active-low momentary switches with internal pull-ups.  The main
//! loop samples all four lines every poll interval and hands the raw
//! levels to [`DebouncedInput::poll`]; no ISR is involved.
//!
//! ## Debounce
//!
//! A raw level change restarts the channel's settle timer.  Once the raw
//! level has been stable for the debounce window and differs from the
//! committed level, it is committed.  A committed press (LOW) latches a
//! pending edge that stays set until the consumer [`take`]s it, so
//! re-polling while latched never produces a second edge.
//!
//! The reset channel's first latched edge after boot is swallowed: the
//! line can read LOW while the board is still powering up.
//!
//! [`take`]: DebouncedInput::take

use log::debug;

/// Default debounce window.
pub const DEBOUNCE_MS: u32 = 50;

/// Logical role of a button.  Order matches [`crate::pins::BUTTON_GPIOS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Reset = 0,
    Up = 1,
    Down = 2,
    Select = 3,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Reset, Channel::Up, Channel::Down, Channel::Select];
}

/// A newly latched press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressEdge {
    pub channel: Channel,
    pub at_ms: u32,
}

#[derive(Debug, Clone, Copy)]
struct ButtonChannel {
    /// Last committed level (`true` = HIGH = released).
    stable: bool,
    last_raw: bool,
    changed_at_ms: u32,
    pending: bool,
}

impl ButtonChannel {
    const fn released() -> Self {
        Self {
            stable: true,
            last_raw: true,
            changed_at_ms: 0,
            pending: false,
        }
    }
}

pub struct DebouncedInput {
    channels: [ButtonChannel; 4],
    debounce_ms: u32,
    reset_armed: bool,
}

impl DebouncedInput {
    pub fn new(debounce_ms: u32) -> Self {
        Self {
            channels: [ButtonChannel::released(); 4],
            debounce_ms,
            reset_armed: false,
        }
    }

    /// Feed one sample of all four raw levels (`true` = HIGH).
    ///
    /// Returns the edges latched by this poll.  Edges already pending
    /// from earlier polls are not repeated.
    pub fn poll(&mut self, raw: [bool; 4], now_ms: u32) -> heapless::Vec<PressEdge, 4> {
        let mut edges = heapless::Vec::new();

        for (ch, (state, level)) in Channel::ALL
            .iter()
            .zip(self.channels.iter_mut().zip(raw))
        {
            if level != state.last_raw {
                state.last_raw = level;
                state.changed_at_ms = now_ms;
                continue;
            }

            if now_ms.wrapping_sub(state.changed_at_ms) < self.debounce_ms || level == state.stable {
                continue;
            }

            state.stable = level;
            if level {
                continue; // released
            }

            if *ch == Channel::Reset && !self.reset_armed {
                self.reset_armed = true;
                debug!("Input: first reset edge suppressed");
                continue;
            }

            if !state.pending {
                state.pending = true;
                // Capacity equals channel count.
                let _ = edges.push(PressEdge { channel: *ch, at_ms: now_ms });
            }
        }

        edges
    }

    /// Change the settle window.  Latched edges and the reset guard are
    /// kept.
    pub fn set_debounce_ms(&mut self, debounce_ms: u32) {
        self.debounce_ms = debounce_ms;
    }

    /// Consume the latched edge on `channel`.  `true` if one was pending.
    pub fn take(&mut self, channel: Channel) -> bool {
        let state = &mut self.channels[channel as usize];
        core::mem::replace(&mut state.pending, false)
    }

    /// Channels with an unconsumed edge.
    pub fn pending(&self) -> heapless::Vec<Channel, 4> {
        Channel::ALL
            .iter()
            .copied()
            .filter(|ch| self.channels[*ch as usize].pending)
            .collect()
    }

    /// Committed level of `channel` (`true` = pressed).
    pub fn is_pressed(&self, channel: Channel) -> bool {
        !self.channels[channel as usize].stable
    }
}
