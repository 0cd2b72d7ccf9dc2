//! Buzzer + LED feedback pattern engine with priority-based selection.
//!
//! Pattern requests are fire-and-forget; the main loop calls `tick()`
//! every poll and writes the returned [`Levels`] to the buzzer and the
//! two indicator LEDs.  When a pattern finishes the outputs fall back to
//! the idle "system OK" indication (OK LED on, everything else off).
//!
//! ## Priority hierarchy (highest first)
//!
//! 1. **Error**: long beep, error LED held
//! 2. **Alert**: three beeps, both LEDs
//! 3. **Success**: two short beeps, OK LED
//! 4. **Start**: one beep
//!
//! A lower-priority request never interrupts a running higher one; it is
//! dropped.  An equal or higher request restarts the timeline.
//!
//! | Pattern | Timeline                                       | Length  |
//! |---------|------------------------------------------------|---------|
//! | Start   | beep 0-200                                     | 200 ms  |
//! | Success | beep 0-100, 200-300; OK LED whole pattern      | 1000 ms |
//! | Alert   | beep 0-150, 300-450, 600-750; both LEDs        | 1500 ms |
//! | Error   | beep 0-1000; error LED whole pattern           | 3000 ms |

/// Output levels for one tick (`true` = driven HIGH).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Levels {
    pub buzzer: bool,
    pub led_ok: bool,
    pub led_error: bool,
}

/// Idle indication: system OK.
pub const IDLE: Levels = Levels {
    buzzer: false,
    led_ok: true,
    led_error: false,
};

/// Pattern identifier, ordered by priority (lowest first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PatternId {
    Start,
    Success,
    Alert,
    Error,
}

impl PatternId {
    pub fn duration_ms(self) -> u32 {
        match self {
            Self::Start => 200,
            Self::Success => 1000,
            Self::Alert => 1500,
            Self::Error => 3000,
        }
    }
}

/// Feedback engine. Stack-allocated, no heap, `Copy` so adapters can
/// keep it in a `Cell`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackEngine {
    phase_ms: u32,
    active: Option<PatternId>,
}

impl FeedbackEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a pattern.  Returns `false` if a higher-priority pattern
    /// is still running and the request was dropped.
    pub fn request(&mut self, pattern: PatternId) -> bool {
        if let Some(current) = self.active {
            if pattern < current {
                log::debug!("Feedback: {:?} dropped, {:?} running", pattern, current);
                return false;
            }
        }
        self.active = Some(pattern);
        self.phase_ms = 0;
        true
    }

    pub fn active(&self) -> Option<PatternId> {
        self.active
    }

    /// Stop any running pattern and return to idle.
    pub fn clear(&mut self) {
        self.active = None;
        self.phase_ms = 0;
    }

    /// Levels for the current phase, then advance by `delta_ms`.
    pub fn tick(&mut self, delta_ms: u32) -> Levels {
        let Some(pattern) = self.active else {
            return IDLE;
        };
        if self.phase_ms >= pattern.duration_ms() {
            self.clear();
            return IDLE;
        }
        let levels = Self::generate(pattern, self.phase_ms);
        self.phase_ms = self.phase_ms.saturating_add(delta_ms);
        levels
    }

    fn generate(pattern: PatternId, t: u32) -> Levels {
        match pattern {
            PatternId::Start => Levels {
                buzzer: t < 200,
                led_ok: true,
                led_error: false,
            },
            PatternId::Success => Levels {
                buzzer: t < 100 || (200..300).contains(&t),
                led_ok: true,
                led_error: false,
            },
            PatternId::Alert => Levels {
                buzzer: (t % 300) < 150 && t < 900,
                led_ok: true,
                led_error: true,
            },
            PatternId::Error => Levels {
                buzzer: t < 1000,
                led_ok: false,
                led_error: true,
            },
        }
    }
}
