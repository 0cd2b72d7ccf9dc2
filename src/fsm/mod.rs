//! Function-pointer state machine for the guarded spray sequence.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  StateTable                                              │
//! │  ┌──────────────┬───────────┬──────────────────────────┐ │
//! │  │ StateId      │ on_enter  │ on_update                │ │
//! │  ├──────────────┼───────────┼──────────────────────────┤ │
//! │  │ WeatherCheck │ fn(ctx)   │ fn(ctx) -> Option<next>  │ │
//! │  │ NetworkCheck │ fn(ctx)   │ fn(ctx) -> Option<next>  │ │
//! │  │ Actuate      │ fn(ctx)   │ fn(ctx) -> Option<next>  │ │
//! │  │ Report       │ -         │ fn(ctx) -> Option<next>  │ │
//! │  │ Done         │ -         │ fn(ctx) -> None          │ │
//! │  └──────────────┴───────────┴──────────────────────────┘ │
//! └──────────────────────────────────────────────────────────┘
//!
//!   WeatherCheck ──rain──────────────────────────┐
//!        │ dry                                   ▼
//!   NetworkCheck ──unregistered after retry──▶ Report ──▶ Done
//!        │ registered                            ▲
//!   Actuate ─────────────────────────────────────┘
//! ```
//!
//! One [`SprayEngine::run`] drives a firing from `WeatherCheck` to
//! `Done` without yielding.  There is no way to abort a sequence once
//! started, so a relay is never left half-driven.

pub mod context;
pub mod states;

use context::{SprayContext, SprayReport};
use log::{info, warn};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    WeatherCheck = 0,
    NetworkCheck = 1,
    Actuate = 2,
    Report = 3,
    Done = 4,
}

impl StateId {
    /// Total number of states; sizes the table array.
    pub const COUNT: usize = 5;

    /// Convert an index back to `StateId`.  Out-of-range maps to `Done`.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::WeatherCheck,
            1 => Self::NetworkCheck,
            2 => Self::Actuate,
            3 => Self::Report,
            _ => {
                debug_assert!(idx == 4, "invalid state index: {idx}");
                Self::Done
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Runs once when a state is entered.
pub type StateActionFn = fn(&mut SprayContext<'_, '_>);

/// Returns `Some(next)` to transition, `None` when the sequence is over.
pub type StateUpdateFn = fn(&mut SprayContext<'_, '_>) -> Option<StateId>;

/// Static descriptor for a single state.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct SprayEngine {
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
}

impl Default for SprayEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SprayEngine {
    pub fn new() -> Self {
        Self::with_table(states::build_state_table())
    }

    pub fn with_table(table: [StateDescriptor; StateId::COUNT]) -> Self {
        Self {
            table,
            current: StateId::Done as usize,
        }
    }

    /// Run one firing to completion.
    ///
    /// Every state moves strictly forward, so the loop is bounded by the
    /// table size.
    pub fn run(&mut self, ctx: &mut SprayContext<'_, '_>) -> SprayReport {
        info!("Spray {}: starting", ctx.pump());
        self.enter(StateId::WeatherCheck, ctx);

        for _ in 0..StateId::COUNT {
            match (self.table[self.current].on_update)(ctx) {
                Some(next) => self.transition(next, ctx),
                None => break,
            }
        }

        if self.current_state() != StateId::Done {
            warn!(
                "Spray {}: stopped in {}",
                ctx.pump(),
                self.table[self.current].name
            );
        }
        ctx.report()
    }

    /// The current state's identity.
    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next: StateId, ctx: &mut SprayContext<'_, '_>) {
        info!(
            "Spray {}: {} -> {}",
            ctx.pump(),
            self.table[self.current].name,
            self.table[next as usize].name
        );
        self.enter(next, ctx);
    }

    fn enter(&mut self, id: StateId, ctx: &mut SprayContext<'_, '_>) {
        self.current = id as usize;
        let _ = ctx.trail.push(id);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
