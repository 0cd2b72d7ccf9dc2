//! Alarm registry.
//!
//! Holds at most one live alarm per pump.  The registry is the single
//! writer of schedule state: the menu, remote commands and the spray
//! engine all go through [`AlarmRegistry::install`],
//! [`AlarmRegistry::cancel`] and [`AlarmRegistry::reschedule_tomorrow`].
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Alarm sources                          │
//! │                                                              │
//! │   ┌──────────────┐   ┌──────────────┐   ┌────────────────┐   │
//! │   │ Menu confirm │   │ AppCommand   │   │ Rain postpone  │   │
//! │   │  (install)   │   │ (install /   │   │ (one-shot,     │   │
//! │   │              │   │  cancel)     │   │  tomorrow)     │   │
//! │   └──────┬───────┘   └──────┬───────┘   └───────┬────────┘   │
//! │          └──────────────────┼───────────────────┘            │
//! │                             ▼                                │
//! │                ┌─────────────────────────┐                   │
//! │                │ AlarmRegistry.tick(now) │                   │
//! │                └────────────┬────────────┘                   │
//! │                             ▼                                │
//! │                    SchedulerDelegate                         │
//! │              (EventQueue → spray engine)                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Alarms are matched against the wall clock, never against tick
//! counts, so a late or irregular tick cannot shift a schedule.
//! Nothing here is persisted; schedules are lost on restart.

use core::fmt;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use time::{Date, Duration, PrimitiveDateTime, Time};

use crate::app::ports::SchedulerDelegate;
use crate::error::RegistryError;

/// Hard upper bound on fitted pumps.  The configured count may be lower.
pub const MAX_PUMPS: usize = 2;

// ═══════════════════════════════════════════════════════════════
//  Identifiers
// ═══════════════════════════════════════════════════════════════

/// Zero-based pump index.  Displayed 1-based ("P1", "P2").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PumpId(u8);

impl PumpId {
    pub const P1: Self = Self(0);
    pub const P2: Self = Self(1);

    /// Build from the operator-facing 1-based number, checked against the
    /// number of fitted pumps.
    pub fn from_number(number: u8, pump_count: u8) -> Result<Self, RegistryError> {
        let fitted = pump_count.min(MAX_PUMPS as u8);
        if (1..=fitted).contains(&number) {
            Ok(Self(number - 1))
        } else {
            Err(RegistryError::InvalidPump(number))
        }
    }

    /// Build from a zero-based index.  `None` past [`MAX_PUMPS`].
    pub fn from_index(index: usize) -> Option<Self> {
        (index < MAX_PUMPS).then_some(Self(index as u8))
    }

    /// All pumps of an installation with `pump_count` pumps.
    pub fn all(pump_count: u8) -> impl Iterator<Item = Self> {
        (0..usize::from(pump_count).min(MAX_PUMPS)).map(|i| Self(i as u8))
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// 1-based number as shown to the operator.
    pub fn number(self) -> u8 {
        self.0 + 1
    }
}

impl fmt::Display for PumpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.number())
    }
}

/// Opaque alarm handle.  [`AlarmId::INVALID`] marks "no alarm".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlarmId(u16);

impl AlarmId {
    pub const INVALID: Self = Self(0);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// How an alarm repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmKind {
    /// Fires at the same hour:minute every day until cancelled.
    Daily,
    /// Fires once (rain postponement).
    OneShot,
}

/// `(pump, hour, minute)`: the schedule an alarm is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub pump: PumpId,
    pub hour: u8,
    pub minute: u8,
}

impl ScheduleEntry {
    fn time(&self) -> Time {
        // Fields were validated on the way in.
        Time::from_hms(self.hour, self.minute, 0).unwrap_or(Time::MIDNIGHT)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Registry
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct Slot {
    entry: ScheduleEntry,
    alarm: AlarmId,
    kind: AlarmKind,
    next_due: PrimitiveDateTime,
    /// Daily time to fall back to after a one-shot fires.
    resume_daily: Option<Time>,
    /// Date of the most recent firing.  A daily alarm never re-arms on
    /// or before it.
    last_fired: Option<Date>,
}

pub struct AlarmRegistry {
    slots: [Option<Slot>; MAX_PUMPS],
    last_id: u16,
}

impl Default for AlarmRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmRegistry {
    pub fn new() -> Self {
        Self {
            slots: [None, None],
            last_id: 0,
        }
    }

    /// Install (or replace) the daily alarm for `pump`.
    ///
    /// Any existing alarm for the pump is released first, so repeated
    /// installs never leave more than one live alarm.
    pub fn install(
        &mut self,
        pump: PumpId,
        hour: u8,
        minute: u8,
        now: PrimitiveDateTime,
    ) -> Result<AlarmId, RegistryError> {
        let at = checked_time(hour, minute)?;
        self.release(pump);

        let alarm = self.allocate();
        self.slots[pump.index()] = Some(Slot {
            entry: ScheduleEntry { pump, hour, minute },
            alarm,
            kind: AlarmKind::Daily,
            next_due: next_daily(at, now),
            resume_daily: None,
            last_fired: None,
        });
        info!("Scheduler: {} daily at {:02}:{:02} (alarm {})", pump, hour, minute, alarm.0);
        Ok(alarm)
    }

    /// Cancel the alarm for `pump`.  Returns whether one existed.
    pub fn cancel(&mut self, pump: PumpId) -> bool {
        let existed = self.release(pump);
        if existed {
            info!("Scheduler: {} cancelled", pump);
        } else {
            warn!("Scheduler: cancel {}: nothing scheduled", pump);
        }
        existed
    }

    /// Cancel every pump's alarm.  Returns how many were live.
    pub fn cancel_all(&mut self) -> usize {
        let mut count = 0;
        for index in 0..MAX_PUMPS {
            if let Some(pump) = PumpId::from_index(index) {
                if self.release(pump) {
                    count += 1;
                }
            }
        }
        info!("Scheduler: all alarms cancelled ({} live)", count);
        count
    }

    /// Replace the pump's alarm with a one-shot due tomorrow at
    /// `hour:minute`.  Other pumps are untouched.
    ///
    /// If the pump had a daily schedule, it resumes after the one-shot
    /// fires; otherwise the entry is dropped at that point.
    pub fn reschedule_tomorrow(
        &mut self,
        pump: PumpId,
        hour: u8,
        minute: u8,
        now: PrimitiveDateTime,
    ) -> Result<AlarmId, RegistryError> {
        let at = checked_time(hour, minute)?;
        let previous = self.slots[pump.index()].as_ref();
        let resume_daily = previous.and_then(|s| match s.kind {
            AlarmKind::Daily => Some(s.entry.time()),
            AlarmKind::OneShot => s.resume_daily,
        });
        let last_fired = previous.and_then(|s| s.last_fired);
        self.release(pump);

        let alarm = self.allocate();
        let due = (now + Duration::DAY).date().with_time(at);
        self.slots[pump.index()] = Some(Slot {
            entry: ScheduleEntry { pump, hour, minute },
            alarm,
            kind: AlarmKind::OneShot,
            next_due: due,
            resume_daily,
            last_fired,
        });
        info!("Scheduler: {} postponed to {} {:02}:{:02}", pump, due.date(), hour, minute);
        Ok(alarm)
    }

    /// Fire every alarm whose due time has passed.
    ///
    /// Firings are reported to `delegate`; nothing is dispatched from
    /// inside the registry.  A daily alarm that missed several days
    /// (clock jump) fires once and re-arms for the next future slot.
    pub fn tick(&mut self, now: PrimitiveDateTime, delegate: &mut dyn SchedulerDelegate) {
        for slot in self.slots.iter_mut() {
            let Some(s) = slot.as_mut() else { continue };

            // Clock moved backwards by more than a day: re-anchor, but
            // never onto a day that already fired.
            if s.kind == AlarmKind::Daily && s.next_due > now + Duration::DAY {
                s.next_due = rearm_daily(s.entry.time(), now, s.last_fired);
            }

            if s.next_due > now {
                continue;
            }

            info!("Scheduler: {} {:?} alarm fired", s.entry.pump, s.kind);
            delegate.on_alarm_fired(s.entry, s.kind);
            s.last_fired = Some(now.date());

            match (s.kind, s.resume_daily) {
                (AlarmKind::Daily, _) => {
                    s.next_due = rearm_daily(s.entry.time(), now, s.last_fired);
                }
                (AlarmKind::OneShot, Some(at)) => {
                    s.kind = AlarmKind::Daily;
                    s.entry.hour = at.hour();
                    s.entry.minute = at.minute();
                    s.next_due = rearm_daily(at, now, s.last_fired);
                    s.resume_daily = None;
                }
                (AlarmKind::OneShot, None) => {
                    *slot = None;
                }
            }
        }
    }

    /// Schedule entry for `pump`, if any.
    pub fn entry(&self, pump: PumpId) -> Option<ScheduleEntry> {
        self.slots[pump.index()].as_ref().map(|s| s.entry)
    }

    /// Alarm handle for `pump`; [`AlarmId::INVALID`] when none.
    pub fn alarm_id(&self, pump: PumpId) -> AlarmId {
        self.slots[pump.index()]
            .as_ref()
            .map_or(AlarmId::INVALID, |s| s.alarm)
    }

    pub fn kind(&self, pump: PumpId) -> Option<AlarmKind> {
        self.slots[pump.index()].as_ref().map(|s| s.kind)
    }

    /// When the pump's alarm fires next.
    pub fn due_at(&self, pump: PumpId) -> Option<PrimitiveDateTime> {
        self.slots[pump.index()].as_ref().map(|s| s.next_due)
    }

    /// Earliest pending firing across all pumps.
    pub fn next_due(&self) -> Option<(PumpId, PrimitiveDateTime)> {
        self.slots
            .iter()
            .flatten()
            .map(|s| (s.entry.pump, s.next_due))
            .min_by_key(|&(_, due)| due)
    }

    /// Number of live alarms.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn release(&mut self, pump: PumpId) -> bool {
        self.slots[pump.index()].take().is_some()
    }

    fn allocate(&mut self) -> AlarmId {
        self.last_id = self.last_id.wrapping_add(1);
        if self.last_id == 0 {
            self.last_id = 1;
        }
        AlarmId(self.last_id)
    }
}

fn checked_time(hour: u8, minute: u8) -> Result<Time, RegistryError> {
    Time::from_hms(hour, minute, 0).map_err(|_| RegistryError::InvalidTime { hour, minute })
}

/// Today at `at` if still ahead of `now`, otherwise tomorrow.
fn next_daily(at: Time, now: PrimitiveDateTime) -> PrimitiveDateTime {
    let today = now.date().with_time(at);
    if today > now { today } else { today + Duration::DAY }
}

/// [`next_daily`], pushed past the day of the last firing.
fn rearm_daily(at: Time, now: PrimitiveDateTime, last_fired: Option<Date>) -> PrimitiveDateTime {
    let due = next_daily(at, now);
    match last_fired {
        Some(fired) if due.date() <= fired => fired.with_time(at) + Duration::DAY,
        _ => due,
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
