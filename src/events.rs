//! Main-loop event queue.
//!
//! Events are produced by:
//! - the alarm registry (via [`SchedulerDelegate`]) when a schedule fires
//! - the service, for manual spray requests and the reset button
//!
//! Events are consumed by the main control loop, which runs each one to
//! completion before taking the next.  Nothing that produces an event
//! calls into the spray engine directly.
//!
//! ```text
//! ┌────────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ AlarmRegistry  │────▶│              │     │              │
//! │ AppCommand     │────▶│  EventQueue  │────▶│  AppService  │
//! │ Reset button   │────▶│   (owned)    │     │  (consumer)  │
//! └────────────────┘     └──────────────┘     └──────────────┘
//! ```

use heapless::Deque;
use log::warn;

use crate::app::ports::SchedulerDelegate;
use crate::scheduler::{AlarmKind, PumpId, ScheduleEntry};

/// Maximum number of pending events.
const EVENT_QUEUE_CAP: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // ── Schedule ──────────────────────────────────────────
    /// A pump's alarm matched the wall clock.
    AlarmFired { entry: ScheduleEntry, kind: AlarmKind },

    // ── Operator ──────────────────────────────────────────
    /// Run the guarded spray sequence now, outside any schedule.
    SprayRequested(PumpId),
    /// Reset button pressed (after first-activation suppression).
    WifiResetRequested,
}

/// Bounded FIFO owned by the service.
#[derive(Debug, Default)]
pub struct EventQueue {
    queue: Deque<Event, EVENT_QUEUE_CAP>,
    dropped: u32,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an event.  Returns `false` if the queue is full (event dropped).
    pub fn push(&mut self, event: Event) -> bool {
        if self.queue.push_back(event).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            warn!("EventQueue: full, dropped {:?}", event);
            return false;
        }
        true
    }

    /// Pop the next event in FIFO order.
    pub fn pop(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Events lost to a full queue since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl SchedulerDelegate for EventQueue {
    fn on_alarm_fired(&mut self, entry: ScheduleEntry, kind: AlarmKind) {
        self.push(Event::AlarmFired { entry, kind });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut q = EventQueue::new();
        q.push(Event::SprayRequested(PumpId::P2));
        q.push(Event::WifiResetRequested);
        assert_eq!(q.pop(), Some(Event::SprayRequested(PumpId::P2)));
        assert_eq!(q.pop(), Some(Event::WifiResetRequested));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let mut q = EventQueue::new();
        for _ in 0..EVENT_QUEUE_CAP {
            assert!(q.push(Event::WifiResetRequested));
        }
        assert!(!q.push(Event::SprayRequested(PumpId::P1)));
        assert_eq!(q.len(), EVENT_QUEUE_CAP);
        assert_eq!(q.dropped(), 1);
    }

    #[test]
    fn acts_as_scheduler_delegate() {
        let mut q = EventQueue::new();
        let entry = ScheduleEntry { pump: PumpId::P1, hour: 6, minute: 30 };
        q.on_alarm_fired(entry, AlarmKind::Daily);
        assert_eq!(
            q.pop(),
            Some(Event::AlarmFired { entry, kind: AlarmKind::Daily })
        );
    }
}
