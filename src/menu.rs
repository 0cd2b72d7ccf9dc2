//! Menu / schedule editor.
//!
//! A modal state machine driven by consumed up/down/select edges.  The
//! reset channel never reaches it.
//!
//! ```text
//!            up/down (cyclic)
//!          ┌───────────────┐
//!          ▼               │
//!   ┌─────────────┐  select on "Schedule Pn"  ┌──────────────────────┐
//!   │  Main { i } │──────────────────────────▶│ Scheduling { Hour }  │
//!   └─────────────┘                           └──────────┬───────────┘
//!          ▲                                     select  ▼
//!          │                                  ┌──────────────────────┐
//!          │                                  │ Scheduling { Minute }│
//!          │                                  └──────────┬───────────┘
//!          │                                     select  ▼
//!          │         select (Install)         ┌──────────────────────┐
//!          └──────────────────────────────────│ Scheduling { Confirm}│
//!                                             └──────────────────────┘
//! ```
//!
//! The editor never touches the alarm registry.  Confirming a session
//! returns [`MenuAction::Install`] and the service applies it.

use log::info;
use time::Time;

use crate::drivers::button::Channel;
use crate::scheduler::{MAX_PUMPS, PumpId};

/// One main-menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    ViewTime,
    CancelAll,
    SchedulePump(PumpId),
}

/// Field being edited in a scheduling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Hour,
    Minute,
    Confirm,
}

/// An in-progress scheduling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub pump: PumpId,
    pub field: Field,
    pub hour: u8,
    pub minute: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    Main { selected: usize },
    Scheduling(Session),
}

/// What the service must do after an edge was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    /// Nothing changed.
    None,
    /// State changed; redraw.
    Redraw,
    /// Session confirmed: install `(pump, hour, minute)`.
    Install { pump: PumpId, hour: u8, minute: u8 },
    /// "Cancel all" selected.
    CancelAll,
    /// "View time" selected.
    ShowTime,
}

const MAX_ITEMS: usize = MAX_PUMPS + 2;

pub struct Menu {
    state: MenuState,
    items: heapless::Vec<MenuItem, MAX_ITEMS>,
}

impl Menu {
    /// Build the menu for `pump_count` pumps: three items with one pump,
    /// four with two.
    pub fn new(pump_count: u8) -> Self {
        let mut items = heapless::Vec::new();
        let _ = items.push(MenuItem::ViewTime);
        let _ = items.push(MenuItem::CancelAll);
        for pump in PumpId::all(pump_count) {
            let _ = items.push(MenuItem::SchedulePump(pump));
        }
        Self {
            state: MenuState::Main { selected: 0 },
            items,
        }
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    /// Highlighted item while in the main menu.
    pub fn selected_item(&self) -> Option<MenuItem> {
        match self.state {
            MenuState::Main { selected } => self.items.get(selected).copied(),
            MenuState::Scheduling(_) => None,
        }
    }

    /// Abandon any session and return to the top of the main menu.
    pub fn reset(&mut self) {
        self.state = MenuState::Main { selected: 0 };
    }

    /// Apply one consumed edge.  `now` seeds a new session's hour/minute.
    pub fn handle(&mut self, channel: Channel, now: Time) -> MenuAction {
        match self.state {
            MenuState::Main { selected } => self.handle_main(selected, channel, now),
            MenuState::Scheduling(session) => self.handle_session(session, channel),
        }
    }

    fn handle_main(&mut self, selected: usize, channel: Channel, now: Time) -> MenuAction {
        let n = self.items.len();
        match channel {
            Channel::Up => {
                self.state = MenuState::Main { selected: (selected + n - 1) % n };
                MenuAction::Redraw
            }
            Channel::Down => {
                self.state = MenuState::Main { selected: (selected + 1) % n };
                MenuAction::Redraw
            }
            Channel::Select => match self.items.get(selected).copied() {
                Some(MenuItem::SchedulePump(pump)) => {
                    info!("Menu: scheduling {}", pump);
                    self.state = MenuState::Scheduling(Session {
                        pump,
                        field: Field::Hour,
                        hour: now.hour(),
                        minute: now.minute(),
                    });
                    MenuAction::Redraw
                }
                Some(MenuItem::CancelAll) => MenuAction::CancelAll,
                Some(MenuItem::ViewTime) => MenuAction::ShowTime,
                None => MenuAction::None,
            },
            Channel::Reset => MenuAction::None,
        }
    }

    fn handle_session(&mut self, mut session: Session, channel: Channel) -> MenuAction {
        match (channel, session.field) {
            (Channel::Up, Field::Hour) => session.hour = (session.hour + 1) % 24,
            (Channel::Down, Field::Hour) => session.hour = (session.hour + 23) % 24,
            (Channel::Up, Field::Minute) => session.minute = (session.minute + 1) % 60,
            (Channel::Down, Field::Minute) => session.minute = (session.minute + 59) % 60,
            (Channel::Select, Field::Hour) => session.field = Field::Minute,
            (Channel::Select, Field::Minute) => session.field = Field::Confirm,
            (Channel::Select, Field::Confirm) => {
                info!(
                    "Menu: confirmed {} at {:02}:{:02}",
                    session.pump, session.hour, session.minute
                );
                self.state = MenuState::Main { selected: 0 };
                return MenuAction::Install {
                    pump: session.pump,
                    hour: session.hour,
                    minute: session.minute,
                };
            }
            _ => return MenuAction::None,
        }
        self.state = MenuState::Scheduling(session);
        MenuAction::Redraw
    }
}
