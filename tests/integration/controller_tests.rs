//! Integration tests for the input → menu → alarm registry path.
//!
//! Buttons are driven through `AppService::poll_inputs` with raw levels,
//! so debounce, edge latching and the menu state machine are exercised
//! together the way the main loop drives them.

use cropspray::app::commands::AppCommand;
use cropspray::app::events::AppEvent;
use cropspray::app::service::AppService;
use cropspray::config::SystemConfig;
use cropspray::drivers::button::Channel;
use cropspray::error::{Error, RegistryError};
use cropspray::menu::{Field, MenuItem, MenuState};
use cropspray::scheduler::{PumpId, ScheduleEntry};
use time::PrimitiveDateTime;
use time::macros::datetime;

use crate::mock_hw::{Call, RecordingSink, Rig};

const NOW: PrimitiveDateTime = datetime!(2024-05-01 09:15);

/// Drives the four button lines with a monotonic millisecond counter.
struct Panel {
    t_ms: u32,
}

impl Panel {
    fn new() -> Self {
        Self { t_ms: 1000 }
    }

    /// One clean press and release, each held past the debounce window.
    fn press(&mut self, app: &mut AppService, rig: &mut Rig, sink: &mut RecordingSink, ch: Channel) {
        let mut down = [true; 4];
        down[ch as usize] = false;
        for (levels, dt) in [(down, 0), (down, 50), ([true; 4], 10), ([true; 4], 50)] {
            self.t_ms += dt;
            app.poll_inputs(levels, self.t_ms, NOW, &mut rig.display, sink);
        }
        self.t_ms += 10;
    }

    fn press_n(
        &mut self,
        app: &mut AppService,
        rig: &mut Rig,
        sink: &mut RecordingSink,
        ch: Channel,
        n: usize,
    ) {
        for _ in 0..n {
            self.press(app, rig, sink, ch);
        }
    }
}

fn make_app(config: SystemConfig) -> (AppService, Rig, RecordingSink) {
    let mut app = AppService::new(config);
    let mut rig = Rig::new();
    let mut sink = RecordingSink::default();
    app.start(&mut rig.display, &mut sink);
    (app, rig, sink)
}

#[test]
fn start_renders_first_menu_item() {
    let (_app, rig, sink) = make_app(SystemConfig::default());
    assert_eq!(
        rig.calls(),
        vec![Call::Menu { item: MenuItem::ViewTime, position: 0 }]
    );
    assert!(matches!(sink.events[..], [AppEvent::Started { pump_count: 2 }]));
}

#[test]
fn menu_scenario_wraps_hour_past_midnight() {
    let (mut app, mut rig, mut sink) = make_app(SystemConfig::default());
    let mut panel = Panel::new();

    panel.press_n(&mut app, &mut rig, &mut sink, Channel::Up, 2);
    assert_eq!(app.menu_state(), MenuState::Main { selected: 2 });

    panel.press(&mut app, &mut rig, &mut sink, Channel::Select);
    panel.press_n(&mut app, &mut rig, &mut sink, Channel::Up, 25);
    panel.press_n(&mut app, &mut rig, &mut sink, Channel::Select, 2);

    let MenuState::Scheduling(session) = app.menu_state() else {
        panic!("expected an open session, got {:?}", app.menu_state());
    };
    assert_eq!(session.field, Field::Confirm);
    assert_eq!(session.hour, (9 + 25) % 24);
    assert_eq!(app.registry().active_count(), 0, "nothing installed before confirm");

    panel.press(&mut app, &mut rig, &mut sink, Channel::Select);
    assert_eq!(
        app.registry().entry(PumpId::P1),
        Some(ScheduleEntry { pump: PumpId::P1, hour: 10, minute: 15 })
    );
    assert_eq!(app.menu_state(), MenuState::Main { selected: 0 });
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::ScheduleInstalled { pump: PumpId::P1, hour: 10, minute: 15, .. }
    )));
}

#[test]
fn rescheduling_same_pump_replaces_entry() {
    let (mut app, mut rig, mut sink) = make_app(SystemConfig::default());
    let mut panel = Panel::new();

    for minute_steps in [0, 3] {
        panel.press_n(&mut app, &mut rig, &mut sink, Channel::Up, 2);
        panel.press(&mut app, &mut rig, &mut sink, Channel::Select);
        panel.press(&mut app, &mut rig, &mut sink, Channel::Select);
        panel.press_n(&mut app, &mut rig, &mut sink, Channel::Down, minute_steps);
        panel.press_n(&mut app, &mut rig, &mut sink, Channel::Select, 2);
    }

    assert_eq!(app.registry().active_count(), 1);
    assert_eq!(
        app.registry().entry(PumpId::P1),
        Some(ScheduleEntry { pump: PumpId::P1, hour: 9, minute: 12 })
    );
}

#[test]
fn held_button_latches_one_edge() {
    let (mut app, mut rig, mut sink) = make_app(SystemConfig::default());
    let up = [true, false, true, true];
    for t in (1000..3000).step_by(10) {
        app.poll_inputs(up, t, NOW, &mut rig.display, &mut sink);
    }
    assert_eq!(app.menu_state(), MenuState::Main { selected: 3 });
}

#[test]
fn bounce_shorter_than_window_is_ignored() {
    let (mut app, mut rig, mut sink) = make_app(SystemConfig::default());
    let up = [true, false, true, true];
    let mut t = 1000;
    for _ in 0..20 {
        app.poll_inputs(up, t, NOW, &mut rig.display, &mut sink);
        app.poll_inputs([true; 4], t + 20, NOW, &mut rig.display, &mut sink);
        t += 40;
    }
    assert_eq!(app.menu_state(), MenuState::Main { selected: 0 });
}

#[test]
fn first_reset_press_is_swallowed() {
    let (mut app, mut rig, mut sink) = make_app(SystemConfig::default());
    let mut panel = Panel::new();

    panel.press(&mut app, &mut rig, &mut sink, Channel::Reset);
    assert_eq!(app.pending_events(), 0);

    panel.press(&mut app, &mut rig, &mut sink, Channel::Reset);
    assert_eq!(app.pending_events(), 1);

    let reports = app.dispatch(NOW, &mut rig.ports(), &mut sink);
    assert!(reports.is_empty());
    assert!(matches!(sink.events.last(), Some(AppEvent::WifiResetRequested)));
    assert!(rig.relay_calls().is_empty());
    assert_eq!(app.menu_state(), MenuState::Main { selected: 0 });
}

#[test]
fn cancel_all_from_menu_clears_every_pump() {
    let (mut app, mut rig, mut sink) = make_app(SystemConfig::default());
    app.handle_command(AppCommand::Schedule { pump: 1, hour: 6, minute: 0 }, NOW, &mut sink)
        .unwrap();
    app.handle_command(AppCommand::Schedule { pump: 2, hour: 7, minute: 0 }, NOW, &mut sink)
        .unwrap();

    let mut panel = Panel::new();
    panel.press(&mut app, &mut rig, &mut sink, Channel::Down);
    panel.press(&mut app, &mut rig, &mut sink, Channel::Select);

    assert_eq!(app.registry().active_count(), 0);
    assert!(matches!(sink.events.last(), Some(AppEvent::AllCancelled { count: 2 })));
    assert_eq!(app.menu_state(), MenuState::Main { selected: 1 });
}

#[test]
fn view_time_shows_next_due_spray() {
    let (mut app, mut rig, mut sink) = make_app(SystemConfig::default());
    app.handle_command(AppCommand::Schedule { pump: 2, hour: 6, minute: 15 }, NOW, &mut sink)
        .unwrap();
    rig.clear();

    Panel::new().press(&mut app, &mut rig, &mut sink, Channel::Select);

    assert_eq!(
        rig.calls(),
        vec![Call::Time { next: Some((PumpId::P2, datetime!(2024-05-02 06:15))) }]
    );
}

#[test]
fn single_pump_menu_has_three_items() {
    let (mut app, mut rig, mut sink) = make_app(SystemConfig {
        pump_count: 1,
        ..SystemConfig::default()
    });
    rig.clear();

    Panel::new().press(&mut app, &mut rig, &mut sink, Channel::Up);
    assert_eq!(
        rig.calls(),
        vec![Call::Menu { item: MenuItem::SchedulePump(PumpId::P1), position: 2 }]
    );
}

#[test]
fn cancel_of_missing_schedule_reports_no_entry() {
    let (mut app, _rig, mut sink) = make_app(SystemConfig::default());
    app.handle_command(AppCommand::Cancel(2), NOW, &mut sink).unwrap();
    assert!(matches!(
        sink.events.last(),
        Some(AppEvent::ScheduleCancelled { pump: PumpId::P2, existed: false })
    ));
}

#[test]
fn invalid_pump_and_time_are_rejected_not_fatal() {
    let (mut app, _rig, mut sink) = make_app(SystemConfig::default());

    assert_eq!(
        app.handle_command(AppCommand::SprayNow(3), NOW, &mut sink),
        Err(Error::Registry(RegistryError::InvalidPump(3)))
    );
    assert_eq!(
        app.handle_command(AppCommand::Schedule { pump: 1, hour: 6, minute: 60 }, NOW, &mut sink),
        Err(Error::Registry(RegistryError::InvalidTime { hour: 6, minute: 60 }))
    );
    assert_eq!(app.registry().active_count(), 0);
    assert_eq!(app.pending_events(), 0);
    let rejected = sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::CommandRejected(_)))
        .count();
    assert_eq!(rejected, 2);
}

#[test]
fn reset_press_after_config_update_is_not_swallowed() {
    let (mut app, mut rig, mut sink) = make_app(SystemConfig::default());
    let mut panel = Panel::new();

    panel.press(&mut app, &mut rig, &mut sink, Channel::Reset);
    panel.press(&mut app, &mut rig, &mut sink, Channel::Reset);
    assert_eq!(app.pending_events(), 1);

    app.handle_command(
        AppCommand::UpdateConfig(SystemConfig {
            sms_retry_delay_secs: 6,
            ..SystemConfig::default()
        }),
        NOW,
        &mut sink,
    )
    .unwrap();

    panel.press(&mut app, &mut rig, &mut sink, Channel::Reset);
    assert_eq!(app.pending_events(), 2);
}

#[test]
fn config_update_retunes_debounce_mid_press() {
    let (mut app, mut rig, mut sink) = make_app(SystemConfig::default());
    let down = [true, true, false, true];
    app.poll_inputs(down, 1000, NOW, &mut rig.display, &mut sink);
    app.poll_inputs(down, 1030, NOW, &mut rig.display, &mut sink);

    app.handle_command(
        AppCommand::UpdateConfig(SystemConfig {
            debounce_ms: 20,
            ..SystemConfig::default()
        }),
        NOW,
        &mut sink,
    )
    .unwrap();

    // 30 ms of stable level now clears the shorter window.
    app.poll_inputs(down, 1030, NOW, &mut rig.display, &mut sink);
    assert_eq!(app.menu_state(), MenuState::Main { selected: 1 });
}

#[test]
fn config_update_rebuilds_menu_for_new_pump_count() {
    let (mut app, mut rig, mut sink) = make_app(SystemConfig::default());
    app.handle_command(
        AppCommand::UpdateConfig(SystemConfig {
            pump_count: 1,
            ..SystemConfig::default()
        }),
        NOW,
        &mut sink,
    )
    .unwrap();
    assert!(matches!(
        sink.events.last(),
        Some(AppEvent::ConfigUpdated(c)) if c.pump_count == 1
    ));
    rig.clear();

    Panel::new().press(&mut app, &mut rig, &mut sink, Channel::Up);
    assert_eq!(app.menu_state(), MenuState::Main { selected: 2 });
}
