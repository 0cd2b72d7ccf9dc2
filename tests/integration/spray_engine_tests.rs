//! Integration tests for alarm firing → guarded spray → notification.
//!
//! Every collaborator is a recording mock; waits are journaled instead of
//! slept, so a full five-second spray with SMS retries runs instantly.

use cropspray::app::commands::AppCommand;
use cropspray::app::events::AppEvent;
use cropspray::app::service::AppService;
use cropspray::config::{PhoneNumber, SystemConfig};
use cropspray::fsm::context::SprayOutcome;
use cropspray::scheduler::{AlarmKind, PumpId};
use time::PrimitiveDateTime;
use time::macros::datetime;

use crate::mock_hw::{Call, Pattern, RecordingSink, Rig};

const A: &str = "+639170000001";
const B: &str = "+639170000002";
const SETUP: PrimitiveDateTime = datetime!(2024-05-01 05:00);
const FIRE: PrimitiveDateTime = datetime!(2024-05-01 06:30);

fn config(recipients: &[&str]) -> SystemConfig {
    let mut c = SystemConfig {
        sms_recipient_gap_ms: 100,
        ..SystemConfig::default()
    };
    for r in recipients {
        c.recipients.push(PhoneNumber::try_from(*r).unwrap()).unwrap();
    }
    c
}

/// App with P1 scheduled daily at 06:30.
fn scheduled_app(recipients: &[&str]) -> (AppService, Rig, RecordingSink) {
    let mut app = AppService::new(config(recipients));
    let mut sink = RecordingSink::default();
    app.handle_command(AppCommand::Schedule { pump: 1, hour: 6, minute: 30 }, SETUP, &mut sink)
        .unwrap();
    (app, Rig::new(), sink)
}

// ── Clock matching ────────────────────────────────────────────

#[test]
fn nothing_fires_before_the_minute() {
    let (mut app, mut rig, mut sink) = scheduled_app(&[A]);
    let reports = app.tick_clock(datetime!(2024-05-01 06:29:59), &mut rig.ports(), &mut sink);
    assert!(reports.is_empty());
    assert!(rig.calls().is_empty());
}

// ── Sprayed ───────────────────────────────────────────────────

#[test]
fn dry_and_registered_sprays_then_reports() {
    let (mut app, mut rig, mut sink) = scheduled_app(&[A, B]);

    let reports = app.tick_clock(FIRE, &mut rig.ports(), &mut sink);

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.outcome, SprayOutcome::Sprayed);
    assert!(report.notification.delivered);
    assert_eq!(report.notification.attempts, 1);
    assert!(!report.rescheduled);

    assert_eq!(rig.relay_calls(), vec![(PumpId::P1, true), (PumpId::P1, false)]);
    let on = rig.position(|c| *c == Call::Relay { pump: PumpId::P1, on: true }).unwrap();
    let hold = rig.position(|c| *c == Call::Wait(5000)).unwrap();
    let off = rig.position(|c| *c == Call::Relay { pump: PumpId::P1, on: false }).unwrap();
    let first_sms = rig.position(|c| matches!(c, Call::Sms { .. })).unwrap();
    assert!(on < hold && hold < off && off < first_sms);

    let sms = rig.sms();
    assert_eq!(sms.len(), 2);
    assert!(sms.iter().all(|(_, body, _)| body.contains("sprayed at 06:30")));
    assert_eq!(rig.patterns(), vec![Pattern::Start, Pattern::Success]);

    // The daily alarm re-arms for tomorrow.
    assert_eq!(app.registry().kind(PumpId::P1), Some(AlarmKind::Daily));
    assert_eq!(app.registry().due_at(PumpId::P1), Some(datetime!(2024-05-02 06:30)));
    assert!(matches!(sink.events.last(), Some(AppEvent::SprayFinished(r)) if r.delivered));
}

#[test]
fn checks_run_weather_first_then_network() {
    let (mut app, mut rig, mut sink) = scheduled_app(&[A]);
    app.tick_clock(FIRE, &mut rig.ports(), &mut sink);

    let weather = rig.position(|c| *c == Call::WeatherQuery).unwrap();
    let network = rig.position(|c| *c == Call::RegistrationQuery).unwrap();
    let relay = rig.position(|c| matches!(c, Call::Relay { .. })).unwrap();
    assert!(weather < network && network < relay);
}

// ── Rain ──────────────────────────────────────────────────────

#[test]
fn rain_postpones_and_reschedules_once() {
    let (mut app, mut rig, mut sink) = scheduled_app(&[A]);
    app.handle_command(AppCommand::Schedule { pump: 2, hour: 8, minute: 0 }, SETUP, &mut sink)
        .unwrap();
    let p2_alarm = app.registry().alarm_id(PumpId::P2);
    let p1_alarm = app.registry().alarm_id(PumpId::P1);
    rig.weather.rain = true;

    let reports = app.tick_clock(FIRE, &mut rig.ports(), &mut sink);

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].outcome, SprayOutcome::PostponedRain);
    assert!(reports[0].rescheduled);

    assert!(rig.relay_calls().is_empty());
    assert_eq!(rig.count(&Call::RegistrationQuery), 0, "network is not checked on rain");
    assert_eq!(rig.patterns(), vec![Pattern::Alert]);
    let sms = rig.sms();
    assert_eq!(sms.len(), 1);
    assert!(sms[0].1.contains("Rescheduled for 2024-05-02 06:30"), "{}", sms[0].1);

    assert_ne!(app.registry().alarm_id(PumpId::P1), p1_alarm);
    assert_eq!(app.registry().kind(PumpId::P1), Some(AlarmKind::OneShot));
    assert_eq!(app.registry().due_at(PumpId::P1), Some(datetime!(2024-05-02 06:30)));
    assert_eq!(app.registry().alarm_id(PumpId::P2), p2_alarm);
    assert_eq!(app.history().counters().postponed_rain, 1);
}

#[test]
fn postponed_spray_runs_next_day_and_daily_resumes() {
    let (mut app, mut rig, mut sink) = scheduled_app(&[A]);
    rig.weather.rain = true;
    app.tick_clock(FIRE, &mut rig.ports(), &mut sink);

    rig.weather.rain = false;
    rig.clear();
    let reports = app.tick_clock(datetime!(2024-05-02 06:30), &mut rig.ports(), &mut sink);

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].outcome, SprayOutcome::Sprayed);
    assert_eq!(app.registry().kind(PumpId::P1), Some(AlarmKind::Daily));
    assert_eq!(app.registry().due_at(PumpId::P1), Some(datetime!(2024-05-03 06:30)));
}

// ── Network ───────────────────────────────────────────────────

#[test]
fn network_down_postpones_without_reschedule() {
    let (mut app, mut rig, mut sink) = scheduled_app(&[A]);
    let alarm = app.registry().alarm_id(PumpId::P1);
    rig.modem.registered = false;
    rig.modem.registered_after_reconnect = false;

    let reports = app.tick_clock(FIRE, &mut rig.ports(), &mut sink);

    assert_eq!(reports[0].outcome, SprayOutcome::PostponedNetwork);
    assert!(!reports[0].rescheduled);
    assert!(rig.relay_calls().is_empty());
    assert_eq!(rig.count(&Call::Reconnect), 1);
    assert_eq!(rig.count(&Call::RegistrationQuery), 2);
    assert_eq!(rig.count(&Call::Wait(10_000)), 1);
    assert_eq!(rig.patterns(), vec![Pattern::Alert]);

    // Same alarm, same daily slot tomorrow.
    assert_eq!(app.registry().alarm_id(PumpId::P1), alarm);
    assert_eq!(app.registry().kind(PumpId::P1), Some(AlarmKind::Daily));
    assert_eq!(app.registry().due_at(PumpId::P1), Some(datetime!(2024-05-02 06:30)));
}

#[test]
fn successful_reconnect_proceeds_to_spray() {
    let (mut app, mut rig, mut sink) = scheduled_app(&[A]);
    rig.modem.registered = false;

    let reports = app.tick_clock(FIRE, &mut rig.ports(), &mut sink);

    assert_eq!(reports[0].outcome, SprayOutcome::Sprayed);
    assert_eq!(rig.count(&Call::Reconnect), 1);
    assert_eq!(rig.count(&Call::Wait(10_000)), 0);
}

// ── Notification ──────────────────────────────────────────────

#[test]
fn whole_pass_retry_until_both_recipients_succeed() {
    let (mut app, mut rig, mut sink) = scheduled_app(&[A, B]);
    rig.modem.fail(B, 2);

    let reports = app.tick_clock(FIRE, &mut rig.ports(), &mut sink);
    let n = &reports[0].notification;

    assert!(n.delivered);
    assert_eq!(n.attempts, 3, "two retries after the first pass");
    assert_eq!(n.per_recipient.as_slice(), &[true, true]);

    let sms = rig.sms();
    assert_eq!(sms.len(), 6);
    assert_eq!(sms.iter().filter(|(to, _, _)| to == A).count(), 3);
    assert_eq!(
        sms.iter().map(|(_, _, ok)| *ok).collect::<Vec<_>>(),
        vec![true, false, true, false, true, true]
    );
    // Spray hold plus two inter-pass delays.
    assert_eq!(rig.count(&Call::Wait(5000)), 3);
    assert_eq!(rig.patterns(), vec![Pattern::Start, Pattern::Success]);
}

#[test]
fn exhausted_retries_run_error_pattern_but_keep_outcome() {
    let (mut app, mut rig, mut sink) = scheduled_app(&[A, B]);
    rig.modem.fail(B, 10);

    let reports = app.tick_clock(FIRE, &mut rig.ports(), &mut sink);

    assert_eq!(reports[0].outcome, SprayOutcome::Sprayed);
    assert!(!reports[0].notification.delivered);
    assert_eq!(reports[0].notification.attempts, 3);
    assert_eq!(rig.patterns(), vec![Pattern::Start, Pattern::Error]);
    assert_eq!(app.history().counters().notification_failures, 1);
}

#[test]
fn postponement_with_failed_notification_alerts_then_errors() {
    let (mut app, mut rig, mut sink) = scheduled_app(&[A]);
    rig.weather.rain = true;
    rig.modem.fail(A, 10);

    let reports = app.tick_clock(FIRE, &mut rig.ports(), &mut sink);

    assert_eq!(reports[0].outcome, SprayOutcome::PostponedRain);
    assert!(reports[0].rescheduled);
    assert_eq!(rig.patterns(), vec![Pattern::Alert, Pattern::Error]);

    // The alert plays out in full before the error pattern replaces it.
    let alert = rig.position(|c| *c == Call::Pattern(Pattern::Alert)).unwrap();
    let error = rig.position(|c| *c == Call::Pattern(Pattern::Error)).unwrap();
    let calls = rig.calls();
    assert_eq!(calls[alert + 1], Call::Wait(1500));
    assert_eq!(error, alert + 2);
}

#[test]
fn delivered_postponement_alerts_without_waiting() {
    let (mut app, mut rig, mut sink) = scheduled_app(&[A]);
    rig.weather.rain = true;

    app.tick_clock(FIRE, &mut rig.ports(), &mut sink);

    assert_eq!(rig.patterns(), vec![Pattern::Alert]);
    assert_eq!(rig.count(&Call::Wait(1500)), 0);
}

#[test]
fn no_recipients_sends_nothing_and_is_not_an_error() {
    let (mut app, mut rig, mut sink) = scheduled_app(&[]);

    let reports = app.tick_clock(FIRE, &mut rig.ports(), &mut sink);

    assert_eq!(reports[0].outcome, SprayOutcome::Sprayed);
    assert_eq!(reports[0].notification.attempts, 0);
    assert!(rig.sms().is_empty());
    assert!(!rig.patterns().contains(&Pattern::Error));
}

// ── Several pumps ─────────────────────────────────────────────

#[test]
fn simultaneous_firings_run_one_after_another() {
    let (mut app, mut rig, mut sink) = scheduled_app(&[A]);
    app.handle_command(AppCommand::Schedule { pump: 2, hour: 6, minute: 30 }, SETUP, &mut sink)
        .unwrap();

    let reports = app.tick_clock(FIRE, &mut rig.ports(), &mut sink);

    assert_eq!(reports.len(), 2);
    assert_eq!(
        rig.relay_calls(),
        vec![
            (PumpId::P1, true),
            (PumpId::P1, false),
            (PumpId::P2, true),
            (PumpId::P2, false),
        ]
    );
    assert_eq!(app.history().len(), 2);
}

// ── Manual spray ──────────────────────────────────────────────

#[test]
fn manual_spray_runs_guarded_sequence() {
    let mut app = AppService::new(config(&[A]));
    let mut rig = Rig::new();
    let mut sink = RecordingSink::default();
    let now = datetime!(2024-05-01 11:40);

    app.handle_command(AppCommand::SprayNow(2), now, &mut sink).unwrap();
    let reports = app.dispatch(now, &mut rig.ports(), &mut sink);

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].pump, PumpId::P2);
    assert_eq!(rig.relay_calls(), vec![(PumpId::P2, true), (PumpId::P2, false)]);
    assert_eq!(app.registry().active_count(), 0);
}

#[test]
fn manual_spray_in_rain_books_single_retry_tomorrow() {
    let mut app = AppService::new(config(&[A]));
    let mut rig = Rig::new();
    let mut sink = RecordingSink::default();
    let now = datetime!(2024-05-01 11:40);
    rig.weather.rain = true;

    app.handle_command(AppCommand::SprayNow(2), now, &mut sink).unwrap();
    app.dispatch(now, &mut rig.ports(), &mut sink);
    assert_eq!(app.registry().kind(PumpId::P2), Some(AlarmKind::OneShot));
    assert_eq!(app.registry().due_at(PumpId::P2), Some(datetime!(2024-05-02 11:40)));

    rig.weather.rain = false;
    let reports = app.tick_clock(datetime!(2024-05-02 11:40), &mut rig.ports(), &mut sink);
    assert_eq!(reports[0].outcome, SprayOutcome::Sprayed);
    assert_eq!(app.registry().entry(PumpId::P2), None);
}
