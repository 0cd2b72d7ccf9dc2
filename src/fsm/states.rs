//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers over [`SprayContext`].
//!
//! ```text
//!  WEATHER_CHECK ──[rain]─────────────────────────────▶ REPORT
//!        │ [dry]                                          ▲
//!        ▼                                                │
//!  NETWORK_CHECK ──[unregistered, reconnect failed]──────▶│
//!        │ [registered]                                   │
//!        ▼                                                │
//!     ACTUATE ──[hold elapsed, relay released]───────────▶┘
//!
//!  REPORT ──▶ DONE
//! ```

use core::fmt::Write as _;

use log::{error, info, warn};

use crate::drivers::feedback::PatternId;

use super::context::{SprayContext, SprayOutcome, compose_message};
use super::{StateDescriptor, StateId};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::WeatherCheck,
            name: "WeatherCheck",
            on_enter: Some(weather_enter),
            on_update: weather_update,
        },
        StateDescriptor {
            id: StateId::NetworkCheck,
            name: "NetworkCheck",
            on_enter: Some(network_enter),
            on_update: network_update,
        },
        StateDescriptor {
            id: StateId::Actuate,
            name: "Actuate",
            on_enter: Some(actuate_enter),
            on_update: actuate_update,
        },
        StateDescriptor {
            id: StateId::Report,
            name: "Report",
            on_enter: None,
            on_update: report_update,
        },
        StateDescriptor {
            id: StateId::Done,
            name: "Done",
            on_enter: None,
            on_update: done_update,
        },
    ]
}

fn status(ctx: &mut SprayContext<'_, '_>, bottom: &str) {
    let mut top = heapless::String::<16>::new();
    let _ = write!(top, "Pump {}", ctx.pump().number());
    ctx.ports.display.show_status(&top, bottom);
}

// ═══════════════════════════════════════════════════════════════════════════
//  WEATHER_CHECK
// ═══════════════════════════════════════════════════════════════════════════

fn weather_enter(ctx: &mut SprayContext<'_, '_>) {
    status(ctx, "Checking weather");
}

fn weather_update(ctx: &mut SprayContext<'_, '_>) -> Option<StateId> {
    if ctx.ports.weather.is_rain_expected_or_occurring() {
        info!("Spray {}: rain expected, postponing", ctx.pump());
        ctx.outcome = Some(SprayOutcome::PostponedRain);
        Some(StateId::Report)
    } else {
        Some(StateId::NetworkCheck)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  NETWORK_CHECK
// ═══════════════════════════════════════════════════════════════════════════

fn network_enter(ctx: &mut SprayContext<'_, '_>) {
    status(ctx, "Checking network");
}

fn network_update(ctx: &mut SprayContext<'_, '_>) -> Option<StateId> {
    if ctx.ports.cellular.is_registered() {
        return Some(StateId::Actuate);
    }

    warn!("Spray {}: network not registered, reconnecting", ctx.pump());
    if ctx.ports.cellular.reconnect() {
        return Some(StateId::Actuate);
    }

    // One bounded wait, then a single re-check.
    let wait_ms = u32::from(ctx.config.network_reconnect_wait_secs) * 1000;
    ctx.ports.delay.delay_ms(wait_ms);
    if ctx.ports.cellular.is_registered() {
        return Some(StateId::Actuate);
    }

    warn!("Spray {}: network still down, postponing", ctx.pump());
    ctx.outcome = Some(SprayOutcome::PostponedNetwork);
    Some(StateId::Report)
}

// ═══════════════════════════════════════════════════════════════════════════
//  ACTUATE
// ═══════════════════════════════════════════════════════════════════════════

fn actuate_enter(ctx: &mut SprayContext<'_, '_>) {
    let pump = ctx.pump();
    status(ctx, "Spraying...");
    ctx.ports.feedback.start_pattern();
    ctx.ports.relays.set_pump(pump, true);
}

fn actuate_update(ctx: &mut SprayContext<'_, '_>) -> Option<StateId> {
    let pump = ctx.pump();
    ctx.ports.delay.delay_ms(ctx.config.spray_duration_ms());
    ctx.ports.relays.set_pump(pump, false);
    info!(
        "Spray {}: held {} s, relay released",
        pump, ctx.config.spray_duration_secs
    );
    ctx.outcome = Some(SprayOutcome::Sprayed);
    Some(StateId::Report)
}

// ═══════════════════════════════════════════════════════════════════════════
//  REPORT
// ═══════════════════════════════════════════════════════════════════════════

fn report_update(ctx: &mut SprayContext<'_, '_>) -> Option<StateId> {
    let Some(outcome) = ctx.outcome else {
        error!("Spray {}: reached Report without an outcome", ctx.pump());
        return Some(StateId::Done);
    };

    let message = compose_message(&ctx.request, outcome);
    ctx.notification = ctx.notifier.send_with_retry(
        &ctx.config.recipients,
        &message,
        &mut *ctx.ports.cellular,
        &mut *ctx.ports.delay,
    );

    match outcome {
        SprayOutcome::Sprayed if !ctx.notification.failed() => {
            ctx.ports.feedback.success_pattern()
        }
        SprayOutcome::Sprayed => {}
        SprayOutcome::PostponedRain | SprayOutcome::PostponedNetwork => {
            ctx.ports.feedback.alert_pattern();
            if ctx.notification.failed() {
                // Error pre-empts Alert; let the alert finish first.
                ctx.ports.delay.delay_ms(PatternId::Alert.duration_ms());
            }
        }
    }
    if ctx.notification.failed() {
        ctx.ports.feedback.error_pattern();
    }

    if outcome == SprayOutcome::PostponedRain {
        let req = ctx.request;
        match ctx.registry.reschedule_tomorrow(req.pump, req.hour, req.minute, req.now) {
            Ok(_) => ctx.rescheduled = true,
            Err(e) => error!("Spray {}: reschedule failed: {}", req.pump, e),
        }
    }

    let bottom = match outcome {
        SprayOutcome::Sprayed => "Done",
        SprayOutcome::PostponedRain => "Postponed: rain",
        SprayOutcome::PostponedNetwork => "Postponed: net",
    };
    status(ctx, bottom);
    Some(StateId::Done)
}

// ═══════════════════════════════════════════════════════════════════════════
//  DONE
// ═══════════════════════════════════════════════════════════════════════════

fn done_update(_ctx: &mut SprayContext<'_, '_>) -> Option<StateId> {
    None
}
