//! Application service: the hexagonal core.
//!
//! [`AppService`] owns every piece of mutable controller state: the
//! debounced inputs, the menu, the alarm registry, the event queue, the
//! spray engine and the history.  It exposes a hardware-agnostic API;
//! all I/O flows through port traits injected at call sites, so the whole
//! service runs against mock adapters in tests.
//!
//! ```text
//!  raw levels ──▶ ┌──────────────────────────────┐ ──▶ DisplayPort
//!                 │          AppService          │
//!  wall clock ──▶ │ Input · Menu · Registry      │ ──▶ EventSink
//!                 │ EventQueue · SprayEngine     │
//!  AppCommand ──▶ └──────────────────────────────┘ ──▶ SprayPorts
//! ```
//!
//! There is a single execution context.  A spray sequence blocks the
//! caller until it completes; inputs are not serviced meanwhile.

use log::{info, warn};
use time::PrimitiveDateTime;

use crate::config::SystemConfig;
use crate::drivers::button::{Channel, DebouncedInput};
use crate::error::Error;
use crate::events::{Event, EventQueue};
use crate::fsm::SprayEngine;
use crate::fsm::context::{SprayContext, SprayPorts, SprayReport, SprayRequest};
use crate::history::{SprayLog, SprayRecord};
use crate::menu::{Menu, MenuAction, MenuState};
use crate::notify::Notifier;
use crate::scheduler::{AlarmRegistry, PumpId};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{DisplayPort, EventSink};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService {
    config: SystemConfig,
    input: DebouncedInput,
    menu: Menu,
    registry: AlarmRegistry,
    queue: EventQueue,
    engine: SprayEngine,
    notifier: Notifier,
    history: SprayLog,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// The caller validates `config` first; see [`SystemConfig::validate`].
    pub fn new(config: SystemConfig) -> Self {
        Self {
            input: DebouncedInput::new(config.debounce_ms),
            menu: Menu::new(config.pump_count),
            registry: AlarmRegistry::new(),
            queue: EventQueue::new(),
            engine: SprayEngine::new(),
            notifier: Notifier::from_config(&config),
            history: SprayLog::new(),
            config,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, display: &mut impl DisplayPort, sink: &mut impl EventSink) {
        self.render(display);
        sink.emit(&AppEvent::Started {
            pump_count: self.config.pump_count,
        });
        info!("AppService started with {} pump(s)", self.config.pump_count);
    }

    // ── Input path ────────────────────────────────────────────

    /// Sample the four button lines and act on any latched press.
    ///
    /// `raw` is in [`Channel`] order, `true` = HIGH (released).
    pub fn poll_inputs(
        &mut self,
        raw: [bool; 4],
        now_ms: u32,
        now: PrimitiveDateTime,
        display: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) {
        self.input.poll(raw, now_ms);

        if self.input.take(Channel::Reset) {
            info!("Input: reset pressed");
            self.queue.push(Event::WifiResetRequested);
        }

        for channel in [Channel::Up, Channel::Down, Channel::Select] {
            if !self.input.take(channel) {
                continue;
            }
            let action = self.menu.handle(channel, now.time());
            self.apply_menu_action(action, now, display, sink);
        }
    }

    fn apply_menu_action(
        &mut self,
        action: MenuAction,
        now: PrimitiveDateTime,
        display: &mut impl DisplayPort,
        sink: &mut impl EventSink,
    ) {
        match action {
            MenuAction::None => {}
            MenuAction::Redraw => self.render(display),
            MenuAction::Install { pump, hour, minute } => {
                // Failure is logged and reported through the sink.
                let _ = self.install(pump, hour, minute, now, sink);
                self.render(display);
            }
            MenuAction::CancelAll => {
                let count = self.registry.cancel_all();
                sink.emit(&AppEvent::AllCancelled { count });
                display.show_status("All schedules", "cancelled");
            }
            MenuAction::ShowTime => display.show_time(now, self.registry.next_due()),
        }
    }

    // ── Clock path ────────────────────────────────────────────

    /// Match alarms against `now` and run whatever fired.
    ///
    /// Returns the reports of the sprays run during this call.
    pub fn tick_clock(
        &mut self,
        now: PrimitiveDateTime,
        ports: &mut SprayPorts<'_>,
        sink: &mut impl EventSink,
    ) -> heapless::Vec<SprayReport, 4> {
        self.registry.tick(now, &mut self.queue);
        self.dispatch(now, ports, sink)
    }

    /// Drain the event queue, running each event to completion.
    pub fn dispatch(
        &mut self,
        now: PrimitiveDateTime,
        ports: &mut SprayPorts<'_>,
        sink: &mut impl EventSink,
    ) -> heapless::Vec<SprayReport, 4> {
        let mut reports = heapless::Vec::new();

        while let Some(event) = self.queue.pop() {
            let request = match event {
                Event::AlarmFired { entry, .. } => SprayRequest {
                    pump: entry.pump,
                    hour: entry.hour,
                    minute: entry.minute,
                    now,
                },
                Event::SprayRequested(pump) => self.manual_request(pump, now),
                Event::WifiResetRequested => {
                    sink.emit(&AppEvent::WifiResetRequested);
                    continue;
                }
            };

            let report = self.run_spray(request, ports, sink);
            if reports.push(report).is_err() {
                warn!("AppService: report for {} not returned, buffer full", request.pump);
            }
        }

        reports
    }

    /// Manual sprays postpone to the pump's own slot if it has one,
    /// otherwise to the current time of day.
    fn manual_request(&self, pump: PumpId, now: PrimitiveDateTime) -> SprayRequest {
        let (hour, minute) = self
            .registry
            .entry(pump)
            .map_or((now.hour(), now.minute()), |e| (e.hour, e.minute));
        SprayRequest {
            pump,
            hour,
            minute,
            now,
        }
    }

    fn run_spray(
        &mut self,
        request: SprayRequest,
        ports: &mut SprayPorts<'_>,
        sink: &mut impl EventSink,
    ) -> SprayReport {
        let mut ctx = SprayContext::new(
            request,
            &self.config,
            ports,
            &mut self.registry,
            &self.notifier,
        );
        let report = self.engine.run(&mut ctx);

        self.history.record(&report);
        sink.emit(&AppEvent::SprayFinished(SprayRecord::from(&report)));
        report
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command.  Rejections are emitted as
    /// [`AppEvent::CommandRejected`] and returned; none is fatal.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now: PrimitiveDateTime,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        let result = self.apply_command(cmd, now, sink);
        if let Err(e) = result {
            warn!("AppService: command rejected: {}", e);
            sink.emit(&AppEvent::CommandRejected(e));
        }
        result
    }

    fn apply_command(
        &mut self,
        cmd: AppCommand,
        now: PrimitiveDateTime,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        match cmd {
            AppCommand::Schedule { pump, hour, minute } => {
                let pump = self.pump(pump)?;
                self.install(pump, hour, minute, now, sink)?;
            }
            AppCommand::Cancel(pump) => {
                let pump = self.pump(pump)?;
                let existed = self.registry.cancel(pump);
                sink.emit(&AppEvent::ScheduleCancelled { pump, existed });
            }
            AppCommand::CancelAll => {
                let count = self.registry.cancel_all();
                sink.emit(&AppEvent::AllCancelled { count });
            }
            AppCommand::SprayNow(pump) => {
                let pump = self.pump(pump)?;
                info!("AppService: manual spray {} queued", pump);
                self.queue.push(Event::SprayRequested(pump));
            }
            AppCommand::UpdateConfig(new_config) => {
                new_config.validate()?;
                self.apply_config(new_config);
                sink.emit(&AppEvent::ConfigUpdated(self.config.clone()));
            }
        }
        Ok(())
    }

    fn install(
        &mut self,
        pump: PumpId,
        hour: u8,
        minute: u8,
        now: PrimitiveDateTime,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        match self.registry.install(pump, hour, minute, now) {
            Ok(alarm) => {
                sink.emit(&AppEvent::ScheduleInstalled {
                    pump,
                    hour,
                    minute,
                    alarm,
                });
                Ok(())
            }
            Err(e) => {
                warn!("AppService: install {} failed: {}", pump, e);
                Err(e.into())
            }
        }
    }

    fn apply_config(&mut self, config: SystemConfig) {
        if config.pump_count != self.config.pump_count {
            // Drop schedules of pumps that are no longer fitted.
            for pump in PumpId::all(self.config.pump_count).skip(usize::from(config.pump_count)) {
                self.registry.cancel(pump);
            }
            self.menu = Menu::new(config.pump_count);
        }
        self.input.set_debounce_ms(config.debounce_ms);
        self.notifier = Notifier::from_config(&config);
        self.config = config;
        info!("Configuration updated at runtime");
    }

    fn pump(&self, number: u8) -> Result<PumpId, Error> {
        Ok(PumpId::from_number(number, self.config.pump_count)?)
    }

    // ── Rendering ─────────────────────────────────────────────

    /// Draw the current menu state.
    pub fn render(&self, display: &mut impl DisplayPort) {
        match self.menu.state() {
            MenuState::Main { selected } => {
                if let Some(item) = self.menu.selected_item() {
                    display.render_menu(item, selected, self.menu.items().len());
                }
            }
            MenuState::Scheduling(session) => display.render_scheduling(&session),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn registry(&self) -> &AlarmRegistry {
        &self.registry
    }

    pub fn menu_state(&self) -> MenuState {
        self.menu.state()
    }

    pub fn history(&self) -> &SprayLog {
        &self.history
    }

    /// Events waiting for the next [`dispatch`](Self::dispatch).
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }
}
