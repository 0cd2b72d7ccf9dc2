//! CropSpray Firmware: Main Entry Point
//!
//! Hexagonal architecture with a single cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   FeedbackOutputs  GsmAdapter    LcdDisplay   │
//! │  (RelayPort)       (FeedbackPort)   (Cellular)    (Display)    │
//! │  WeatherAdapter    SystemClock      LogEventSink  WifiAdapter  │
//! │  (WeatherPort)     (ClockPort)      (EventSink)   (reset)      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Input · Menu · AlarmRegistry · SprayEngine · Notifier │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::{Result, anyhow};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::EspSntp;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{info, warn};

use cropspray::adapters::delay::WatchdogDelay;
use cropspray::adapters::display::{DEFAULT_ADDRESS, LcdDisplay};
use cropspray::adapters::gsm::{GsmAdapter, UartLink};
use cropspray::adapters::hardware::{FeedbackOutputs, HardwareAdapter};
use cropspray::adapters::log_sink::LogEventSink;
use cropspray::adapters::time::SystemClock;
use cropspray::adapters::weather::WeatherAdapter;
use cropspray::adapters::wifi::WifiAdapter;
use cropspray::app::events::AppEvent;
use cropspray::app::ports::{ClockPort, EventSink};
use cropspray::app::service::AppService;
use cropspray::config::{PhoneNumber, SystemConfig};
use cropspray::drivers::{hw_init, watchdog::Watchdog};
use cropspray::fsm::context::SprayPorts;

// ── Event sink ────────────────────────────────────────────────
//
// Logs every event and latches the reset request and any new
// configuration so the loop can service them after the core call returns.

#[derive(Default)]
struct FirmwareSink {
    log: LogEventSink,
    wifi_reset: bool,
    new_config: Option<SystemConfig>,
}

impl EventSink for FirmwareSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::WifiResetRequested => self.wifi_reset = true,
            AppEvent::ConfigUpdated(config) => self.new_config = Some(config.clone()),
            _ => {}
        }
        self.log.emit(event);
    }
}

/// Build-time site settings.
fn site_config() -> SystemConfig {
    let mut cfg = SystemConfig::default();
    for number in option_env!("CROPSPRAY_RECIPIENTS")
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        match PhoneNumber::try_from(number) {
            Ok(n) if cfg.recipients.push(n).is_ok() => {}
            _ => warn!("Config: recipient '{}' skipped", number),
        }
    }
    if let Some(offset) = option_env!("CROPSPRAY_UTC_OFFSET_MINUTES").and_then(|s| s.parse().ok()) {
        cfg.utc_offset_minutes = offset;
    }
    cfg
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  CropSpray v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = site_config();
    config.validate().map_err(|e| anyhow!("config: {e}"))?;
    info!(
        "Config: {} pump(s), {} recipient(s), UTC{:+} min",
        config.pump_count,
        config.recipients.len(),
        config.utc_offset_minutes
    );

    // ── 3. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals().map_err(|e| anyhow!("HAL init failed: {e}"))?;
    let watchdog = Watchdog::new(config.watchdog_timeout_secs);

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── 4. Wi-Fi + SNTP (weather and wall clock) ──────────────
    let mut wifi = WifiAdapter::new();
    wifi.attach(BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?,
        sysloop,
    )?);
    match wifi.set_credentials(
        option_env!("CROPSPRAY_WIFI_SSID").unwrap_or(""),
        option_env!("CROPSPRAY_WIFI_PASS").unwrap_or(""),
    ) {
        Ok(()) => {
            if let Err(e) = wifi.connect() {
                warn!("WiFi: {}, weather checks will fail open", e);
            }
        }
        Err(e) => warn!("WiFi: {}, running without IP link", e),
    }
    let _sntp = EspSntp::new_default()?;
    watchdog.feed();

    // ── 5. Adapters ───────────────────────────────────────────
    let link = UartLink::install().map_err(|e| anyhow!("modem UART: {e}"))?;
    let mut gsm = GsmAdapter::new(link, WatchdogDelay::new(&watchdog));
    gsm.power_on();

    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &I2cConfig::new().baudrate(100.kHz().into()),
    )?;
    let mut lcd = LcdDisplay::new(i2c, DEFAULT_ADDRESS);
    lcd.init(&mut FreeRtos);

    let mut clock = SystemClock::new(config.utc_offset_minutes);
    let mut weather = WeatherAdapter::new(
        option_env!("CROPSPRAY_WEATHER_URL").unwrap_or(""),
        config.rain_probability_threshold,
        SystemClock::new(config.utc_offset_minutes),
    );
    let mut hw = HardwareAdapter::new(config.pump_count);
    let outputs = FeedbackOutputs::new();
    let mut sink = FirmwareSink::default();

    // ── 6. App service ────────────────────────────────────────
    let mut app = AppService::new(config.clone());
    app.start(&mut lcd, &mut sink);
    info!("System ready. Entering control loop.");

    // ── 7. Control loop ───────────────────────────────────────
    let mut last_loop_ms = clock.uptime_ms();
    let mut last_check_ms = last_loop_ms;
    let mut unsynced_logged = false;

    loop {
        let now_ms = clock.uptime_ms();
        let now = clock.now();

        app.poll_inputs(hw.read_buttons(), now_ms, now, &mut lcd, &mut sink);

        let synced = clock.is_synced();
        if !synced && !unsynced_logged {
            warn!("Clock: not synced yet, alarms on hold");
            unsynced_logged = true;
        }
        let check_due = synced
            && now_ms.wrapping_sub(last_check_ms) >= app.config().clock_check_interval_ms;

        if check_due || app.pending_events() > 0 {
            let mut feedback = &outputs;
            let mut delay = WatchdogDelay::with_feedback(&watchdog, &outputs);
            let mut ports = SprayPorts {
                weather: &mut weather,
                cellular: &mut gsm,
                relays: &mut hw,
                feedback: &mut feedback,
                display: &mut lcd,
                delay: &mut delay,
            };
            if check_due {
                last_check_ms = now_ms;
                app.tick_clock(now, &mut ports, &mut sink);
            } else {
                app.dispatch(now, &mut ports, &mut sink);
            }
        }

        if let Some(config) = sink.new_config.take() {
            hw.set_pump_count(config.pump_count);
            weather.set_threshold(config.rain_probability_threshold);
            weather.clock_mut().set_offset(config.utc_offset_minutes);
            clock.set_offset(config.utc_offset_minutes);
        }

        if core::mem::take(&mut sink.wifi_reset) {
            watchdog.feed();
            if let Err(e) = wifi.reset() {
                warn!("WiFi: reset failed: {}", e);
            }
        }

        let loop_ms = clock.uptime_ms();
        outputs.tick(loop_ms.wrapping_sub(last_loop_ms));
        last_loop_ms = loop_ms;

        watchdog.feed();
        FreeRtos::delay_ms(app.config().poll_interval_ms);
    }
}
