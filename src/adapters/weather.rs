//! OpenWeather forecast adapter.
//!
//! Implements [`WeatherPort`] by fetching the 5-day / 3-hour forecast
//! and looking at today's slots.  Rain is expected if any slot dated
//! today reports rain volume or a precipitation probability above the
//! configured threshold.
//!
//! Every failure (no Wi-Fi, HTTP error, malformed JSON, clock not yet
//! synced) reports "no rain", so a broken forecast never blocks
//! spraying.

use log::{info, warn};
use serde::Deserialize;
use time::Date;

use crate::app::ports::{ClockPort, WeatherPort};
use crate::error::CommsError;

/// Largest forecast body accepted (the 40-slot response is ~16 KiB).
pub const MAX_BODY: usize = 32 * 1024;

// ───────────────────────────────────────────────────────────────
// Forecast document
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Forecast {
    #[serde(default)]
    pub list: Vec<ForecastSlot>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastSlot {
    /// `"YYYY-MM-DD hh:mm:ss"`, UTC.
    #[serde(default)]
    pub dt_txt: String,
    /// Probability of precipitation, 0–1.
    #[serde(default)]
    pub pop: f32,
    #[serde(default)]
    pub rain: Option<RainVolume>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RainVolume {
    /// Millimetres over the 3-hour slot.
    #[serde(rename = "3h", default)]
    pub three_hours: f32,
}

pub fn parse_forecast(body: &[u8]) -> Result<Forecast, CommsError> {
    serde_json::from_slice(body).map_err(|_| CommsError::WeatherUnavailable)
}

/// `true` if any slot dated `today` has rain volume or `pop > threshold`.
pub fn rain_expected(doc: &Forecast, today: Date, threshold: f32) -> bool {
    let mut prefix = heapless::String::<16>::new();
    if core::fmt::write(&mut prefix, format_args!("{}", today)).is_err() {
        return false;
    }
    doc.list
        .iter()
        .filter(|slot| slot.dt_txt.starts_with(prefix.as_str()))
        .any(|slot| {
            let volume = slot.rain.map_or(0.0, |r| r.three_hours);
            if volume > 0.0 || slot.pop > threshold {
                info!(
                    "Weather: rain at {} ({:.1} mm, {:.0}% chance)",
                    slot.dt_txt,
                    volume,
                    slot.pop * 100.0
                );
                true
            } else {
                false
            }
        })
}

// ───────────────────────────────────────────────────────────────
// Adapter
// ───────────────────────────────────────────────────────────────

pub struct WeatherAdapter<C> {
    url: heapless::String<256>,
    threshold: f32,
    clock: C,
}

impl<C: ClockPort> WeatherAdapter<C> {
    pub fn new(url: &str, threshold: f32, clock: C) -> Self {
        let url = heapless::String::try_from(url).unwrap_or_else(|_| {
            warn!("Weather: URL longer than 256 bytes, forecasts disabled");
            heapless::String::new()
        });
        Self {
            url,
            threshold,
            clock,
        }
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    /// The clock used to pick "today" out of the forecast.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Evaluate a fetched body against today's date.  Fail-open.
    pub fn evaluate(&self, body: &[u8]) -> bool {
        match parse_forecast(body) {
            Ok(doc) => rain_expected(&doc, self.clock.now().date(), self.threshold),
            Err(e) => {
                warn!("Weather: {}", e);
                false
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn fetch(&self) -> Result<Vec<u8>, CommsError> {
        use esp_idf_svc::http::Method;
        use esp_idf_svc::http::client::{Configuration, EspHttpConnection};

        let mut conn = EspHttpConnection::new(&Configuration::default())
            .map_err(|_| CommsError::WeatherUnavailable)?;
        conn.initiate_request(Method::Get, &self.url, &[])
            .map_err(|_| CommsError::WeatherUnavailable)?;
        conn.initiate_response()
            .map_err(|_| CommsError::WeatherUnavailable)?;
        if conn.status() != 200 {
            warn!("Weather: HTTP {}", conn.status());
            return Err(CommsError::WeatherUnavailable);
        }

        let mut body = Vec::with_capacity(16 * 1024);
        let mut chunk = [0u8; 512];
        loop {
            let n = conn
                .read(&mut chunk)
                .map_err(|_| CommsError::WeatherUnavailable)?;
            if n == 0 {
                break;
            }
            if body.len() + n > MAX_BODY {
                warn!("Weather: body exceeds {} bytes", MAX_BODY);
                return Err(CommsError::WeatherUnavailable);
            }
            body.extend_from_slice(&chunk[..n]);
        }
        Ok(body)
    }

    /// Host builds have no HTTP client.
    #[cfg(not(target_os = "espidf"))]
    fn fetch(&self) -> Result<Vec<u8>, CommsError> {
        Err(CommsError::WeatherUnavailable)
    }
}

impl<C: ClockPort> WeatherPort for WeatherAdapter<C> {
    fn is_rain_expected_or_occurring(&mut self) -> bool {
        if self.url.is_empty() {
            return false;
        }
        match self.fetch() {
            Ok(body) => self.evaluate(&body),
            Err(e) => {
                warn!("Weather: {}, assuming dry", e);
                false
            }
        }
    }
}
