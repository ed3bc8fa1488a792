pub mod errors;

use std::str::FromStr;
use std::time::Duration;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta};
use log::info;
use ureq::Agent;
use crate::config::{Api, Location};
use crate::manager_qweather::errors::QWeatherError;
use crate::models::forecast::{DailyForecast, HourlyForecast};
use crate::models::qweather::{DailyRecord, DailyResponse, Envelope, HourlyRecord, HourlyResponse};
use crate::retry::{with_retry, RetryPolicy};

/// How far ahead hourly forecasts are kept
pub const HOURLY_WINDOW_HOURS: i64 = 6;

/// Source of forecasts for the monitor loop
pub trait ForecastSource {
    /// Forecast for today and the two following days
    fn fetch_daily(&self) -> Result<Vec<DailyForecast>, QWeatherError>;

    /// Hourly forecast for the window starting at `now`, times given in `now`'s offset
    fn fetch_hourly(&self, now: DateTime<FixedOffset>) -> Result<Vec<HourlyForecast>, QWeatherError>;
}

/// Struct for fetching weather forecasts from the QWeather v7 API
pub struct QWeather {
    agent: Agent,
    api_host: String,
    key: String,
    lang: String,
    location: String,
    retry: RetryPolicy,
}

impl QWeather {
    /// Returns a QWeather struct ready for fetching forecasts
    ///
    /// # Arguments
    ///
    /// * 'api' - api host, key and language
    /// * 'location' - the location to fetch forecasts for
    /// * 'retry' - retry policy applied to every request
    pub fn new(api: &Api, location: &Location, retry: RetryPolicy) -> QWeather {
        let config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(30)))
            .build();

        let agent = config.into();

        Self {
            agent,
            api_host: api.api_host.trim_end_matches('/').to_string(),
            key: api.qweather_key.clone(),
            lang: api.lang.clone(),
            location: location.id.clone(),
            retry,
        }
    }

    /// Gets a document from the given API path. Transport errors, bad http status
    /// and provider error codes are all retried according to the retry policy.
    ///
    /// # Arguments
    ///
    /// * 'path' - API path excluding the host
    fn get_document(&self, path: &str) -> Result<String, QWeatherError> {
        let url = format!("{}{}", self.api_host, path);

        with_retry(&self.retry, &format!("QWeather request {}", path), || {
            let json = self.agent
                .get(url.as_str())
                .query("location", &self.location)
                .query("key", &self.key)
                .query("lang", &self.lang)
                .call()?
                .body_mut()
                .read_to_string()?;

            check_code(&json)?;

            Ok(json)
        })
    }
}

impl ForecastSource for QWeather {
    fn fetch_daily(&self) -> Result<Vec<DailyForecast>, QWeatherError> {
        info!("Fetching 3 day forecast...");
        let json = self.get_document("/v7/weather/3d")?;
        let forecast = parse_daily(&json)?;
        info!("3 day forecast fetched, {} days", forecast.len());

        Ok(forecast)
    }

    fn fetch_hourly(&self, now: DateTime<FixedOffset>) -> Result<Vec<HourlyForecast>, QWeatherError> {
        info!("Fetching {} hour forecast...", HOURLY_WINDOW_HOURS);
        let json = self.get_document("/v7/weather/24h")?;
        let forecast = parse_hourly(&json, now)?;
        info!("{} hour forecast fetched, {} records", HOURLY_WINDOW_HOURS, forecast.len());

        Ok(forecast)
    }
}

/// Checks the provider level status code carried in every response body.
/// A body that isn't json at all, e.g. a proxy error page, is reported as transient.
///
/// # Arguments
///
/// * 'json' - the raw response body
fn check_code(json: &str) -> Result<(), QWeatherError> {
    let envelope: Envelope = serde_json::from_str(json)
        .map_err(|e| if e.is_syntax() || e.is_eof() {
            QWeatherError::Body(e.to_string())
        } else {
            QWeatherError::Document(e.to_string())
        })?;
    if envelope.code != "200" {
        return Err(QWeatherError::Provider(envelope.code));
    }

    Ok(())
}

/// Parses a 3 day forecast document
///
/// # Arguments
///
/// * 'json' - the raw response body
pub fn parse_daily(json: &str) -> Result<Vec<DailyForecast>, QWeatherError> {
    let response: DailyResponse = serde_json::from_str(json)?;
    if response.code != "200" {
        return Err(QWeatherError::Provider(response.code));
    }

    response.daily.into_iter().map(to_daily_forecast).collect()
}

/// Parses a 24 hour forecast document and keeps records in [now, now + 6h)
///
/// # Arguments
///
/// * 'json' - the raw response body
/// * 'now' - start of the window, its offset is used for the time labels
pub fn parse_hourly(json: &str, now: DateTime<FixedOffset>) -> Result<Vec<HourlyForecast>, QWeatherError> {
    let response: HourlyResponse = serde_json::from_str(json)?;
    if response.code != "200" {
        return Err(QWeatherError::Provider(response.code));
    }

    let end = now + TimeDelta::hours(HOURLY_WINDOW_HOURS);
    let mut result: Vec<HourlyForecast> = Vec::new();
    for record in response.hourly {
        let fx_time = parse_fx_time(&record.fx_time)?.with_timezone(&now.timezone());
        if fx_time >= now && fx_time < end {
            result.push(to_hourly_forecast(record, fx_time)?);
        }
    }

    Ok(result)
}

fn to_daily_forecast(record: DailyRecord) -> Result<DailyForecast, QWeatherError> {
    Ok(DailyForecast {
        date: NaiveDate::parse_from_str(&record.fx_date, "%Y-%m-%d")?,
        temp_min: number("tempMin", &record.temp_min)?,
        temp_max: number("tempMax", &record.temp_max)?,
        text_day: record.text_day,
        text_night: record.text_night,
        wind_dir_day: record.wind_dir_day,
        wind_scale_day: record.wind_scale_day,
        wind_dir_night: record.wind_dir_night,
        wind_scale_night: record.wind_scale_night,
        humidity: number("humidity", &record.humidity)?,
        precip: number("precip", &record.precip)?,
    })
}

fn to_hourly_forecast(record: HourlyRecord, fx_time: DateTime<FixedOffset>) -> Result<HourlyForecast, QWeatherError> {
    let pop = match record.pop.as_deref() {
        None | Some("") => 0,
        Some(p) => number("pop", p)?,
    };

    Ok(HourlyForecast {
        time: fx_time.format("%H:%M").to_string(),
        text: record.text,
        pop,
    })
}

/// Parses a forecast time stamp. QWeather gives minute precision, e.g. `2024-06-01T15:00+08:00`,
/// but a trailing `Z` and full RFC 3339 are accepted as well.
///
/// # Arguments
///
/// * 'fx_time' - the time stamp as given by the provider
fn parse_fx_time(fx_time: &str) -> Result<DateTime<FixedOffset>, QWeatherError> {
    let fx_time = match fx_time.strip_suffix('Z') {
        Some(t) => format!("{}+00:00", t),
        None => fx_time.to_string(),
    };

    if let Ok(t) = DateTime::parse_from_rfc3339(&fx_time) {
        return Ok(t);
    }

    Ok(DateTime::parse_from_str(&fx_time, "%Y-%m-%dT%H:%M%:z")?)
}

fn number<T: FromStr>(field: &str, value: &str) -> Result<T, QWeatherError> {
    value.trim().parse::<T>()
        .map_err(|_| QWeatherError::Document(format!("invalid {}: '{}'", field, value)))
}
