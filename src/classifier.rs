//! Turns forecasts into notifications.
//!
//! Two independent paths exist: the daily digest, covering today's weather plus
//! rain and severe weather warnings for the three day outlook, and the rain check,
//! which looks for heavy rain in the coming hours and holds state between checks
//! so that one rain episode gives one alert.

use std::collections::BTreeSet;
use chrono::NaiveDate;
use crate::config::Keywords;
use crate::manager_feishu::{ANNOUNCEMENT_MARKER, WARNING_MARKER};
use crate::models::forecast::{DailyForecast, HourlyForecast};

/// A title and markdown body ready to be pushed
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub title: String,
    pub content: String,
}

/// Thresholds and keywords the classification runs with
pub struct Rules<'a> {
    pub keywords: &'a Keywords,
    pub rain_threshold_precip: f64,
    pub rain_threshold_pop: u8,
}

/// Result of a rain check given the rain state before the check
#[derive(Debug, PartialEq)]
pub enum RainOutcome {
    /// Qualifying rain and no alert sent yet for this episode
    Onset(Notification),
    /// Qualifying rain already alerted
    Ongoing,
    /// No qualifying rain in the window
    Clear { was_active: bool },
}

impl RainOutcome {
    /// The rain state to carry into the next check
    pub fn rain_active(&self) -> bool {
        matches!(self, RainOutcome::Onset(_) | RainOutcome::Ongoing)
    }
}

/// Builds the daily digest from a three day forecast, returns None if there is no forecast at all.
///
/// # Arguments
///
/// * 'forecast' - daily forecasts, first entry is taken as today
/// * 'today' - the current local date, used to label days
/// * 'location_name' - display name for the header
/// * 'rules' - keywords and thresholds
pub fn daily_digest(forecast: &[DailyForecast], today: NaiveDate, location_name: &str, rules: &Rules)
    -> Option<Notification> {

    let today_data = forecast.first()?;

    let daily_content = format!(
        "📅 **Today's Weather · {}**  \n🌡 Temperature: {} ~ {}℃  \n💨 Wind: {}  \n💧 Humidity: {}%",
        today_data.summary(),
        today_data.temp_min, today_data.temp_max,
        today_data.wind_summary(),
        today_data.humidity);

    let mut rain_alerts: Vec<String> = Vec::new();
    let mut severe_alerts: Vec<String> = Vec::new();
    let mut rain_days: BTreeSet<i64> = BTreeSet::new();
    let mut severe_days: BTreeSet<i64> = BTreeSet::new();

    for day in forecast {
        let offset = (day.date - today).num_days();
        let label = day_label(offset, day.date);
        let in_outlook = (0..=2).contains(&offset);

        if is_rain_day(day, rules) {
            rain_alerts.push(format!("∙ **{}**: {}, expected precipitation {:.1}mm", label, day.text_day, day.precip));
            if in_outlook { rain_days.insert(offset); }
        }

        if find_keyword(&day.combined_text(), &rules.keywords.severe).is_some() {
            severe_alerts.push(format!("∙ **{}**: {}", label, day.text_day));
            if in_outlook { severe_days.insert(offset); }
        }
    }

    let mut content = format!("📍 {}\n\n{}", location_name, daily_content);
    if !severe_alerts.is_empty() {
        content += &format!("\n\n---\n**Severe Weather Alerts**  \n{}", severe_alerts.join("\n"));
    }
    if !rain_alerts.is_empty() {
        content += &format!("\n\n---\n**Rain Alerts**  \n{}", rain_alerts.join("\n"));
    }

    Some(Notification { title: digest_title(&severe_days, &rain_days), content })
}

/// Title for the daily digest. Severe weather anywhere in the outlook wins over rain.
///
/// # Arguments
///
/// * 'severe_days' - day offsets (0-2) with severe weather
/// * 'rain_days' - day offsets (0-2) with rain
pub fn digest_title(severe_days: &BTreeSet<i64>, rain_days: &BTreeSet<i64>) -> String {
    if !severe_days.is_empty() {
        format!("{} Today's Weather - Severe Weather Warning", WARNING_MARKER)
    } else if let Some(suffix) = rain_title_suffix(rain_days) {
        format!("{} Today's Weather - {}", WARNING_MARKER, suffix)
    } else {
        format!("{} Today's Weather", ANNOUNCEMENT_MARKER)
    }
}

/// Maps a set of rain day offsets to a phrase, each non-empty subset of {0, 1, 2} has its own
///
/// # Arguments
///
/// * 'rain_days' - day offsets with rain
pub fn rain_title_suffix(rain_days: &BTreeSet<i64>) -> Option<&'static str> {
    let days = rain_days.iter().copied().collect::<Vec<i64>>();
    match days.as_slice() {
        [0] => Some("Rain Today"),
        [1] => Some("Rain Tomorrow"),
        [2] => Some("Rain the Day After Tomorrow"),
        [0, 1] => Some("Rain Today and Tomorrow"),
        [1, 2] => Some("Rain Tomorrow and the Day After"),
        [0, 2] => Some("Rain Today and the Day After Tomorrow"),
        [0, 1, 2] => Some("Rain for the Next Three Days"),
        _ => None,
    }
}

/// A day counts as rainy on any rain keyword, or on enough precipitation when the
/// condition text mentions rain at all
///
/// # Arguments
///
/// * 'day' - the forecast for the day
/// * 'rules' - keywords and thresholds
pub fn is_rain_day(day: &DailyForecast, rules: &Rules) -> bool {
    let text = day.combined_text();

    find_keyword(&text, &rules.keywords.rain).is_some()
        || (day.precip >= rules.rain_threshold_precip && contains(&text, &rules.keywords.rain_marker))
}

/// Hourly records with heavy rain, light rain and showers don't count
///
/// # Arguments
///
/// * 'hourly' - hourly forecasts in the window
/// * 'rules' - keywords and thresholds
pub fn qualifying_hours<'a>(hourly: &'a [HourlyForecast], rules: &Rules) -> Vec<&'a HourlyForecast> {
    hourly.iter()
        .filter(|h| h.pop >= rules.rain_threshold_pop)
        .filter(|h| find_keyword(&h.text, &rules.keywords.severe_rain).is_some())
        .collect()
}

/// Runs the rain check for one tick
///
/// # Arguments
///
/// * 'hourly' - hourly forecasts in the window
/// * 'rain_active' - whether the current episode has already been alerted
/// * 'location_name' - display name for the header
/// * 'rules' - keywords and thresholds
pub fn check_rain(hourly: &[HourlyForecast], rain_active: bool, location_name: &str, rules: &Rules) -> RainOutcome {
    let detected = qualifying_hours(hourly, rules);

    let Some(first) = detected.first() else {
        return RainOutcome::Clear { was_active: rain_active };
    };

    if rain_active {
        return RainOutcome::Ongoing;
    }

    let title = format!("{} Heavy rain expected from {}, take care", WARNING_MARKER, first.time);
    let lines = detected.iter().map(|h| h.to_string()).collect::<Vec<String>>();
    let content = format!("📍 {}\n\n---\n💧 **Heavy Rain Details**  \n{}", location_name, lines.join("  \n"));

    RainOutcome::Onset(Notification { title, content })
}

fn day_label(offset: i64, date: NaiveDate) -> String {
    match offset {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        2 => "Day after tomorrow".to_string(),
        _ => date.format("%Y-%m-%d").to_string(),
    }
}

/// Returns the first keyword found in the text, matching ignores case
fn find_keyword<'a>(text: &str, keywords: &'a [String]) -> Option<&'a str> {
    keywords.iter()
        .find(|k| contains(text, k))
        .map(|k| k.as_str())
}

fn contains(text: &str, keyword: &str) -> bool {
    !keyword.is_empty() && text.to_lowercase().contains(&keyword.to_lowercase())
}
