use std::fmt;
use chrono::NaiveDate;

/// One calendar day of forecast
#[derive(Clone, Debug, PartialEq)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub temp_min: i32,
    pub temp_max: i32,
    pub text_day: String,
    pub text_night: String,
    pub wind_dir_day: String,
    pub wind_scale_day: String,
    pub wind_dir_night: String,
    pub wind_scale_night: String,
    pub humidity: u8,
    pub precip: f64,
}

impl DailyForecast {
    /// Day and night condition text joined, this is what all keyword matching runs against
    pub fn combined_text(&self) -> String {
        format!("{}{}", self.text_day, self.text_night)
    }

    /// Condition summary for the day, a single text if day and night agree
    pub fn summary(&self) -> String {
        if self.text_day == self.text_night {
            self.text_day.clone()
        } else {
            format!("{} transitioning to {}", self.text_day, self.text_night)
        }
    }

    /// Wind for the day, night wind is added only when it differs
    pub fn wind_summary(&self) -> String {
        let day = format!("{} scale {}", self.wind_dir_day, self.wind_scale_day);
        if self.wind_dir_day == self.wind_dir_night && self.wind_scale_day == self.wind_scale_night {
            day
        } else {
            format!("{} (night {} scale {})", day, self.wind_dir_night, self.wind_scale_night)
        }
    }
}

/// One hour of forecast, already converted to the monitor's local time
#[derive(Clone, Debug, PartialEq)]
pub struct HourlyForecast {
    pub time: String,
    pub text: String,
    pub pop: u8,
}

/// Implementation of the Display Trait for pretty print
impl fmt::Display for HourlyForecast {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "∙ {} | {} | precipitation probability {}%", self.time, self.text, self.pop)
    }
}
