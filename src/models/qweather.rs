use serde::Deserialize;

/// Common part of every QWeather v7 response, error responses carry nothing else
#[derive(Deserialize)]
pub struct Envelope {
    pub code: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub fx_date: String,
    pub temp_max: String,
    pub temp_min: String,
    #[serde(default)]
    pub text_day: String,
    #[serde(default)]
    pub text_night: String,
    #[serde(default)]
    pub wind_dir_day: String,
    #[serde(default)]
    pub wind_scale_day: String,
    #[serde(default)]
    pub wind_dir_night: String,
    #[serde(default)]
    pub wind_scale_night: String,
    pub humidity: String,
    pub precip: String,
}

#[derive(Deserialize)]
pub struct DailyResponse {
    pub code: String,
    #[serde(default)]
    pub daily: Vec<DailyRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyRecord {
    pub fx_time: String,
    #[serde(default)]
    pub text: String,
    pub pop: Option<String>,
}

#[derive(Deserialize)]
pub struct HourlyResponse {
    pub code: String,
    #[serde(default)]
    pub hourly: Vec<HourlyRecord>,
}
