use std::thread;
use std::time::Duration;
use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use log::{error, info};
use crate::classifier::{check_rain, daily_digest, Notification, RainOutcome, Rules};
use crate::config::Config;
use crate::errors::MonitorError;
use crate::manager_feishu::{Notifier, ANNOUNCEMENT_MARKER};
use crate::manager_qweather::ForecastSource;
use crate::retry::Transient;

/// State carried between ticks
#[derive(Default, Debug, Clone, PartialEq)]
pub struct MonitorState {
    pub last_daily_push_date: Option<NaiveDate>,
    pub rain_active: bool,
}

/// What a daily trigger evaluation ended in
#[derive(Debug, PartialEq)]
pub enum DailyOutcome {
    NotDue,
    AlreadyPushed,
    FetchFailed,
    Pushed,
}

/// The monitor loop, owns its state and its forecast source and notifier
pub struct Monitor<F: ForecastSource, N: Notifier> {
    config: Config,
    forecast: F,
    notifier: N,
    state: MonitorState,
}

impl<F: ForecastSource, N: Notifier> Monitor<F, N> {
    /// Returns a monitor with fresh state
    ///
    /// # Arguments
    ///
    /// * 'config' - configuration
    /// * 'forecast' - forecast source
    /// * 'notifier' - where notifications go
    pub fn new(config: Config, forecast: F, notifier: N) -> Self {
        Self { config, forecast, notifier, state: MonitorState::default() }
    }

    /// Runs ticks forever, only returns on a fault that the loop can't handle itself
    ///
    pub fn run(&mut self) -> Result<(), MonitorError> {
        info!("Monitor started for {}, entering main loop...", self.config.location.name);
        let tz = self.config.timezone();

        loop {
            let now = Utc::now().with_timezone(&tz);

            self.tick(now)?;

            let sleep_secs = seconds_to_next_check(now, self.config.settings.check_interval_minutes);
            info!("Waiting {} seconds until next check...", sleep_secs);
            thread::sleep(Duration::from_secs(sleep_secs));
        }
    }

    /// Evaluates both triggers once, daily digest first
    ///
    /// # Arguments
    ///
    /// * 'now' - current local time
    pub fn tick(&mut self, now: DateTime<FixedOffset>) -> Result<(), MonitorError> {
        self.handle_daily_push(now)?;
        self.handle_rain_alert(now)?;

        Ok(())
    }

    /// Pushes the daily digest if this is the configured minute and it hasn't been pushed today.
    /// A failed fetch leaves the date unmarked, a failed push doesn't.
    ///
    /// # Arguments
    ///
    /// * 'now' - current local time
    pub fn handle_daily_push(&mut self, now: DateTime<FixedOffset>) -> Result<DailyOutcome, MonitorError> {
        let settings = &self.config.settings;
        if now.hour() != settings.daily_push_hour || now.minute() != settings.daily_push_minute {
            return Ok(DailyOutcome::NotDue);
        }

        let today = now.date_naive();
        if self.state.last_daily_push_date == Some(today) {
            return Ok(DailyOutcome::AlreadyPushed);
        }

        info!("Daily push time {:02}:{:02} reached, preparing digest...",
            settings.daily_push_hour, settings.daily_push_minute);

        let forecast = match self.forecast.fetch_daily() {
            Ok(f) => f,
            Err(e) if e.is_transient() => {
                error!("Failed to fetch 3 day forecast, skipping daily push: {}", e);
                return Ok(DailyOutcome::FetchFailed);
            }
            Err(e) => return Err(MonitorError::new(e.to_string(), "daily digest")),
        };

        let Some(digest) = daily_digest(&forecast, today, &self.config.location.name, &self.rules()) else {
            error!("3 day forecast was empty, skipping daily push");
            return Ok(DailyOutcome::FetchFailed);
        };

        self.send(&digest);
        self.state.last_daily_push_date = Some(today);

        Ok(DailyOutcome::Pushed)
    }

    /// Checks the coming hours for heavy rain on every check interval boundary and alerts
    /// once per rain episode
    ///
    /// # Arguments
    ///
    /// * 'now' - current local time
    pub fn handle_rain_alert(&mut self, now: DateTime<FixedOffset>) -> Result<Option<RainOutcome>, MonitorError> {
        if now.minute() % self.config.settings.check_interval_minutes != 0 {
            return Ok(None);
        }

        info!("Checking weather for the coming hours...");
        let hourly = match self.forecast.fetch_hourly(now) {
            Ok(h) => h,
            Err(e) if e.is_transient() => {
                error!("Failed to fetch hourly forecast: {}", e);
                Vec::new()
            }
            Err(e) => return Err(MonitorError::new(e.to_string(), "rain check")),
        };

        if !hourly.is_empty() {
            let lines = hourly.iter().map(|h| h.to_string()).collect::<Vec<String>>();
            info!("Hourly forecast:\n{}", lines.join("\n"));
        }

        let outcome = check_rain(&hourly, self.state.rain_active, &self.config.location.name, &self.rules());
        match &outcome {
            RainOutcome::Onset(alert) => {
                info!("New heavy rain episode detected, pushing alert");
                self.send(alert);
            }
            RainOutcome::Ongoing => info!("Heavy rain ongoing, not pushing again"),
            RainOutcome::Clear { was_active: true } => info!("Heavy rain has passed, rain alert re-armed"),
            RainOutcome::Clear { was_active: false } => info!("No heavy rain expected, nothing to push"),
        }
        self.state.rain_active = outcome.rain_active();

        Ok(Some(outcome))
    }

    /// Sends a fixed notification exercising every part of the message format
    ///
    pub fn run_test_push(&self) -> Result<(), MonitorError> {
        info!("Sending test push...");
        let notification = test_notification(&self.config.location.name);
        self.notifier
            .push(&notification.title, &notification.content)
            .map_err(|e| MonitorError::new(e.to_string(), "test push"))?;
        info!("Test push sent");

        Ok(())
    }

    /// Pushes a notification, a failed push is logged by the notifier and otherwise ignored
    fn send(&self, notification: &Notification) {
        let _ = self.notifier.push(&notification.title, &notification.content);
    }

    fn rules(&self) -> Rules<'_> {
        Rules {
            keywords: &self.config.keywords,
            rain_threshold_precip: self.config.settings.rain_threshold_precip,
            rain_threshold_pop: self.config.settings.rain_threshold_pop,
        }
    }
}

/// Seconds to sleep until the next multiple of the check interval past the hour.
/// Never zero, standing on a boundary gives a full interval.
///
/// # Arguments
///
/// * 'now' - current local time
/// * 'interval_minutes' - the check interval, at least 1
pub fn seconds_to_next_check(now: DateTime<FixedOffset>, interval_minutes: u32) -> u64 {
    let interval = interval_minutes.max(1);
    let mut next_minute = (interval - now.minute() % interval) % interval;
    if next_minute == 0 {
        next_minute = interval;
    }

    (next_minute * 60 - now.second()) as u64
}

/// The synthetic notification used by the test push
///
/// # Arguments
///
/// * 'location_name' - display name for the header
pub fn test_notification(location_name: &str) -> Notification {
    let daily_summary = "📅 **Today's Weather · Sunny transitioning to Cloudy**  \n\
                         🌡 Temperature: 22 ~ 34℃  \n\
                         💨 Wind: S scale 4  \n\
                         💧 Humidity: 80%";

    let rain_warning = "⚠️ **Rain Warning · expected from 15:00**  \n\
                        ∙ 15:00 | Light Rain | probability 70%  \n\
                        ∙ 16:00 | Moderate Rain | probability 90%  \n\
                        ∙ 17:00 | Light Rain | probability 60%";

    Notification {
        title: format!("{}[TEST] Weather and Rain Notification", ANNOUNCEMENT_MARKER),
        content: format!("📍 {}\n\n{}\n\n---\n{}", location_name, daily_summary, rain_warning),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use chrono::TimeZone;
    use crate::config::tests::sample_config;
    use crate::manager_feishu::errors::FeishuError;
    use crate::manager_qweather::errors::QWeatherError;
    use crate::models::forecast::{DailyForecast, HourlyForecast};
    use super::*;

    #[derive(Default)]
    struct FakeForecast {
        daily: RefCell<VecDeque<Result<Vec<DailyForecast>, QWeatherError>>>,
        hourly: RefCell<VecDeque<Result<Vec<HourlyForecast>, QWeatherError>>>,
        daily_calls: Cell<u32>,
        hourly_calls: Cell<u32>,
    }

    impl FakeForecast {
        fn with_daily(self, result: Result<Vec<DailyForecast>, QWeatherError>) -> Self {
            self.daily.borrow_mut().push_back(result);
            self
        }

        fn with_hourly(self, result: Result<Vec<HourlyForecast>, QWeatherError>) -> Self {
            self.hourly.borrow_mut().push_back(result);
            self
        }
    }

    impl ForecastSource for FakeForecast {
        fn fetch_daily(&self) -> Result<Vec<DailyForecast>, QWeatherError> {
            self.daily_calls.set(self.daily_calls.get() + 1);
            self.daily.borrow_mut().pop_front().unwrap_or_else(|| Ok(three_days()))
        }

        fn fetch_hourly(&self, _now: DateTime<FixedOffset>) -> Result<Vec<HourlyForecast>, QWeatherError> {
            self.hourly_calls.set(self.hourly_calls.get() + 1);
            self.hourly.borrow_mut().pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[derive(Default)]
    struct FakeNotifier {
        sent: RefCell<Vec<String>>,
        fail: bool,
    }

    impl Notifier for FakeNotifier {
        fn push(&self, title: &str, _content: &str) -> Result<(), FeishuError> {
            self.sent.borrow_mut().push(title.to_string());
            if self.fail {
                Err(FeishuError::Rejected("down".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn at(day: u32, hour: u32, minute: u32, second: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600).unwrap()
            .with_ymd_and_hms(2024, 6, day, hour, minute, second).unwrap()
    }

    fn forecast_day(day: u32, text: &str, precip: f64) -> DailyForecast {
        DailyForecast {
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            temp_min: 25,
            temp_max: 32,
            text_day: text.to_string(),
            text_night: text.to_string(),
            wind_dir_day: "S".to_string(),
            wind_scale_day: "1-3".to_string(),
            wind_dir_night: "S".to_string(),
            wind_scale_night: "1-3".to_string(),
            humidity: 75,
            precip,
        }
    }

    fn three_days() -> Vec<DailyForecast> {
        vec![forecast_day(1, "Sunny", 0.0), forecast_day(2, "Moderate Rain", 12.0), forecast_day(3, "Overcast", 0.0)]
    }

    fn heavy() -> Vec<HourlyForecast> {
        vec![HourlyForecast { time: "16:00".to_string(), text: "Moderate Rain".to_string(), pop: 90 }]
    }

    fn light() -> Vec<HourlyForecast> {
        vec![HourlyForecast { time: "16:00".to_string(), text: "Light Rain".to_string(), pop: 90 }]
    }

    fn monitor(forecast: FakeForecast) -> Monitor<FakeForecast, FakeNotifier> {
        Monitor::new(sample_config(), forecast, FakeNotifier::default())
    }

    #[test]
    fn daily_push_once_per_date() {
        let mut m = monitor(FakeForecast::default());

        assert_eq!(m.handle_daily_push(at(1, 8, 0, 0)).unwrap(), DailyOutcome::Pushed);
        assert_eq!(m.handle_daily_push(at(1, 8, 0, 40)).unwrap(), DailyOutcome::AlreadyPushed);
        assert_eq!(m.handle_daily_push(at(1, 8, 1, 0)).unwrap(), DailyOutcome::NotDue);

        assert_eq!(m.notifier.sent.borrow().len(), 1);
        assert_eq!(m.notifier.sent.borrow()[0], "⚠️ Today's Weather - Rain Tomorrow");
        assert_eq!(m.forecast.daily_calls.get(), 1);
        assert_eq!(m.state.last_daily_push_date, NaiveDate::from_ymd_opt(2024, 6, 1));
    }

    #[test]
    fn daily_push_again_next_day() {
        let mut m = monitor(FakeForecast::default());

        m.handle_daily_push(at(1, 8, 0, 0)).unwrap();
        assert_eq!(m.handle_daily_push(at(2, 8, 0, 0)).unwrap(), DailyOutcome::Pushed);
        assert_eq!(m.notifier.sent.borrow().len(), 2);
    }

    #[test]
    fn failed_fetch_leaves_date_unmarked() {
        let forecast = FakeForecast::default().with_daily(Err(QWeatherError::Http("timeout".to_string())));
        let mut m = monitor(forecast);

        assert_eq!(m.handle_daily_push(at(1, 8, 0, 0)).unwrap(), DailyOutcome::FetchFailed);
        assert_eq!(m.state.last_daily_push_date, None);
        assert!(m.notifier.sent.borrow().is_empty());

        // a second tick within the same minute tries again
        assert_eq!(m.handle_daily_push(at(1, 8, 0, 30)).unwrap(), DailyOutcome::Pushed);
    }

    #[test]
    fn failed_push_still_marks_date() {
        let mut m = Monitor::new(sample_config(), FakeForecast::default(),
                                 FakeNotifier { fail: true, ..Default::default() });

        assert_eq!(m.handle_daily_push(at(1, 8, 0, 0)).unwrap(), DailyOutcome::Pushed);
        assert_eq!(m.handle_daily_push(at(1, 8, 0, 30)).unwrap(), DailyOutcome::AlreadyPushed);
        assert_eq!(m.notifier.sent.borrow().len(), 1);
    }

    #[test]
    fn malformed_daily_document_ends_the_loop() {
        let forecast = FakeForecast::default().with_daily(Err(QWeatherError::Document("bad".to_string())));
        let mut m = monitor(forecast);

        assert!(m.tick(at(1, 8, 0, 0)).is_err());
    }

    #[test]
    fn rain_alert_once_per_episode() {
        let forecast = FakeForecast::default()
            .with_hourly(Ok(heavy()))
            .with_hourly(Ok(heavy()))
            .with_hourly(Ok(heavy()));
        let mut m = monitor(forecast);

        for minute in [0, 30] {
            m.handle_rain_alert(at(1, 14, minute, 0)).unwrap();
        }
        m.handle_rain_alert(at(1, 15, 0, 0)).unwrap();

        assert_eq!(m.notifier.sent.borrow().len(), 1);
        assert!(m.state.rain_active);
    }

    #[test]
    fn rain_alert_rearms_after_clear() {
        let forecast = FakeForecast::default()
            .with_hourly(Ok(heavy()))
            .with_hourly(Ok(light()))
            .with_hourly(Ok(heavy()));
        let mut m = monitor(forecast);

        m.handle_rain_alert(at(1, 14, 0, 0)).unwrap();
        m.handle_rain_alert(at(1, 14, 30, 0)).unwrap();
        assert!(!m.state.rain_active);
        m.handle_rain_alert(at(1, 15, 0, 0)).unwrap();

        assert_eq!(m.notifier.sent.borrow().len(), 2);
        assert_eq!(m.notifier.sent.borrow()[1], "⚠️ Heavy rain expected from 16:00, take care");
    }

    #[test]
    fn rain_check_only_on_interval_boundary() {
        let mut m = monitor(FakeForecast::default());

        assert_eq!(m.handle_rain_alert(at(1, 14, 15, 0)).unwrap(), None);
        assert_eq!(m.forecast.hourly_calls.get(), 0);
        assert!(m.handle_rain_alert(at(1, 14, 30, 0)).unwrap().is_some());
        assert_eq!(m.forecast.hourly_calls.get(), 1);
    }

    #[test]
    fn failed_hourly_fetch_clears_rain_state() {
        let forecast = FakeForecast::default()
            .with_hourly(Ok(heavy()))
            .with_hourly(Err(QWeatherError::Provider("500".to_string())));
        let mut m = monitor(forecast);

        m.handle_rain_alert(at(1, 14, 0, 0)).unwrap();
        let outcome = m.handle_rain_alert(at(1, 14, 30, 0)).unwrap();

        assert_eq!(outcome, Some(RainOutcome::Clear { was_active: true }));
        assert!(!m.state.rain_active);
    }

    #[test]
    fn non_json_hourly_body_degrades_instead_of_ending_the_loop() {
        let forecast = FakeForecast::default()
            .with_hourly(Ok(heavy()))
            .with_hourly(Err(QWeatherError::Body("expected value at line 1 column 1".to_string())));
        let mut m = monitor(forecast);

        m.handle_rain_alert(at(1, 14, 0, 0)).unwrap();
        let outcome = m.handle_rain_alert(at(1, 14, 30, 0));

        assert_eq!(outcome.unwrap(), Some(RainOutcome::Clear { was_active: true }));
        assert_eq!(m.notifier.sent.borrow().len(), 1);
    }

    #[test]
    fn non_json_daily_body_skips_the_digest() {
        let forecast = FakeForecast::default().with_daily(Err(QWeatherError::Body("<html>".to_string())));
        let mut m = monitor(forecast);

        assert_eq!(m.handle_daily_push(at(1, 8, 0, 0)).unwrap(), DailyOutcome::FetchFailed);
        assert_eq!(m.state.last_daily_push_date, None);
    }

    #[test]
    fn tick_runs_both_triggers() {
        let forecast = FakeForecast::default().with_hourly(Ok(heavy()));
        let mut m = monitor(forecast);

        m.tick(at(1, 8, 0, 0)).unwrap();

        assert_eq!(m.notifier.sent.borrow().len(), 2);
        assert_eq!(m.forecast.daily_calls.get(), 1);
        assert_eq!(m.forecast.hourly_calls.get(), 1);
    }

    #[test]
    fn sleep_aligns_to_interval() {
        assert_eq!(seconds_to_next_check(at(1, 14, 7, 20), 30), 23 * 60 - 20);
        assert_eq!(seconds_to_next_check(at(1, 14, 45, 0), 30), 15 * 60);
        assert_eq!(seconds_to_next_check(at(1, 14, 59, 59), 1), 1);
    }

    #[test]
    fn sleep_on_boundary_is_full_interval() {
        assert_eq!(seconds_to_next_check(at(1, 14, 30, 0), 30), 30 * 60);
        assert_eq!(seconds_to_next_check(at(1, 14, 30, 5), 30), 30 * 60 - 5);
        assert_eq!(seconds_to_next_check(at(1, 14, 0, 0), 60), 60 * 60);
    }

    #[test]
    fn test_push_uses_fixed_content() {
        let m = monitor(FakeForecast::default());

        m.run_test_push().unwrap();

        assert_eq!(m.notifier.sent.borrow()[0], "📢[TEST] Weather and Rain Notification");
        assert_eq!(m.forecast.daily_calls.get(), 0);
        assert!(test_notification("Shenzhen").content.starts_with("📍 Shenzhen\n\n📅"));
    }
}
