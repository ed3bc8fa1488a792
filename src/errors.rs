use std::fmt;
use std::fmt::Formatter;
use chrono::Local;
use thiserror::Error;

/// Error depicting errors that occur while loading or validating configuration
///
#[derive(Debug, Error)]
#[error("ConfigError: {0}")]
pub struct ConfigError(pub String);
impl From<&str> for ConfigError {
    fn from(e: &str) -> Self { ConfigError(e.to_string()) }
}
impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self { ConfigError(e.to_string()) }
}
impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self { ConfigError(e.to_string()) }
}

/// Error depicting faults that end a running monitor loop.
/// These are not retried where they occur but are handed to the supervisor.
///
pub struct MonitorError {
    msg: String,
    task: &'static str,
}
impl MonitorError {
    pub fn new(msg: String, task: &'static str) -> MonitorError {
        MonitorError { msg, task }
    }
}
impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let report_time = format!("{}", Local::now().format("%Y-%m-%d %H:%M:%S"));
        let caption = format!("{} MonitorError ", report_time);
        writeln!(f, "{:=<80}", caption)?;
        write!(f, "{}\nTask: {}", self.msg, self.task)
    }
}
impl fmt::Debug for MonitorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "MonitorError {{ msg: {:?}, task: {:?} }}", self.msg, self.task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_error_display_names_task() {
        let e = MonitorError::new("bad document".to_string(), "daily digest");
        let s = e.to_string();

        assert!(s.contains("MonitorError"));
        assert!(s.contains("bad document"));
        assert!(s.ends_with("Task: daily digest"));
    }

    #[test]
    fn config_error_from_str() {
        let e = ConfigError::from("broken");
        assert_eq!(e.to_string(), "ConfigError: broken");
    }
}
