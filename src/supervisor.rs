use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Once;
use std::time::Duration;
use log::error;
use crate::config::Config;
use crate::errors::MonitorError;
use crate::manager_feishu::Feishu;
use crate::manager_qweather::QWeather;
use crate::worker::Monitor;

/// Pause before a crashed monitor is started again
pub const RESTART_DELAY: Duration = Duration::from_secs(5);

static PANIC_HOOK: Once = Once::new();

thread_local! {
    static PANIC_REPORT: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// What the process does after a monitor instance has ended
#[derive(Debug, PartialEq)]
pub enum Supervision {
    Restart,
    Exit(i32),
}

/// Builds a monitor from the given configuration and runs it, either the endless loop
/// or a single test push. Faults, including panics, are logged and turned into
/// a decision on whether to restart.
///
/// # Arguments
///
/// * 'config' - freshly loaded configuration, the monitor starts with empty state
/// * 'test_mode' - send one test notification instead of running the loop
pub fn run_instance(config: Config, test_mode: bool) -> Supervision {
    install_panic_hook();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let retry = config.retry_policy();
        let qweather = QWeather::new(&config.api, &config.location, retry.clone());
        let feishu = Feishu::new(&config.api.webhook_url, retry);

        let mut monitor = Monitor::new(config, qweather, feishu);
        if test_mode {
            monitor.run_test_push()
        } else {
            monitor.run()
        }
    }));

    let fault = match result {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e),
        Err(payload) => Some(MonitorError::new(panic_report(payload), "monitor loop")),
    };

    decide(fault, test_mode)
}

/// Logs a fault and picks what to do next, a test run never restarts
///
/// # Arguments
///
/// * 'fault' - the error that ended the instance, if any
/// * 'test_mode' - whether the instance was a test push
pub fn decide(fault: Option<MonitorError>, test_mode: bool) -> Supervision {
    match fault {
        None => Supervision::Exit(0),
        Some(e) if test_mode => {
            error!("Test push failed:\n{}", e);
            Supervision::Exit(1)
        }
        Some(e) => {
            error!("Monitor crashed, restarting in {} seconds:\n{}", RESTART_DELAY.as_secs(), e);
            Supervision::Restart
        }
    }
}

/// Installs, once per process, a panic hook that records where the panic happened together
/// with a backtrace for the panicking thread. The previously installed hook still runs.
///
pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let location = info.location()
                .map(|l| l.to_string())
                .unwrap_or_else(|| "unknown location".to_string());
            let report = format!("at {}\nBacktrace:\n{}", location, Backtrace::force_capture());
            PANIC_REPORT.with(|r| *r.borrow_mut() = Some(report));

            previous(info);
        }));
    });
}

/// Panic message followed by the location and backtrace recorded by the panic hook, if any
///
/// # Arguments
///
/// * 'payload' - the payload caught from the unwinding panic
fn panic_report(payload: Box<dyn Any + Send>) -> String {
    let message = panic_message(payload);
    match PANIC_REPORT.with(|r| r.borrow_mut().take()) {
        Some(report) => format!("{}\n{}", message, report),
        None => message,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic with unknown payload".to_string()
    }
}
