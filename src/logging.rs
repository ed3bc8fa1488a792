use anyhow::Result;
use log::LevelFilter;
use log4rs::Handle;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use crate::config::General;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} - {l} - {m}{n}";

/// Sets up logging to a size rotated log file and, if configured, to stdout.
/// Rolled files are named after the log file with a window index appended.
///
/// # Arguments
///
/// * 'general' - log path, level and rotation settings
pub fn setup_logger(general: &General) -> Result<Handle> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}.{{}}", general.log_path), general.log_backups)?;
    let trigger = SizeTrigger::new(general.log_max_bytes);
    let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));

    let file = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(&general.log_path, Box::new(policy))?;

    let mut builder = Config::builder()
        .appender(Appender::builder().build("file", Box::new(file)));
    let mut root = Root::builder().appender("file");

    if general.log_to_stdout {
        builder = builder.appender(Appender::builder().build("stdout", Box::new(console())));
        root = root.appender("stdout");
    }

    let config = builder.build(root.build(general.log_level))?;

    Ok(log4rs::init_config(config)?)
}

/// Stdout only logging for when the configuration, and thereby the log file, isn't available
///
pub fn setup_console_logger() -> Result<Handle> {
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(console())))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))?;

    Ok(log4rs::init_config(config)?)
}

fn console() -> ConsoleAppender {
    ConsoleAppender::builder()
        .target(Target::Stdout)
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build()
}
