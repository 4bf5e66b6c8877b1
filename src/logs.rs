use log::LevelFilter;
use log4rs::{
    Config, Handle,
    append::{
        console::{ConsoleAppender, Target},
        rolling_file::{
            RollingFileAppender,
            policy::compound::{
                CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
            },
        },
    },
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};
use thiserror::Error;

const LOG_SIZE_LIMIT: u64 = 10 * 1024 * 1024; // 10 MB

const LOG_FILE_COUNT: u32 = 3;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {l} {t} - {m}{n}";

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid log archive pattern: {0}")]
    Roller(String),

    #[error("failed to open log file: {0}")]
    File(#[from] std::io::Error),

    #[error("invalid logger configuration: {0}")]
    Config(#[from] log4rs::config::runtime::ConfigErrors),

    #[error("logger already initialized: {0}")]
    AlreadySet(#[from] log::SetLoggerError),
}

/// Where file logs go, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLogSettings {
    pub file_path: String,
    pub archive_pattern: String,
}

impl FileLogSettings {
    /// Both `LOG_FILE_PATH` and `LOG_ARCHIVE_PATTERN` must be set to enable
    /// the rolling file appender.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Some(Self {
            file_path: var("LOG_FILE_PATH")?,
            archive_pattern: var("LOG_ARCHIVE_PATTERN")?,
        })
    }
}

fn build_config(file: Option<&FileLogSettings>) -> Result<Config, LoggerError> {
    let stderr_level = LevelFilter::Info;
    let file_level = LevelFilter::Debug;

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();

    let mut config = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(ThresholdFilter::new(stderr_level)))
            .build("stderr", Box::new(stderr)),
    );
    let mut root = Root::builder().appender("stderr");

    if let Some(file) = file {
        let trigger = SizeTrigger::new(LOG_SIZE_LIMIT);
        let roller = FixedWindowRoller::builder()
            .build(&file.archive_pattern, LOG_FILE_COUNT)
            .map_err(|e| LoggerError::Roller(e.to_string()))?;
        let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));

        let logfile = RollingFileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build(&file.file_path, Box::new(policy))?;

        config = config.appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(file_level)))
                .build("logfile", Box::new(logfile)),
        );
        root = root.appender("logfile");
    }

    Ok(config.build(root.build(LevelFilter::Debug))?)
}

/// Logs Info and above to stderr, plus Debug and above to a size-rolled file
/// when one is configured.
pub fn init_logger(file: Option<&FileLogSettings>) -> Result<Handle, LoggerError> {
    let config = build_config(file)?;
    Ok(log4rs::init_config(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_logging_needs_both_settings() {
        let only_path = |key: &str| (key == "LOG_FILE_PATH").then(|| "contact.log".to_string());
        assert_eq!(FileLogSettings::from_lookup(only_path), None);

        let both = |key: &str| match key {
            "LOG_FILE_PATH" => Some("contact.log".to_string()),
            "LOG_ARCHIVE_PATTERN" => Some("contact.{}.log.gz".to_string()),
            _ => None,
        };
        assert_eq!(
            FileLogSettings::from_lookup(both),
            Some(FileLogSettings {
                file_path: "contact.log".to_string(),
                archive_pattern: "contact.{}.log.gz".to_string(),
            })
        );
    }

    #[test]
    fn test_stderr_only_config_builds() {
        assert!(build_config(None).is_ok());
    }

    #[test]
    fn test_archive_pattern_needs_placeholder() {
        let file = FileLogSettings {
            file_path: "contact.log".to_string(),
            archive_pattern: "contact.log.gz".to_string(),
        };
        assert!(matches!(build_config(Some(&file)), Err(LoggerError::Roller(_))));
    }
}
