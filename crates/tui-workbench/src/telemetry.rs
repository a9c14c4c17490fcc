//! 日志初始化
//!
//! 终端被界面占用，所以日志写入文件（无 ANSI 颜色）。

use once_cell::sync::OnceCell;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{EnvFilter, fmt};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured log filter expression does not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// The log file could not be opened.
    #[error("cannot open log file {path}: {source}")]
    LogFile {
        /// The log file path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
    /// Installing the tracing subscriber failed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// 安装全局 subscriber；重复调用不会重复安装。
pub fn initialise(filter: &str, log_path: &Path) -> Result<(), TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(filter, log_path))
        .map(|_| ())
}

fn install_subscriber(filter: &str, log_path: &Path) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(filter).map_err(|err| TelemetryError::Filter(err.to_string()))?;
    let file = open_log_file(log_path).map_err(|source| TelemetryError::LogFile {
        path: log_path.to_path_buf(),
        source,
    })?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_filter_is_rejected_before_touching_the_file() {
        let path = std::env::temp_dir().join("tui-workbench-never-created").join("x.log");
        let err = install_subscriber("workbench=loud", &path).unwrap_err();
        assert!(matches!(err, TelemetryError::Filter(_)));
        assert!(!path.exists());
    }
}
