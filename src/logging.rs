//! 日志写入文件。TUI 占用终端，日志不能写到 stdout/stderr。

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// 日志级别环境变量，例如 `ENV_SWITCHER_LOG=debug`
pub const LOG_FILTER_VAR: &str = "ENV_SWITCHER_LOG";
pub const LOG_FILE_NAME: &str = "env-switcher.log";

/// 在选择存储文件旁边写 `env-switcher.log`
pub fn init(store_path: &Path) -> Result<PathBuf> {
    let log_dir = log_directory(store_path);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::NEVER, &log_dir, LOG_FILE_NAME);

    let env_filter = EnvFilter::try_from_env(LOG_FILTER_VAR)
        .unwrap_or_else(|_| EnvFilter::new("env_switcher=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    tracing::info!("env-switcher starting, log directory: {}", log_dir.display());
    Ok(log_dir.join(LOG_FILE_NAME))
}

/// 存储文件所在目录；没有父目录时用当前目录
fn log_directory(store_path: &Path) -> PathBuf {
    match store_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
