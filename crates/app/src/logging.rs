use crate::error::AppError;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// 未设置 `RUST_LOG` 时的默认过滤规则
const DEFAULT_FILTER: &str =
    "info,barfetch=debug,barfetch_core=debug,barfetch_fetch=debug,barfetch_store=debug,barfetch_feed=debug";

const RUN_STAMP: &str = "%Y%m%d_%H%M%S";

/// 本次运行的日志文件名 `barfetch_<yyyyMMdd_HHmmss>.log`
pub fn run_log_name(started: &DateTime<Local>) -> String {
    format!("barfetch_{}.log", started.format(RUN_STAMP))
}

/// 本次运行的引擎流水文件路径
pub fn engine_log_path(log_dir: &Path, started: &DateTime<Local>) -> PathBuf {
    log_dir.join(format!("engine_{}.log", started.format(RUN_STAMP)))
}

/// # Summary
/// 初始化全局日志：控制台一份，日志目录下的本次运行文件一份。
///
/// # Logic
/// 1. 创建日志目录。
/// 2. 文件输出经 `tracing-appender` 非阻塞写入，关闭 ANSI 颜色。
/// 3. 过滤规则优先取 `RUST_LOG`。
///
/// # Returns
/// 非阻塞写入器的守卫，必须持有到进程退出，否则尾部日志丢失。
pub fn init(log_dir: &Path, started: &DateTime<Local>) -> Result<WorkerGuard, AppError> {
    std::fs::create_dir_all(log_dir).map_err(|source| AppError::LogFolder {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let appender = tracing_appender::rolling::never(log_dir, run_log_name(started));
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_run_file_names() {
        let started = Local.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(run_log_name(&started), "barfetch_20240305_070809.log");
        assert_eq!(
            engine_log_path(Path::new("logs"), &started),
            Path::new("logs").join("engine_20240305_070809.log")
        );
    }
}
