use barfetch_core::calendar::error::CalendarError;
use barfetch_core::config::SettingsError;
use barfetch_core::contract::error::ContractError;
use barfetch_core::instrument::error::InstrumentError;
use barfetch_core::job::error::JobError;
use barfetch_core::session::error::EngineError;
use barfetch_fetch::FetchError;
use std::path::PathBuf;
use thiserror::Error;

/// # Summary
/// 进程退出码。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    SettingsParseError,
    EngineError,
    InternalError,
}

impl ExitStatus {
    pub const fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::SettingsParseError => -1,
            Self::EngineError => -2,
            Self::InternalError => -3,
        }
    }
}

/// # Summary
/// 应用顶层错误，汇总启动与运行阶段的各类故障。
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to load settings: {0}")]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Failed to prepare log folder {path}: {source}")]
    LogFolder {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Instrument(#[from] InstrumentError),
    #[error(transparent)]
    Contract(#[from] ContractError),
    #[error(transparent)]
    Job(#[from] JobError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl AppError {
    /// # Summary
    /// 将错误归类为退出码。
    ///
    /// # Logic
    /// 1. 配置合并与校验失败归为配置错误。
    /// 2. 远程引擎故障（含登录失败）归为引擎错误。
    /// 3. 其余均为内部错误。
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Self::Config(_) | Self::Settings(_) => ExitStatus::SettingsParseError,
            Self::Engine(_) => ExitStatus::EngineError,
            Self::Fetch(e) if e.is_engine_fault() => ExitStatus::EngineError,
            _ => ExitStatus::InternalError,
        }
    }

    pub fn is_settings_error(&self) -> bool {
        self.exit_status() == ExitStatus::SettingsParseError
    }
}
