use thiserror::Error;

/// # Summary
/// 远程行情引擎错误枚举。
///
/// # Invariants
/// - 所有远程会话故障统一归入此类，对应引擎错误退出码。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// 尚未登录即发起请求
    #[error("Session is not logged in")]
    NotLoggedIn,
    /// 重复登录
    #[error("Session is already logged in")]
    AlreadyLoggedIn,
    /// 登录失败
    #[error("Login failed: {0}")]
    LoginFailed(String),
    /// 引擎侧读写失败
    #[error("Engine I/O error: {0}")]
    Io(String),
    /// 引擎后台运行时不可用
    #[error("Engine runtime error: {0}")]
    Runtime(String),
    /// 请求被引擎拒绝
    #[error("Request rejected ({code}): {message}")]
    Rejected { code: i32, message: String },
}
