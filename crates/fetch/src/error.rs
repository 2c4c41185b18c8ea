use barfetch_core::bar::error::BarSetError;
use barfetch_core::job::error::JobError;
use barfetch_core::session::error::EngineError;
use barfetch_core::store::error::StoreError;
use thiserror::Error;

/// # Summary
/// 一次抓取运行的终止原因。
///
/// # Invariants
/// - 任何一个变体都会终止整次运行，不存在单任务级别的重试。
#[derive(Error, Debug)]
pub enum FetchError {
    /// 远程引擎调用失败
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    /// 登录被拒绝或收到意外的子连接告警
    #[error("Login failed: {0}")]
    LoginFailed(String),
    /// 任务无法推导回放参数
    #[error("Job error: {0}")]
    Job(#[from] JobError),
    /// K 线集合违反时间单调性
    #[error("Bar set error: {0}")]
    BarSet(#[from] BarSetError),
    /// 持久化失败
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl FetchError {
    /// 是否属于远程引擎故障（其余均为内部错误）
    pub fn is_engine_fault(&self) -> bool {
        matches!(self, FetchError::Engine(_) | FetchError::LoginFailed(_))
    }
}
