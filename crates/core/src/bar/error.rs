use thiserror::Error;

/// # Summary
/// K 线集合错误枚举。
///
/// # Invariants
/// - 乱序到达属于硬性错误，不做静默纠正。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BarSetError {
    /// 新 K 线的收盘时间早于集合中最后一根
    #[error("Out-of-order bar for {job}: {received} is before {last}")]
    OutOfOrder {
        job: String,
        last: String,
        received: String,
    },
    /// 回放推送的关联上下文与当前任务不符
    #[error("Unexpected replay context {received} (expected {expected})")]
    UnexpectedContext { expected: u64, received: u64 },
    /// 引擎推送的时间戳无法换算
    #[error("Invalid bar timestamp: {0}")]
    InvalidTimestamp(String),
}
