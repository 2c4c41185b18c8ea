use crate::calendar::error::CalendarError;
use crate::common::{Month, Symbol};
use crate::instrument::error::InstrumentError;
use chrono::NaiveDate;
use thiserror::Error;

/// # Summary
/// 合约域错误枚举，覆盖换月计算、索引构建与合约查找。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    // 该月份不是品种的有效合约月份
    #[error("{month:?} is not a contract month of {symbol}")]
    MonthNotListed { symbol: Symbol, month: Month },
    // 合约年份超出支持范围
    #[error("Contract year {0} is outside the supported range")]
    YearOutOfRange(i32),
    // 两个合约声明了同一交易日，说明日历构建有缺陷
    #[error("Trade date {date} of {symbol} claimed by both {first} and {second}")]
    DuplicateTradeDate {
        symbol: Symbol,
        date: NaiveDate,
        first: String,
        second: String,
    },
    // 该交易日没有活跃合约
    #[error("No active contract for {symbol} on {date}")]
    NotFound { symbol: Symbol, date: NaiveDate },
    // 合约代码解析失败
    #[error("Invalid contract identifier: {0}")]
    Parse(String),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Instrument(#[from] InstrumentError),
}
