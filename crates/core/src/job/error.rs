use crate::calendar::error::CalendarError;
use crate::contract::error::ContractError;
use chrono::NaiveDate;
use thiserror::Error;

/// # Summary
/// 抓取任务错误枚举，覆盖任务构造、查询参数推导与输出路径解析。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// 任务日期不是有效交易日
    #[error("{0} is not a valid trade date")]
    NotATradeDate(NaiveDate),
    /// 任务未请求任何输出格式
    #[error("At least one bar kind is required")]
    NoKinds,
    /// 活跃合约查找失败
    #[error(transparent)]
    Contract(#[from] ContractError),
    /// 交易时段换算失败
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    /// 输出路径无法反解析
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),
}
