use crate::common::Symbol;
use thiserror::Error;

/// # Summary
/// 品种注册表错误，在进程启动加载静态表时暴露配置缺陷。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstrumentError {
    /// 合约月份串中含有非法的月份代码
    #[error("Invalid contract month code '{code}' for {symbol}")]
    InvalidMonthCode { symbol: Symbol, code: char },
    /// 品种没有任何有效合约月份
    #[error("No contract months configured for {0}")]
    NoContractMonths(Symbol),
    /// 同一品种重复注册
    #[error("Duplicate instrument: {0}")]
    Duplicate(Symbol),
    /// 注册表中不存在该品种
    #[error("Unknown instrument: {0}")]
    Unknown(Symbol),
}
