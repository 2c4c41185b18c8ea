//! 美国期货市场节假日与有效交易日集合。

pub mod error;
pub mod holiday;
pub mod trading;

pub use trading::TradingCalendar;
