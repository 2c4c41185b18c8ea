//! 期货历史 K 线抓取的领域核心：交易日历、合约换月、抓取任务与各类端口定义。

pub mod bar;
pub mod calendar;
pub mod common;
pub mod config;
pub mod contract;
pub mod instrument;
pub mod job;
pub mod session;
pub mod store;

#[cfg(feature = "test-utils")]
pub mod testing;
