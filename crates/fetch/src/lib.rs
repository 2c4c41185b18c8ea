//! 抓取编排：单会话、串行回放的任务状态机与会话回调适配器。

pub mod error;
pub mod fetcher;
pub mod session;

pub use error::FetchError;
pub use fetcher::{FetchDeps, FetchState, FetchSummary, Fetcher, ShutdownGate, plan_jobs};
pub use session::{AdminAlertLogger, SessionAdapter};
