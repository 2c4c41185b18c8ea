use crate::common::{Exchange, Period};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

/// # Summary
/// 一次历史 K 线回放请求的参数。
///
/// # Invariants
/// - `start <= end`，均为 UTC 时刻。
/// - `context` 原样回传到每根 K 线与完成通知上，用于关联抓取任务。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayRequest {
    // 合约代码，如 ESH4
    pub symbol: String,
    // 交易所
    pub exchange: Exchange,
    // 回放起点
    pub start: DateTime<Utc>,
    // 回放终点
    pub end: DateTime<Utc>,
    // K 线周期单位
    pub period: Period,
    // K 线周期数量
    pub quantity: u8,
    // 关联上下文
    pub context: u64,
}

/// 登录凭据
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_name: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_name", &self.user_name)
            .field("password", &"***")
            .finish()
    }
}

/// 会话内的子连接
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionId {
    MarketData,
    History,
    TradingSystem,
    Pnl,
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionId::MarketData => "MarketData",
            ConnectionId::History => "History",
            ConnectionId::TradingSystem => "TradingSystem",
            ConnectionId::Pnl => "Pnl",
        };
        f.write_str(name)
    }
}

/// 引擎推送的告警类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertType {
    LoginComplete,
    LoginFailed,
    ConnectionOpened,
    ConnectionClosed,
    ConnectionBroken,
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertType::LoginComplete => "LoginComplete",
            AlertType::LoginFailed => "LoginFailed",
            AlertType::ConnectionOpened => "ConnectionOpened",
            AlertType::ConnectionClosed => "ConnectionClosed",
            AlertType::ConnectionBroken => "ConnectionBroken",
        };
        f.write_str(name)
    }
}

/// # Summary
/// 引擎告警，会话级与引擎级共用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertInfo {
    pub alert_type: AlertType,
    pub connection_id: ConnectionId,
    // 引擎返回码，0 表示成功
    pub code: i32,
    pub message: String,
    pub exchange: Option<String>,
    pub symbol: Option<String>,
}

impl AlertInfo {
    pub fn new(alert_type: AlertType, connection_id: ConnectionId) -> Self {
        Self {
            alert_type,
            connection_id,
            code: 0,
            message: String::new(),
            exchange: None,
            symbol: None,
        }
    }
}

/// # Summary
/// 回放中推送的单根 K 线，收盘时间为 UTC 纪元秒 + 毫秒。
#[derive(Debug, Clone, PartialEq)]
pub struct BarInfo {
    pub context: u64,
    pub symbol: String,
    pub close_secs: i64,
    pub close_millis: u32,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// 回放完成通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarReplayInfo {
    pub context: u64,
    pub symbol: String,
}

/// 引擎启动参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineParams {
    pub app_name: String,
    pub app_version: String,
    pub log_file_path: PathBuf,
}
