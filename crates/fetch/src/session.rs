use barfetch_core::bar::error::BarSetError;
use barfetch_core::bar::{Bar, BarSet};
use barfetch_core::common::time::utc_to_local;
use barfetch_core::job::Job;
use barfetch_core::session::entity::{AlertInfo, AlertType, BarInfo, BarReplayInfo, ConnectionId};
use barfetch_core::session::port::{AdminCallbacks, EventSink, SessionCallbacks};
use chrono::{DateTime, TimeDelta};
use std::sync::{Arc, Mutex, Weak};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct LoginProgress {
    market_data: bool,
    history: bool,
    // 登录成功事件已经上报
    notified: bool,
}

/// # Summary
/// 会话回调适配器：把引擎的异步回调翻译为编排器事件。
///
/// # Invariants
/// - 行情与历史两个子连接都登录完成后，才上报一次且仅一次登录成功。
/// - 同一时刻至多累积一个 K 线集合，对应当前在途的任务。
/// - 上报事件时不持有任何内部锁，编排器可以在事件处理中再次调用本适配器。
pub struct SessionAdapter {
    // 编排器弱引用，避免与编排器互相持有
    sink: Weak<dyn EventSink>,
    login: Mutex<LoginProgress>,
    current: Mutex<Option<BarSet>>,
}

impl SessionAdapter {
    pub fn new(sink: Weak<dyn EventSink>) -> Arc<Self> {
        Arc::new(Self {
            sink,
            login: Mutex::new(LoginProgress::default()),
            current: Mutex::new(None),
        })
    }

    /// 为即将回放的任务开启新的 K 线集合，丢弃残留的旧集合
    pub fn begin(&self, job: Job) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(stale) = current.replace(BarSet::new(job)) {
            warn!("Discarding unfinished bar set for {}", stale.job());
        }
    }

    /// 丢弃当前集合，之后到达的 K 线与完成通知都会被忽略
    pub fn clear(&self) {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    fn with_sink(&self, f: impl FnOnce(&dyn EventSink)) {
        match self.sink.upgrade() {
            Some(sink) => f(sink.as_ref()),
            None => debug!("Event sink dropped; session event ignored"),
        }
    }

    fn fault(&self, error: BarSetError) {
        self.clear();
        self.with_sink(|sink| sink.bar_set_faulted(error));
    }

    fn login_failed(&self, reason: String) {
        self.with_sink(|sink| sink.login_failed(reason));
    }

    // 调用方保证只传入行情或历史子连接
    fn login_complete(&self, connection_id: ConnectionId) {
        let ready = {
            let mut login = self.login.lock().unwrap_or_else(|e| e.into_inner());
            if connection_id == ConnectionId::MarketData {
                login.market_data = true;
            } else {
                login.history = true;
            }

            let ready = login.market_data && login.history && !login.notified;
            if ready {
                login.notified = true;
            }
            ready
        };

        if ready {
            self.with_sink(|sink| sink.login_succeeded());
        }
    }
}

impl SessionCallbacks for SessionAdapter {
    /// # Summary
    /// 处理会话告警。
    ///
    /// # Logic
    /// 1. 登录失败直接上报。
    /// 2. 行情或历史子连接登录完成时记录，两者齐备后上报登录成功。
    /// 3. 其他子连接的登录完成、连接中断等意外告警一律按登录失败上报。
    /// 4. 连接打开与关闭仅记录日志。
    fn alert(&self, info: AlertInfo) {
        match (info.alert_type, info.connection_id) {
            (AlertType::LoginFailed, _) => {
                warn!(
                    "Login failed (Connection: {}, Code: {}, Message: {})",
                    info.connection_id, info.code, info.message
                );
                self.login_failed(format!("{} (code {})", info.message, info.code));
            }
            (AlertType::LoginComplete, id @ (ConnectionId::MarketData | ConnectionId::History)) => {
                debug!("LoginSuccess: {}", id);
                self.login_complete(id);
            }
            (AlertType::ConnectionOpened | AlertType::ConnectionClosed, id) => {
                debug!("{}: {}", info.alert_type, id);
            }
            (alert_type, id) => {
                warn!(
                    "Unexpected alert (Type: {}, Connection: {}, Code: {}, Message: {})",
                    alert_type, id, info.code, info.message
                );
                self.login_failed(format!("unexpected {} on {}", alert_type, id));
            }
        }
    }

    /// # Summary
    /// 将一根 K 线追加到当前集合。
    ///
    /// # Logic
    /// 1. 没有当前集合（未派发或已中止）时忽略。
    /// 2. 上下文与当前任务不符时上报故障。
    /// 3. 纪元秒 + 毫秒换算为交易时区时间后追加，毫秒满 1000 进位到秒；乱序时上报故障并丢弃集合。
    fn bar(&self, info: BarInfo) {
        let result = {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            let Some(bar_set) = current.as_mut() else {
                debug!("Ignoring bar for context {} with no active job", info.context);
                return;
            };

            if bar_set.job().id() != info.context {
                Err(BarSetError::UnexpectedContext {
                    expected: bar_set.job().id(),
                    received: info.context,
                })
            } else {
                DateTime::from_timestamp(info.close_secs, 0)
                    .and_then(|secs| {
                        secs.checked_add_signed(TimeDelta::milliseconds(i64::from(
                            info.close_millis,
                        )))
                    })
                    .ok_or_else(|| {
                        BarSetError::InvalidTimestamp(format!(
                            "{}.{:03}",
                            info.close_secs, info.close_millis
                        ))
                    })
                    .and_then(|close_on| {
                        bar_set.add(Bar {
                            close_on: utc_to_local(close_on),
                            open: info.open,
                            high: info.high,
                            low: info.low,
                            close: info.close,
                        })
                    })
            }
        };

        if let Err(error) = result {
            self.fault(error);
        }
    }

    /// # Summary
    /// 回放完成：集合为空上报空任务，否则上报保存。
    fn bar_replay(&self, info: BarReplayInfo) {
        let taken = {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            match current.as_ref().map(|bar_set| bar_set.job().id()) {
                None => None,
                Some(expected) if expected != info.context => {
                    Some(Err(BarSetError::UnexpectedContext {
                        expected,
                        received: info.context,
                    }))
                }
                Some(_) => current.take().map(Ok),
            }
        };

        match taken {
            None => debug!("Ignoring replay completion for context {}", info.context),
            Some(Err(error)) => self.fault(error),
            Some(Ok(bar_set)) if bar_set.is_empty() => {
                self.with_sink(|sink| sink.empty_job(bar_set.into_job()));
            }
            Some(Ok(bar_set)) => {
                debug!("Replay of {} finished with {} bars", info.symbol, bar_set.len());
                self.with_sink(|sink| sink.save_bar_set(bar_set));
            }
        }
    }
}

/// # Summary
/// 引擎级告警回调，只记录日志。
#[derive(Debug, Default)]
pub struct AdminAlertLogger;

impl AdminCallbacks for AdminAlertLogger {
    fn alert(&self, info: AlertInfo) {
        let mut text = format!("AlertType: {}, Code: {}", info.alert_type, info.code);
        if !info.message.is_empty() {
            text.push_str(&format!(", Message: {}", info.message));
        }
        if let Some(exchange) = &info.exchange {
            text.push_str(&format!(", Exchange: {}", exchange));
        }
        if let Some(symbol) = &info.symbol {
            text.push_str(&format!(", Symbol: {}", symbol));
        }
        text.push_str(&format!(", ConnectionId: {}", info.connection_id));
        warn!("{}", text);
    }
}
