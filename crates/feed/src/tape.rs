use barfetch_core::session::entity::{
    AlertInfo, AlertType, BarInfo, BarReplayInfo, ConnectionId, Credentials, EngineParams,
    ReplayRequest,
};
use barfetch_core::session::error::EngineError;
use barfetch_core::session::port::{AdminCallbacks, ReplayEngine, SessionCallbacks};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// 登录被拒绝时回传的返回码
const LOGIN_REJECTED_CODE: i32 = 13;

/// # Summary
/// 磁带文件中的一行：收盘时刻（纪元秒 + 毫秒）与 OHLC。
#[derive(Debug, Clone, PartialEq)]
pub struct TapeRecord {
    pub close_secs: i64,
    pub close_millis: u32,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl TapeRecord {
    fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split(',').map(str::trim);
        let record = Self {
            close_secs: fields.next()?.parse().ok()?,
            close_millis: fields.next()?.parse::<u32>().ok().filter(|m| *m < 1000)?,
            open: fields.next()?.parse().ok()?,
            high: fields.next()?.parse().ok()?,
            low: fields.next()?.parse().ok()?,
            close: fields.next()?.parse().ok()?,
        };
        fields.next().is_none().then_some(record)
    }

    pub fn close_on(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.close_secs, self.close_millis.saturating_mul(1_000_000))
    }
}

/// # Summary
/// 解析磁带内容。
///
/// # Logic
/// 1. 忽略空行与 `#` 开头的注释行。
/// 2. 无法解析的行记录告警后跳过。
pub fn parse_tape(content: &str, source: &str) -> Vec<TapeRecord> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .filter_map(|(index, line)| {
            let record = TapeRecord::parse(line);
            if record.is_none() {
                warn!("Malformed tape line {} in {}: {}", index + 1, source, line);
            }
            record
        })
        .collect()
}

enum Command {
    Login {
        credentials: Credentials,
        callbacks: Arc<dyn SessionCallbacks>,
    },
    Replay(ReplayRequest),
    Logout,
    Shutdown,
}

/// # Summary
/// 磁带回放引擎：在后台任务中模拟远程引擎的登录与历史回放。
///
/// # Invariants
/// - 请求经无界通道交给后台任务串行处理，调用方从不被回调阻塞。
/// - 所有回调都发生在后台任务上，与调用线程无关。
/// - 磁带文件位于 `<tape_dir>/<合约代码>.csv`，缺失时回放为空。
pub struct TapeEngine {
    tx: mpsc::UnboundedSender<Command>,
    logged_in: AtomicBool,
}

impl TapeEngine {
    /// # Summary
    /// 在当前 tokio 运行时上启动引擎后台任务。
    ///
    /// # Arguments
    /// * `tape_dir`: 磁带文件目录。
    /// * `params`: 引擎参数，请求流水写入其中的日志文件。
    /// * `admin`: 引擎级告警回调。
    ///
    /// # Returns
    /// 不在 tokio 运行时中调用时返回 `EngineError::Runtime`。
    pub fn start(
        tape_dir: impl Into<PathBuf>,
        params: EngineParams,
        admin: Arc<dyn AdminCallbacks>,
    ) -> Result<Self, EngineError> {
        let handle = Handle::try_current().map_err(|e| EngineError::Runtime(e.to_string()))?;
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = Worker {
            tape_dir: tape_dir.into(),
            params,
            admin,
            callbacks: None,
        };
        handle.spawn(worker.run(rx));

        Ok(Self {
            tx,
            logged_in: AtomicBool::new(false),
        })
    }

    fn send(&self, command: Command) -> Result<(), EngineError> {
        self.tx
            .send(command)
            .map_err(|_| EngineError::Runtime("tape engine has shut down".to_string()))
    }
}

impl ReplayEngine for TapeEngine {
    fn login(
        &self,
        credentials: &Credentials,
        callbacks: Arc<dyn SessionCallbacks>,
    ) -> Result<(), EngineError> {
        if self.logged_in.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyLoggedIn);
        }
        self.send(Command::Login {
            credentials: credentials.clone(),
            callbacks,
        })
    }

    fn replay_bars(&self, request: ReplayRequest) -> Result<(), EngineError> {
        if !self.logged_in.load(Ordering::SeqCst) {
            return Err(EngineError::NotLoggedIn);
        }
        self.send(Command::Replay(request))
    }

    fn logout(&self) -> Result<(), EngineError> {
        if !self.logged_in.swap(false, Ordering::SeqCst) {
            return Err(EngineError::NotLoggedIn);
        }
        self.send(Command::Logout)
    }

    fn shutdown(&self) -> Result<(), EngineError> {
        self.logged_in.store(false, Ordering::SeqCst);
        self.send(Command::Shutdown)
    }
}

struct Worker {
    tape_dir: PathBuf,
    params: EngineParams,
    admin: Arc<dyn AdminCallbacks>,
    callbacks: Option<Arc<dyn SessionCallbacks>>,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        self.journal(&format!(
            "{} {} started, tapes in {}",
            self.params.app_name,
            self.params.app_version,
            self.tape_dir.display()
        ))
        .await;

        while let Some(command) = rx.recv().await {
            match command {
                Command::Login {
                    credentials,
                    callbacks,
                } => self.login(&credentials, callbacks).await,
                Command::Replay(request) => self.replay(request).await,
                Command::Logout => self.logout().await,
                Command::Shutdown => break,
            }
        }

        self.journal("shutdown").await;
        self.admin.alert(AlertInfo {
            message: "engine shut down".to_string(),
            ..AlertInfo::new(AlertType::ConnectionClosed, ConnectionId::MarketData)
        });
    }

    /// # Summary
    /// 模拟登录：凭据非空即视为两个子连接均登录成功。
    async fn login(&mut self, credentials: &Credentials, callbacks: Arc<dyn SessionCallbacks>) {
        self.journal(&format!("login {}", credentials.user_name)).await;

        if credentials.user_name.trim().is_empty() || credentials.password.trim().is_empty() {
            callbacks.alert(AlertInfo {
                code: LOGIN_REJECTED_CODE,
                message: "invalid user name or password".to_string(),
                ..AlertInfo::new(AlertType::LoginFailed, ConnectionId::MarketData)
            });
            return;
        }

        for connection_id in [ConnectionId::MarketData, ConnectionId::History] {
            callbacks.alert(AlertInfo::new(AlertType::ConnectionOpened, connection_id));
            callbacks.alert(AlertInfo::new(AlertType::LoginComplete, connection_id));
        }
        self.callbacks = Some(callbacks);
    }

    async fn logout(&mut self) {
        self.journal("logout").await;
        if let Some(callbacks) = self.callbacks.take() {
            for connection_id in [ConnectionId::MarketData, ConnectionId::History] {
                callbacks.alert(AlertInfo::new(AlertType::ConnectionClosed, connection_id));
            }
        }
    }

    /// # Summary
    /// 回放一个合约在 `[start, end]` 内的 K 线。
    ///
    /// # Logic
    /// 1. 读取 `<tape_dir>/<symbol>.csv`，文件缺失视为没有数据。
    /// 2. 其他读取错误按历史连接中断上报给会话与管理回调，不再推送完成通知。
    /// 3. 按文件顺序推送落在区间内的 K 线。
    /// 4. 最后推送一次完成通知。
    async fn replay(&mut self, request: ReplayRequest) {
        self.journal(&format!(
            "replay {} {} {} {} {}{} ctx={}",
            request.symbol,
            request.exchange,
            request.start.to_rfc3339(),
            request.end.to_rfc3339(),
            request.period.code(),
            request.quantity,
            request.context
        ))
        .await;

        let Some(callbacks) = self.callbacks.clone() else {
            warn!("Replay of {} requested without a session", request.symbol);
            return;
        };

        let path = self.tape_dir.join(format!("{}.csv", request.symbol));
        let records = match tokio::fs::read_to_string(&path).await {
            Ok(content) => parse_tape(&content, &path.display().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No tape at {}", path.display());
                Vec::new()
            }
            Err(e) => {
                let alert = AlertInfo {
                    code: -1,
                    message: format!("failed to read {}: {}", path.display(), e),
                    symbol: Some(request.symbol.clone()),
                    exchange: Some(request.exchange.to_string()),
                    ..AlertInfo::new(AlertType::ConnectionBroken, ConnectionId::History)
                };
                self.journal(&format!("broken: {}", alert.message)).await;
                self.admin.alert(alert.clone());
                // 连接中断不发送完成通知，会话侧据此中止
                callbacks.alert(alert);
                return;
            }
        };

        for record in records {
            let in_window = record
                .close_on()
                .is_some_and(|t| t >= request.start && t <= request.end);
            if !in_window {
                continue;
            }
            callbacks.bar(BarInfo {
                context: request.context,
                symbol: request.symbol.clone(),
                close_secs: record.close_secs,
                close_millis: record.close_millis,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
            });
        }

        callbacks.bar_replay(BarReplayInfo {
            context: request.context,
            symbol: request.symbol,
        });
    }

    async fn journal(&self, line: &str) {
        if let Err(e) = append_line(&self.params.log_file_path, line).await {
            debug!("Engine log {} unavailable: {}", self.params.log_file_path.display(), e);
        }
    }
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    let stamped = format!("{} {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"), line);
    file.write_all(stamped.as_bytes()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tape_skips_comments_and_bad_lines() {
        let content = "# secs,millis,o,h,l,c\n\
                       1704204000,0,1,2,0.5,1.5\n\
                       \n\
                       1704204060,1500,1,2,0.5,1.5\n\
                       oops\n\
                       1704204120,250,1.25,2,0.5,1.75\n";
        let records = parse_tape(content, "test");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].close_millis, 250);
        assert_eq!(records[1].open, 1.25);
    }

    #[test]
    fn test_record_close_on() {
        let record = TapeRecord::parse("1704205800,250,1,2,0.5,1.5").unwrap();
        assert_eq!(
            record.close_on().unwrap().to_rfc3339(),
            "2024-01-02T14:30:00.250+00:00"
        );
        assert!(TapeRecord::parse("1704205800,250,1,2,0.5,1.5,9").is_none());
    }

    #[test]
    fn test_start_requires_runtime() {
        #[derive(Default)]
        struct Silent;
        impl AdminCallbacks for Silent {
            fn alert(&self, _info: AlertInfo) {}
        }

        let result = TapeEngine::start(
            "tape",
            EngineParams {
                app_name: "test".to_string(),
                app_version: "0".to_string(),
                log_file_path: PathBuf::from("engine.log"),
            },
            Arc::new(Silent),
        );
        assert!(matches!(result, Err(EngineError::Runtime(_))));
    }
}
