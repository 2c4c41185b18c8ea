use anyhow::Result;
use barfetch_core::calendar::TradingCalendar;
use barfetch_core::common::{BarKind, BarSize, Exchange, Period, Symbol};
use barfetch_core::contract::ContractIndex;
use barfetch_core::instrument::entity::InstrumentRegistry;
use barfetch_core::session::entity::{
    AlertInfo, AlertType, BarInfo, BarReplayInfo, ConnectionId, Credentials, EngineParams,
    ReplayRequest,
};
use barfetch_core::session::error::EngineError;
use barfetch_core::session::port::{ReplayEngine, SessionCallbacks};
use barfetch_core::store::port::BarSetStore;
use barfetch_feed::TapeEngine;
use barfetch_fetch::{AdminAlertLogger, FetchDeps, FetchError, Fetcher, plan_jobs};
use barfetch_store::FileBarStore;
use chrono::{NaiveDate, TimeZone, Utc};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::mpsc;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn params(dir: &Path) -> EngineParams {
    EngineParams {
        app_name: "barfetch".to_string(),
        app_version: "test".to_string(),
        log_file_path: dir.join("engine.log"),
    }
}

fn credentials(password: &str) -> Credentials {
    Credentials {
        user_name: "trader".to_string(),
        password: password.to_string(),
    }
}

// 2024-01-01 22:59Z 在交易时段之前；其余两根在 2024-01-02 的时段内
const ESH4_TAPE: &str = "# close secs,millis,open,high,low,close\n\
                         1704149940,0,4740,4741,4739,4740.5\n\
                         1704204000,0,4750.25,4751,4749.5,4750.75\n\
                         1704204060,500,4750.75,4752,4750.5,4751.25\n";

#[derive(Debug)]
enum Event {
    Alert(AlertType, ConnectionId),
    Bar(BarInfo),
    Done(BarReplayInfo),
}

struct Channel(mpsc::UnboundedSender<Event>);

impl SessionCallbacks for Channel {
    fn alert(&self, info: AlertInfo) {
        self.0.send(Event::Alert(info.alert_type, info.connection_id)).ok();
    }
    fn bar(&self, info: BarInfo) {
        self.0.send(Event::Bar(info)).ok();
    }
    fn bar_replay(&self, info: BarReplayInfo) {
        self.0.send(Event::Done(info)).ok();
    }
}

async fn next(rx: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_tape_engine_replays_window_then_completes() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("ESH4.csv"), ESH4_TAPE)?;
    let engine = TapeEngine::start(dir.path(), params(dir.path()), Arc::new(AdminAlertLogger))?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    assert_eq!(
        engine.replay_bars(ReplayRequest {
            symbol: "ESH4".to_string(),
            exchange: Exchange::CME,
            start: Utc::now(),
            end: Utc::now(),
            period: Period::Minutes,
            quantity: 1,
            context: 1,
        }),
        Err(EngineError::NotLoggedIn)
    );

    engine.login(&credentials("secret"), Arc::new(Channel(tx)))?;
    let mut completed = Vec::new();
    for _ in 0..4 {
        if let Event::Alert(AlertType::LoginComplete, id) = next(&mut rx).await {
            completed.push(id);
        }
    }
    assert_eq!(completed, vec![ConnectionId::MarketData, ConnectionId::History]);

    engine.replay_bars(ReplayRequest {
        symbol: "ESH4".to_string(),
        exchange: Exchange::CME,
        start: Utc.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2024, 1, 2, 21, 59, 59).unwrap(),
        period: Period::Minutes,
        quantity: 1,
        context: 9,
    })?;

    let Event::Bar(first) = next(&mut rx).await else {
        panic!("expected a bar");
    };
    assert_eq!((first.context, first.close_secs), (9, 1_704_204_000));
    let Event::Bar(second) = next(&mut rx).await else {
        panic!("expected a bar");
    };
    assert_eq!(second.close_millis, 500);
    let Event::Done(done) = next(&mut rx).await else {
        panic!("expected completion");
    };
    assert_eq!(done.context, 9);

    engine.logout()?;
    engine.shutdown()?;
    Ok(())
}

#[tokio::test]
async fn test_blank_password_fails_login() -> Result<()> {
    let dir = tempdir()?;
    let engine = TapeEngine::start(dir.path(), params(dir.path()), Arc::new(AdminAlertLogger))?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    engine.login(&credentials(" "), Arc::new(Channel(tx)))?;
    assert!(matches!(
        next(&mut rx).await,
        Event::Alert(AlertType::LoginFailed, ConnectionId::MarketData)
    ));
    assert_eq!(
        engine.login(&credentials("secret"), Arc::new(Channel(mpsc::unbounded_channel().0))),
        Err(EngineError::AlreadyLoggedIn)
    );
    Ok(())
}

#[tokio::test]
async fn test_fetch_end_to_end_with_tape() -> Result<()> {
    let tapes = tempdir()?;
    let output = tempdir()?;
    fs::write(tapes.path().join("ESH4.csv"), ESH4_TAPE)?;

    let registry = InstrumentRegistry::standard()?;
    let calendar = TradingCalendar::compute(ymd(2019, 12, 16), ymd(2024, 6, 1))?;
    let contracts = ContractIndex::build(&registry, &calendar)?;
    let jobs = plan_jobs(
        &[registry.get(Symbol::ES)?],
        &[ymd(2024, 1, 2), ymd(2024, 1, 3)],
        &[BarSize::default()],
        &[BarKind::Csv, BarKind::Ninja],
    )?;

    let store = Arc::new(FileBarStore::new(output.path(), true));
    let engine = TapeEngine::start(tapes.path(), params(tapes.path()), Arc::new(AdminAlertLogger))?;
    let fetcher = Fetcher::new(
        FetchDeps {
            engine: Arc::new(engine),
            store: store.clone(),
            contracts: Arc::new(contracts),
            calendar: Arc::new(calendar),
        },
        credentials("secret"),
        jobs.clone(),
    );

    let summary = tokio::time::timeout(Duration::from_secs(10), fetcher.run()).await??;
    assert_eq!((summary.enqueued, summary.saved, summary.empty), (2, 1, 1));

    let csv = output
        .path()
        .join("CSV/M1/ES/2024/RAPI_ES_M1_20240102_CSV_EST.csv");
    assert_eq!(
        fs::read_to_string(csv)?,
        "01/02/2024 09:00:00.000,4750.25,4751,4749.5,4750.75\n\
         01/02/2024 09:01:00.500,4750.75,4752,4750.5,4751.25\n"
    );
    let ninja = output
        .path()
        .join("NINJA/M1/ES/2024/RAPI_ES_M1_20240102_NINJA_EST.csv");
    assert!(fs::read_to_string(ninja)?.contains("20240102 090100 5000000;"));

    // 空回放不产生文件
    assert!(store.is_complete(&jobs[0]));
    assert!(!store.is_complete(&jobs[1]));
    assert!(!output.path().join("CSV/M1/ES/2024/RAPI_ES_M1_20240103_CSV_EST.csv").exists());

    let journal = fs::read_to_string(tapes.path().join("engine.log"))?;
    assert!(journal.contains("replay ESH4 CME"));
    Ok(())
}

#[tokio::test]
async fn test_fetch_with_bad_password_is_engine_fault() -> Result<()> {
    let tapes = tempdir()?;
    let registry = InstrumentRegistry::standard()?;
    let calendar = TradingCalendar::compute(ymd(2019, 12, 16), ymd(2024, 6, 1))?;
    let contracts = ContractIndex::build(&registry, &calendar)?;
    let jobs = plan_jobs(
        &[registry.get(Symbol::ES)?],
        &[ymd(2024, 1, 2)],
        &[BarSize::default()],
        &[BarKind::Csv],
    )?;

    let engine = TapeEngine::start(tapes.path(), params(tapes.path()), Arc::new(AdminAlertLogger))?;
    let fetcher = Fetcher::new(
        FetchDeps {
            engine: Arc::new(engine),
            store: Arc::new(FileBarStore::new(tapes.path(), false)),
            contracts: Arc::new(contracts),
            calendar: Arc::new(calendar),
        },
        credentials(""),
        jobs,
    );

    let error = tokio::time::timeout(Duration::from_secs(10), fetcher.run())
        .await?
        .unwrap_err();
    assert!(matches!(error, FetchError::LoginFailed(_)));
    Ok(())
}

#[tokio::test]
async fn test_unreadable_tape_is_engine_fault() -> Result<()> {
    let tapes = tempdir()?;
    let output = tempdir()?;
    // 目录无法按文件读取，但不属于文件缺失
    fs::create_dir_all(tapes.path().join("ESH4.csv"))?;

    let registry = InstrumentRegistry::standard()?;
    let calendar = TradingCalendar::compute(ymd(2019, 12, 16), ymd(2024, 6, 1))?;
    let contracts = ContractIndex::build(&registry, &calendar)?;
    let jobs = plan_jobs(
        &[registry.get(Symbol::ES)?],
        &[ymd(2024, 1, 2), ymd(2024, 1, 3)],
        &[BarSize::default()],
        &[BarKind::Csv],
    )?;

    let engine = TapeEngine::start(tapes.path(), params(tapes.path()), Arc::new(AdminAlertLogger))?;
    let fetcher = Fetcher::new(
        FetchDeps {
            engine: Arc::new(engine),
            store: Arc::new(FileBarStore::new(output.path(), false)),
            contracts: Arc::new(contracts),
            calendar: Arc::new(calendar),
        },
        credentials("secret"),
        jobs,
    );

    let error = tokio::time::timeout(Duration::from_secs(10), fetcher.run())
        .await?
        .unwrap_err();
    assert!(matches!(error, FetchError::LoginFailed(_)));
    assert!(error.is_engine_fault());
    assert_eq!(fetcher.summary().empty, 0);
    assert_eq!(fs::read_dir(output.path())?.count(), 0);

    let journal = fs::read_to_string(tapes.path().join("engine.log"))?;
    assert!(journal.contains("broken: failed to read"));
    Ok(())
}
