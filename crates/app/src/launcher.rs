use crate::cli::Cli;
use crate::error::{AppError, ExitStatus};
use crate::logging;
use crate::settings::{self, USAGE};
use barfetch_core::calendar::TradingCalendar;
use barfetch_core::common::time::RealTimeProvider;
use barfetch_core::config::Settings;
use barfetch_core::contract::ContractIndex;
use barfetch_core::instrument::entity::InstrumentRegistry;
use barfetch_core::session::entity::EngineParams;
use barfetch_feed::TapeEngine;
use barfetch_fetch::{AdminAlertLogger, FetchDeps, FetchSummary, Fetcher, plan_jobs};
use barfetch_store::FileBarStore;
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

/// 校验通过、可以开始抓取的运行环境
pub struct Prepared {
    pub settings: Settings,
    pub registry: InstrumentRegistry,
    pub calendar: TradingCalendar,
}

/// # Summary
/// 合并并校验配置，在打开任何会话之前完成。
///
/// # Logic
/// 1. 构建品种注册表与截至今天的交易日历。
/// 2. 合并各配置来源并校验为 `Settings`。
pub fn prepare(cli: &Cli) -> Result<Prepared, AppError> {
    let registry = InstrumentRegistry::standard()?;
    let calendar = TradingCalendar::through_today(&RealTimeProvider)?;
    let raw = settings::load_raw(cli, None)?;
    let settings = Settings::from_raw(raw, &registry, &calendar)?;
    Ok(Prepared {
        settings,
        registry,
        calendar,
    })
}

/// # Summary
/// 装配各组件并执行一次完整抓取。
///
/// # Logic
/// 1. 构建合约索引并生成任务列表。
/// 2. 启动磁带回放引擎，引擎流水写入 `engine_log`。
/// 3. 由 `Fetcher` 驱动登录、串行回放与关闭。
pub async fn execute(prepared: Prepared, engine_log: PathBuf) -> Result<FetchSummary, AppError> {
    let Prepared {
        settings,
        registry,
        calendar,
    } = prepared;

    let contracts = ContractIndex::build(&registry, &calendar)?;
    let jobs = plan_jobs(
        &settings.assets,
        &settings.dates,
        &settings.sizes,
        &settings.kinds,
    )?;

    debug!("Engine log: {}", engine_log.display());
    let engine = TapeEngine::start(
        settings.tape_dir.clone(),
        EngineParams {
            app_name: env!("CARGO_PKG_NAME").to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            log_file_path: engine_log,
        },
        Arc::new(AdminAlertLogger),
    )?;

    let fetcher = Fetcher::new(
        FetchDeps {
            engine: Arc::new(engine),
            store: Arc::new(FileBarStore::new(
                settings.save_to_path.clone(),
                settings.in_folders,
            )),
            contracts: Arc::new(contracts),
            calendar: Arc::new(calendar),
        },
        settings.credentials.clone(),
        jobs,
    );

    Ok(fetcher.run().await?)
}

/// # Summary
/// 进程主流程，返回退出状态。
///
/// # Logic
/// 1. 配置错误直接输出到标准错误并附带用法说明。
/// 2. 初始化日志后执行抓取，故障记录后转换为退出状态。
pub async fn run(cli: Cli) -> ExitStatus {
    let started: DateTime<Local> = Local::now();

    let prepared = match prepare(&cli) {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("{e}");
            if e.is_settings_error() {
                eprintln!("\n{USAGE}");
            }
            return e.exit_status();
        }
    };

    let log_dir = prepared.settings.log_file_path.clone();
    let _guard = match logging::init(&log_dir, &started) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e}");
            return e.exit_status();
        }
    };

    info!(
        "{} {} starting: {} assets, {} dates, {} sizes",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        prepared.settings.assets.len(),
        prepared.settings.dates.len(),
        prepared.settings.sizes.len()
    );

    match execute(prepared, logging::engine_log_path(&log_dir, &started)).await {
        Ok(_) => ExitStatus::Success,
        Err(e) => {
            error!("Run failed: {}", e);
            e.exit_status()
        }
    }
}
