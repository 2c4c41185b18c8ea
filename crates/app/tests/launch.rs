use anyhow::Result;
use barfetch_app::cli::Cli;
use barfetch_app::error::ExitStatus;
use barfetch_app::launcher::{self, Prepared};
use barfetch_core::calendar::TradingCalendar;
use barfetch_core::config::{RawSettings, Settings};
use barfetch_core::instrument::entity::InstrumentRegistry;
use chrono::NaiveDate;
use clap::Parser;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn prepared(root: &Path, raw: RawSettings) -> Result<Prepared> {
    let registry = InstrumentRegistry::standard()?;
    let calendar = TradingCalendar::compute(
        NaiveDate::from_ymd_opt(2019, 12, 16).unwrap(),
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
    )?;
    let settings = Settings::from_raw(
        RawSettings {
            save_to_path: root.join("bars").display().to_string(),
            log_file_path: root.join("logs").display().to_string(),
            tape_dir: root.join("tape").display().to_string(),
            user_name: Some("trader".to_string()),
            password: Some("secret".to_string()),
            ..raw
        },
        &registry,
        &calendar,
    )?;
    Ok(Prepared {
        settings,
        registry,
        calendar,
    })
}

#[tokio::test]
async fn test_execute_writes_bars_from_tape() -> Result<()> {
    let dir = tempdir()?;
    fs::create_dir_all(dir.path().join("tape"))?;
    fs::write(
        dir.path().join("tape/NQH4.csv"),
        "1704204000,0,16800,16802.5,16799.75,16801\n",
    )?;

    let prepared = prepared(
        dir.path(),
        RawSettings {
            assets: Some("nq".to_string()),
            dates: Some("01/02/2024".to_string()),
            kinds: Some("csv,ninja".to_string()),
            ..RawSettings::default()
        },
    )?;
    let summary = launcher::execute(prepared, dir.path().join("engine.log")).await?;
    assert_eq!((summary.enqueued, summary.saved), (1, 1));

    let csv = fs::read_to_string(dir.path().join("bars/RAPI_NQ_M1_20240102_CSV_EST.csv"))?;
    assert_eq!(csv, "01/02/2024 09:00:00.000,16800,16802.5,16799.75,16801\n");
    assert!(dir.path().join("bars/RAPI_NQ_M1_20240102_NINJA_EST.csv").is_file());

    // 已存在的输出在下一次运行中被跳过
    let again = prepared_again(dir.path())?;
    let summary = launcher::execute(again, dir.path().join("engine.log")).await?;
    assert_eq!((summary.enqueued, summary.skipped), (0, 1));
    Ok(())
}

fn prepared_again(root: &Path) -> Result<Prepared> {
    prepared(
        root,
        RawSettings {
            assets: Some("NQ".to_string()),
            dates: Some("2024-01-02".to_string()),
            kinds: Some("CSV,NINJA".to_string()),
            ..RawSettings::default()
        },
    )
}

#[tokio::test]
async fn test_missing_credentials_exit_with_settings_error() -> Result<()> {
    let dir = tempdir()?;
    let config = dir.path().join("barfetch.toml");
    fs::write(&config, "assets = \"ES\"\nuser_name = \"trader\"\n")?;

    let cli = Cli::try_parse_from([
        "barfetch",
        "--config",
        config.to_str().unwrap(),
        "--password",
        " ",
    ])?;
    let status = launcher::run(cli).await;
    assert_eq!(status, ExitStatus::SettingsParseError);
    assert_eq!(status.code(), -1);
    Ok(())
}

#[tokio::test]
async fn test_unknown_symbol_exit_with_settings_error() -> Result<()> {
    let dir = tempdir()?;
    let cli = Cli::try_parse_from([
        "barfetch",
        "--config",
        dir.path().join("none.toml").to_str().unwrap(),
        "-a",
        "XX",
        "--user-name",
        "trader",
        "--password",
        "secret",
    ])?;
    assert_eq!(launcher::run(cli).await.code(), -1);
    Ok(())
}
