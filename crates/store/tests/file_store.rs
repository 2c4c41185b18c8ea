use anyhow::Result;
use barfetch_core::bar::{Bar, BarSet};
use barfetch_core::common::time::TRADING_TZ;
use barfetch_core::common::{BarKind, Symbol};
use barfetch_core::instrument::entity::InstrumentRegistry;
use barfetch_core::job::{Job, ParsedOutputPath};
use barfetch_core::store::error::StoreError;
use barfetch_core::store::port::BarSetStore;
use barfetch_store::FileBarStore;
use chrono::{NaiveDate, TimeZone};
use std::fs;
use tempfile::tempdir;

fn job(kinds: &[BarKind]) -> Result<Job> {
    let registry = InstrumentRegistry::standard()?;
    Ok(Job::new(
        1,
        registry.get(Symbol::ES)?,
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        "M1".parse().unwrap(),
        kinds,
    )?)
}

fn bar_set(job: Job) -> Result<BarSet> {
    let mut set = BarSet::new(job);
    for (minute, close) in [(30, 4750.75), (31, 4751.0)] {
        set.add(Bar {
            close_on: TRADING_TZ.with_ymd_and_hms(2024, 1, 2, 9, minute, 0).unwrap(),
            open: 4750.25,
            high: 4751.25,
            low: 4750.0,
            close,
        })?;
    }
    Ok(set)
}

#[test]
fn test_save_flat_layout_writes_each_kind() -> Result<()> {
    let dir = tempdir()?;
    let store = FileBarStore::new(dir.path().join("bars"), false);
    let set = bar_set(job(&[BarKind::Csv, BarKind::Ninja])?)?;

    assert!(!store.is_complete(set.job()));
    let paths = store.save(&set)?;
    assert_eq!(paths.len(), 2);

    let csv = fs::read_to_string(&paths[0])?;
    assert_eq!(
        csv,
        "01/02/2024 09:30:00.000,4750.25,4751.25,4750,4750.75\n\
         01/02/2024 09:31:00.000,4750.25,4751.25,4750,4751\n"
    );
    let ninja = fs::read_to_string(&paths[1])?;
    assert!(ninja.starts_with("20240102 093000 0000000;4750.25;4751.25;4750;4750.75;0\n"));

    assert!(store.is_complete(set.job()));
    Ok(())
}

#[test]
fn test_save_in_folders_creates_nested_path() -> Result<()> {
    let dir = tempdir()?;
    let store = FileBarStore::new(dir.path(), true);
    let set = bar_set(job(&[BarKind::Ninja])?)?;

    let paths = store.save(&set)?;
    let expected = dir
        .path()
        .join("NINJA/M1/ES/2024/RAPI_ES_M1_20240102_NINJA_EST.csv");
    assert_eq!(paths, vec![expected.clone()]);
    assert!(expected.is_file());

    let parsed = ParsedOutputPath::parse(&expected)?;
    assert_eq!(parsed.kind, BarKind::Ninja);
    assert_eq!(parsed.symbol, Symbol::ES);
    assert_eq!(parsed.year, 2024);
    Ok(())
}

#[test]
fn test_partial_or_empty_outputs_are_not_complete() -> Result<()> {
    let dir = tempdir()?;
    let store = FileBarStore::new(dir.path(), false);
    let job = job(&[BarKind::Csv, BarKind::Ninja])?;

    // 只有一种格式存在
    fs::write(job.full_path(dir.path(), false, BarKind::Csv), "x\n")?;
    assert!(!store.is_complete(&job));

    // 空文件视为缺失
    fs::write(job.full_path(dir.path(), false, BarKind::Ninja), "")?;
    assert!(!store.is_complete(&job));

    fs::write(job.full_path(dir.path(), false, BarKind::Ninja), "x\n")?;
    assert!(store.is_complete(&job));
    Ok(())
}

#[test]
fn test_empty_bar_set_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    let store = FileBarStore::new(dir.path(), false);
    let set = BarSet::new(job(&[BarKind::Csv])?);

    assert!(matches!(store.save(&set), Err(StoreError::Empty(_))));
    assert_eq!(fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}
