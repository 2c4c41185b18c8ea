use crate::calendar::TradingCalendar;
use crate::common::{BarKind, BarSize, Symbol};
use crate::instrument::entity::{Instrument, InstrumentRegistry};
use crate::session::entity::Credentials;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// 单次运行允许的最多 K 线尺寸数
pub const MAX_BAR_SIZES: usize = 10;

const ALL: &str = "ALL";
const RANGE_SEPARATOR: &str = "..";
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];
const INVALID_PATH_CHARS: [char; 6] = ['<', '>', '"', '|', '?', '*'];

/// # Summary
/// 配置校验错误枚举，在打开任何远程会话之前返回。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("Unknown symbol registered: {0}")]
    UnregisteredSymbol(Symbol),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Invalid date range: {from} is after {until}")]
    InvalidDateRange { from: NaiveDate, until: NaiveDate },
    #[error("No selectable trading dates")]
    NoDates,
    #[error("Invalid bar size: {0}")]
    InvalidBarSize(String),
    #[error("Between 1 and {max} bar sizes are allowed, got {count}")]
    BarSizeCount { count: usize, max: usize },
    #[error("Invalid bar kind: {0}")]
    InvalidKind(String),
    #[error("Invalid {name} path: {value}")]
    InvalidPath { name: &'static str, value: String },
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

/// # Summary
/// 合并默认值、配置文件、环境变量与命令行后的原始配置。
///
/// # Invariants
/// - 所有字段均未经校验，必须经 [`Settings::from_raw`] 转换后使用。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSettings {
    // ALL 或逗号分隔的品种列表
    pub assets: Option<String>,
    // ALL、FROM..UNTIL 或逗号分隔的日期列表
    pub dates: Option<String>,
    // 逗号分隔的 K 线尺寸，如 M1,S30
    pub sizes: Option<String>,
    // 逗号分隔的输出格式
    pub kinds: Option<String>,
    pub save_to_path: String,
    pub log_file_path: String,
    pub in_folders: bool,
    pub user_name: Option<String>,
    pub password: Option<String>,
    pub tape_dir: String,
}

impl Default for RawSettings {
    fn default() -> Self {
        Self {
            assets: None,
            dates: None,
            sizes: None,
            kinds: None,
            save_to_path: "bars".to_string(),
            log_file_path: "logs".to_string(),
            in_folders: false,
            user_name: None,
            password: None,
            tape_dir: "tape".to_string(),
        }
    }
}

/// # Summary
/// 校验后的运行配置，构建后不可变。
#[derive(Debug, Clone)]
pub struct Settings {
    pub assets: Vec<Arc<Instrument>>,
    pub dates: Vec<NaiveDate>,
    pub sizes: Vec<BarSize>,
    pub kinds: Vec<BarKind>,
    pub save_to_path: PathBuf,
    pub log_file_path: PathBuf,
    pub in_folders: bool,
    pub credentials: Credentials,
    pub tape_dir: PathBuf,
}

impl Settings {
    /// # Summary
    /// 校验原始配置并解析为运行配置。
    ///
    /// # Logic
    /// 1. 解析品种、日期、尺寸与格式列表。
    /// 2. 校验各路径不含非法字符。
    /// 3. 校验登录凭据非空。
    ///
    /// # Arguments
    /// * `raw`: 合并后的原始配置。
    /// * `registry`: 品种注册表。
    /// * `calendar`: 交易日历，用于确定可选日期窗口。
    pub fn from_raw(
        raw: RawSettings,
        registry: &InstrumentRegistry,
        calendar: &TradingCalendar,
    ) -> Result<Self, SettingsError> {
        Ok(Self {
            assets: parse_assets(raw.assets.as_deref(), registry)?,
            dates: parse_dates(raw.dates.as_deref(), calendar)?,
            sizes: parse_sizes(raw.sizes.as_deref())?,
            kinds: parse_kinds(raw.kinds.as_deref())?,
            save_to_path: validate_path("save-to", &raw.save_to_path)?,
            log_file_path: validate_path("log-to", &raw.log_file_path)?,
            in_folders: raw.in_folders,
            credentials: Credentials {
                user_name: required("user-name", raw.user_name)?,
                password: required("password", raw.password)?,
            },
            tape_dir: validate_path("tape-dir", &raw.tape_dir)?,
        })
    }
}

fn is_all(value: Option<&str>) -> bool {
    value
        .map(str::trim)
        .is_none_or(|v| v.is_empty() || v.eq_ignore_ascii_case(ALL))
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// 解析 `yyyy-MM-dd` 或 `MM/dd/yyyy` 格式的日期
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value.trim(), format).ok())
}

fn parse_assets(
    value: Option<&str>,
    registry: &InstrumentRegistry,
) -> Result<Vec<Arc<Instrument>>, SettingsError> {
    if is_all(value) {
        return Ok(registry.iter().cloned().collect());
    }

    let mut assets: Vec<Arc<Instrument>> = Vec::new();
    for item in split_list(value.unwrap_or_default()) {
        let symbol: Symbol = item
            .parse()
            .map_err(|_| SettingsError::UnknownSymbol(item.to_string()))?;
        let instrument = registry
            .get(symbol)
            .map_err(|_| SettingsError::UnregisteredSymbol(symbol))?;
        if !assets.iter().any(|a| a.symbol == symbol) {
            assets.push(instrument);
        }
    }
    Ok(assets)
}

/// # Summary
/// 解析交易日选择。
///
/// # Logic
/// 1. `ALL` 或缺省选择全部可选交易日。
/// 2. `FROM..UNTIL`：缺省或无法解析的边界取窗口端点，边界截断到窗口内，FROM 晚于 UNTIL 报错。
/// 3. 逗号列表：逐项解析，丢弃窗口外与非交易日，去重升序。
fn parse_dates(
    value: Option<&str>,
    calendar: &TradingCalendar,
) -> Result<Vec<NaiveDate>, SettingsError> {
    let (Some(min), Some(max)) = (calendar.min_bar_date(), calendar.max_bar_date()) else {
        return Err(SettingsError::NoDates);
    };

    let dates: Vec<NaiveDate> = if is_all(value) {
        calendar.range(min..=max).collect()
    } else {
        let value = value.unwrap_or_default().trim();
        if let Some((from, until)) = value.split_once(RANGE_SEPARATOR) {
            let from = parse_date(from).unwrap_or(min).clamp(min, max);
            let until = parse_date(until).unwrap_or(max).clamp(min, max);
            if from > until {
                return Err(SettingsError::InvalidDateRange { from, until });
            }
            calendar.range(from..=until).collect()
        } else {
            let mut dates = Vec::new();
            for item in split_list(value) {
                let date = parse_date(item)
                    .ok_or_else(|| SettingsError::InvalidDate(item.to_string()))?;
                if (min..=max).contains(&date) && calendar.contains(date) {
                    dates.push(date);
                }
            }
            dates.sort_unstable();
            dates.dedup();
            dates
        }
    };

    if dates.is_empty() {
        return Err(SettingsError::NoDates);
    }
    Ok(dates)
}

fn parse_sizes(value: Option<&str>) -> Result<Vec<BarSize>, SettingsError> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Ok(vec![BarSize::default()]);
    }

    let mut sizes = Vec::new();
    for item in split_list(value) {
        let size: BarSize = item
            .parse()
            .map_err(|_| SettingsError::InvalidBarSize(item.to_string()))?;
        if !sizes.contains(&size) {
            sizes.push(size);
        }
    }

    if sizes.is_empty() || sizes.len() > MAX_BAR_SIZES {
        return Err(SettingsError::BarSizeCount {
            count: sizes.len(),
            max: MAX_BAR_SIZES,
        });
    }
    Ok(sizes)
}

fn parse_kinds(value: Option<&str>) -> Result<Vec<BarKind>, SettingsError> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Ok(vec![BarKind::Csv]);
    }

    let mut kinds = Vec::new();
    for item in split_list(value) {
        let kind: BarKind = item
            .parse()
            .map_err(|_| SettingsError::InvalidKind(item.to_string()))?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

fn validate_path(name: &'static str, value: &str) -> Result<PathBuf, SettingsError> {
    let trimmed = value.trim();
    let invalid = trimmed.is_empty()
        || trimmed
            .chars()
            .any(|c| c.is_control() || INVALID_PATH_CHARS.contains(&c));

    if invalid {
        return Err(SettingsError::InvalidPath {
            name,
            value: value.to_string(),
        });
    }
    Ok(PathBuf::from(trimmed))
}

fn required(name: &'static str, value: Option<String>) -> Result<String, SettingsError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(SettingsError::Missing(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Period;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixture() -> (InstrumentRegistry, TradingCalendar) {
        let registry = InstrumentRegistry::standard().unwrap();
        // 最后两个交易日 1/30、1/31 不可选
        let calendar = TradingCalendar::compute(ymd(2024, 1, 2), ymd(2024, 2, 1)).unwrap();
        (registry, calendar)
    }

    fn raw() -> RawSettings {
        RawSettings {
            user_name: Some("trader".to_string()),
            password: Some("secret".to_string()),
            ..RawSettings::default()
        }
    }

    #[test]
    fn test_defaults() {
        let (registry, calendar) = fixture();
        let settings = Settings::from_raw(raw(), &registry, &calendar).unwrap();

        assert_eq!(settings.assets.len(), registry.len());
        assert_eq!(settings.dates.first(), Some(&ymd(2024, 1, 2)));
        assert_eq!(settings.dates.last(), Some(&ymd(2024, 1, 29)));
        assert_eq!(settings.sizes, vec![BarSize::default()]);
        assert_eq!(settings.kinds, vec![BarKind::Csv]);
        assert_eq!(settings.save_to_path, PathBuf::from("bars"));
        assert!(!settings.in_folders);
    }

    #[test]
    fn test_assets_list() {
        let (registry, calendar) = fixture();
        let settings = Settings::from_raw(
            RawSettings {
                assets: Some("es, nq,ES".to_string()),
                ..raw()
            },
            &registry,
            &calendar,
        )
        .unwrap();
        let symbols: Vec<_> = settings.assets.iter().map(|a| a.symbol).collect();
        assert_eq!(symbols, vec![Symbol::ES, Symbol::NQ]);

        let error = Settings::from_raw(
            RawSettings {
                assets: Some("ES,XX".to_string()),
                ..raw()
            },
            &registry,
            &calendar,
        )
        .unwrap_err();
        assert_eq!(error, SettingsError::UnknownSymbol("XX".to_string()));
    }

    #[test]
    fn test_date_range_with_open_bounds() {
        let (_, calendar) = fixture();

        let dates = parse_dates(Some("2024-01-10..2024-01-12"), &calendar).unwrap();
        assert_eq!(dates, vec![ymd(2024, 1, 10), ymd(2024, 1, 11), ymd(2024, 1, 12)]);

        let dates = parse_dates(Some("..01/03/2024"), &calendar).unwrap();
        assert_eq!(dates, vec![ymd(2024, 1, 2), ymd(2024, 1, 3)]);

        // 上界截断到可选窗口
        let dates = parse_dates(Some("2024-01-26.."), &calendar).unwrap();
        assert_eq!(dates, vec![ymd(2024, 1, 26), ymd(2024, 1, 29)]);
    }

    #[test]
    fn test_date_range_reversed_is_error() {
        let (_, calendar) = fixture();
        assert_eq!(
            parse_dates(Some("2024-01-12..2024-01-10"), &calendar).unwrap_err(),
            SettingsError::InvalidDateRange {
                from: ymd(2024, 1, 12),
                until: ymd(2024, 1, 10)
            }
        );
    }

    #[test]
    fn test_date_list_drops_non_trading_days() {
        let (_, calendar) = fixture();
        let dates = parse_dates(Some("2024-01-05, 2024-01-02,2024-01-06,2024-01-15,2024-01-02"), &calendar)
            .unwrap();
        assert_eq!(dates, vec![ymd(2024, 1, 2), ymd(2024, 1, 5)]);

        assert_eq!(
            parse_dates(Some("2024-01-06"), &calendar).unwrap_err(),
            SettingsError::NoDates
        );
        assert!(matches!(
            parse_dates(Some("yesterday"), &calendar),
            Err(SettingsError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_sizes_and_kinds() {
        let sizes = parse_sizes(Some("M1, S30,M1")).unwrap();
        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes[1].period(), Period::Seconds);

        assert!(matches!(parse_sizes(Some("H1")), Err(SettingsError::InvalidBarSize(_))));
        let many: Vec<String> = (1..=11).map(|n| format!("M{}", n)).collect();
        assert!(matches!(
            parse_sizes(Some(&many.join(","))),
            Err(SettingsError::BarSizeCount { count: 11, .. })
        ));

        assert_eq!(parse_kinds(Some("ninja,csv")).unwrap(), vec![BarKind::Ninja, BarKind::Csv]);
        assert!(matches!(parse_kinds(Some("xml")), Err(SettingsError::InvalidKind(_))));
    }

    #[test]
    fn test_paths_and_credentials() {
        let (registry, calendar) = fixture();

        let error = Settings::from_raw(
            RawSettings {
                save_to_path: "out|put".to_string(),
                ..raw()
            },
            &registry,
            &calendar,
        )
        .unwrap_err();
        assert!(matches!(error, SettingsError::InvalidPath { name: "save-to", .. }));

        let error = Settings::from_raw(
            RawSettings {
                password: Some("   ".to_string()),
                ..raw()
            },
            &registry,
            &calendar,
        )
        .unwrap_err();
        assert_eq!(error, SettingsError::Missing("password"));
    }

    #[test]
    fn test_raw_settings_deserialize_with_defaults() {
        let raw: RawSettings =
            serde_json::from_str(r#"{"assets":"ES","in_folders":true}"#).unwrap();
        assert_eq!(raw.assets.as_deref(), Some("ES"));
        assert!(raw.in_folders);
        assert_eq!(raw.tape_dir, "tape");
    }
}
