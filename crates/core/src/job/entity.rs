use crate::calendar::TradingCalendar;
use crate::calendar::error::CalendarError;
use crate::common::time::local_to_utc;
use crate::common::{BarKind, BarSize, Symbol};
use crate::contract::ContractIndex;
use crate::instrument::entity::Instrument;
use crate::job::error::JobError;
use crate::session::entity::ReplayRequest;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const FILE_PREFIX: &str = "RAPI_";
const FILE_SUFFIX: &str = "_EST.csv";
const DATE_FORMAT: &str = "%Y%m%d";

/// # Summary
/// 计算某交易日的交易时段窗口（UTC）。
///
/// # Logic
/// 1. 以交易日本地零点为锚点。
/// 2. 时段起点为锚点前 6 小时（前一日 18:00）。
/// 3. 时段终点为当日 16:59:59.999。
/// 4. 两端按交易时区换算为 UTC，夏令时歧义取较晚时刻，缺口取跳变后起点。
pub fn session_window(
    trade_date: NaiveDate,
) -> Result<(DateTime<Utc>, DateTime<Utc>), CalendarError> {
    let anchor = trade_date.and_time(NaiveTime::MIN);

    let from = anchor - TimeDelta::hours(6);
    let until = anchor
        + TimeDelta::hours(16)
        + TimeDelta::minutes(59)
        + TimeDelta::seconds(59)
        + TimeDelta::milliseconds(999);

    Ok((local_to_utc(from)?, local_to_utc(until)?))
}

/// # Summary
/// 一次抓取请求的不可变描述：品种、交易日、K 线尺寸与输出格式。
///
/// # Invariants
/// - 创建后不可变。
/// - `kinds` 非空且无重复，保持请求顺序。
/// - `id` 在一次运行内唯一，用作远程回放的关联上下文。
#[derive(Debug, Clone)]
pub struct Job {
    id: u64,
    instrument: Arc<Instrument>,
    trade_date: NaiveDate,
    bar_size: BarSize,
    kinds: Vec<BarKind>,
}

impl Job {
    pub fn new(
        id: u64,
        instrument: Arc<Instrument>,
        trade_date: NaiveDate,
        bar_size: BarSize,
        kinds: &[BarKind],
    ) -> Result<Self, JobError> {
        let mut unique = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if !unique.contains(kind) {
                unique.push(*kind);
            }
        }

        if unique.is_empty() {
            return Err(JobError::NoKinds);
        }

        Ok(Self {
            id,
            instrument,
            trade_date,
            bar_size,
            kinds: unique,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn instrument(&self) -> &Arc<Instrument> {
        &self.instrument
    }

    pub fn symbol(&self) -> Symbol {
        self.instrument.symbol
    }

    pub fn trade_date(&self) -> NaiveDate {
        self.trade_date
    }

    pub fn bar_size(&self) -> BarSize {
        self.bar_size
    }

    pub fn kinds(&self) -> &[BarKind] {
        &self.kinds
    }

    /// 输出文件名，如 `RAPI_ES_M1_20240102_CSV_EST.csv`
    pub fn file_name(&self, kind: BarKind) -> String {
        format!(
            "{}{}_{}_{}_{}{}",
            FILE_PREFIX,
            self.instrument.symbol,
            self.bar_size,
            self.trade_date.format(DATE_FORMAT),
            kind,
            FILE_SUFFIX
        )
    }

    /// # Summary
    /// 推导某输出格式的完整路径。
    ///
    /// # Logic
    /// 1. 不分目录时直接位于 `base_path` 下。
    /// 2. 分目录时依次嵌套：格式 / K 线尺寸 / 品种 / 年份 / 文件名。
    pub fn full_path(&self, base_path: &Path, in_folders: bool, kind: BarKind) -> PathBuf {
        if !in_folders {
            return base_path.join(self.file_name(kind));
        }

        base_path
            .join(kind.to_string())
            .join(self.bar_size.to_string())
            .join(self.instrument.symbol.as_str())
            .join(self.trade_date.year().to_string())
            .join(self.file_name(kind))
    }

    /// # Summary
    /// 推导远程回放请求参数。
    ///
    /// # Logic
    /// 1. 校验任务日期属于有效交易日。
    /// 2. 通过合约索引查找该日的活跃合约。
    /// 3. 计算交易时段的 UTC 起止时刻。
    /// 4. 以任务 id 作为关联上下文。
    ///
    /// # Returns
    /// 成功返回回放请求；非交易日或无活跃合约时返回 JobError。
    pub fn query_params(
        &self,
        contracts: &ContractIndex,
        calendar: &TradingCalendar,
    ) -> Result<ReplayRequest, JobError> {
        if !calendar.contains(self.trade_date) {
            return Err(JobError::NotATradeDate(self.trade_date));
        }

        let contract = contracts.resolve(self.instrument.symbol, self.trade_date)?;
        let (start, end) = session_window(self.trade_date)?;

        Ok(ReplayRequest {
            symbol: contract.vendor_symbol(),
            exchange: self.instrument.exchange,
            start,
            end,
            period: self.bar_size.period(),
            quantity: self.bar_size.quantity(),
            context: self.id,
        })
    }
}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<String> = self.kinds.iter().map(|k| k.to_string()).collect();
        write!(
            f,
            "{},{},{},{}",
            self.instrument.symbol,
            self.trade_date.format(DATE_FORMAT),
            self.bar_size,
            kinds.join("+")
        )
    }
}

/// # Summary
/// 由输出路径反解析得到的任务身份信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOutputPath {
    pub kind: BarKind,
    pub bar_size: BarSize,
    pub symbol: Symbol,
    pub trade_date: NaiveDate,
    pub year: i32,
}

impl ParsedOutputPath {
    /// # Summary
    /// 反解析 [`Job::full_path`] 生成的路径。
    ///
    /// # Logic
    /// 1. 从文件名中拆出品种、尺寸、日期与格式。
    /// 2. 若路径带有分目录层级，校验各层目录与文件名一致。
    pub fn parse(path: &Path) -> Result<Self, JobError> {
        let invalid = || JobError::InvalidOutputPath(path.display().to_string());

        let file_name = path.file_name().and_then(|n| n.to_str()).ok_or_else(invalid)?;
        let stem = file_name
            .strip_prefix(FILE_PREFIX)
            .and_then(|s| s.strip_suffix(FILE_SUFFIX))
            .ok_or_else(invalid)?;

        let parts: Vec<&str> = stem.split('_').collect();
        let [symbol, size, date, kind] = parts.as_slice() else {
            return Err(invalid());
        };

        let trade_date = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|_| invalid())?;
        let parsed = Self {
            kind: kind.parse().map_err(|_| invalid())?,
            bar_size: size.parse().map_err(|_| invalid())?,
            symbol: symbol.parse().map_err(|_| invalid())?,
            trade_date,
            year: trade_date.year(),
        };

        let folders: Vec<&str> = path
            .parent()
            .map(|p| {
                p.components()
                    .rev()
                    .take(4)
                    .filter_map(|c| c.as_os_str().to_str())
                    .collect()
            })
            .unwrap_or_default();

        // 紧邻的父目录是年份时，视为分目录布局并逐层校验
        if folders.first() == Some(&parsed.year.to_string().as_str()) {
            let expected = [
                parsed.year.to_string(),
                parsed.symbol.to_string(),
                parsed.bar_size.to_string(),
                parsed.kind.to_string(),
            ];
            if folders.len() != expected.len()
                || folders.iter().zip(expected.iter()).any(|(a, b)| *a != b.as_str())
            {
                return Err(invalid());
            }
        }

        Ok(parsed)
    }
}
