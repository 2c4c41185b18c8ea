use crate::calendar::TradingCalendar;
use crate::calendar::error::CalendarError;
use crate::common::{Month, Symbol};
use crate::contract::error::ContractError;
use crate::instrument::entity::Instrument;
use chrono::{Datelike, Months, NaiveDate, TimeDelta};
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;

/// 支持的最早合约年份
pub const MIN_CONTRACT_YEAR: i32 = 2020;
/// 支持的最晚合约年份
pub const MAX_CONTRACT_YEAR: i32 = 2029;

/// # Summary
/// 计算某合约月份的换月日。
///
/// # Logic
/// 1. 取该月 1 日所在周（周日起算）的周四，可能落在上个月。
/// 2. 若该周四的日序大于 6（即落在上个月），加两周，否则加一周。
/// 3. 再加四天，得到月中偏后的一个周一。
///
/// # Arguments
/// * `month`: 合约月份。
/// * `year`: 合约年份。
///
/// # Returns
/// 换月日；与品种无关，只由年月决定。
pub fn roll_date(month: Month, year: i32) -> Result<NaiveDate, CalendarError> {
    let first = NaiveDate::from_ymd_opt(year, month.number(), 1).ok_or(CalendarError::InvalidDate {
        year,
        month: month.number(),
        day: 1,
    })?;

    let offset = 4 - i64::from(first.weekday().num_days_from_sunday());
    let thursday = first + TimeDelta::days(offset);

    let weeks = if thursday.day() > 6 { 2 } else { 1 };

    Ok(thursday + TimeDelta::days(7 * weeks + 4))
}

/// # Summary
/// 合约身份键：(品种, 年份, 月份)。
///
/// # Invariants
/// - 相等与排序均按 (品种, 年, 月) 的字典序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContractKey {
    pub symbol: Symbol,
    pub year: i32,
    pub month: Month,
}

impl FromStr for ContractKey {
    type Err = ContractError;

    /// # Summary
    /// 解析 `ESH24` 形式的合约代码（品种 + 月份代码 + 两位年份）。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_uppercase();
        let parse_error = || ContractError::Parse(s.to_string());

        if !value.is_ascii() || value.len() < 5 {
            return Err(parse_error());
        }

        let (head, year) = value.split_at(value.len() - 2);
        let (root, code) = head.split_at(head.len() - 1);

        if !(2..=6).contains(&root.len()) || !year.starts_with('2') {
            return Err(parse_error());
        }

        let symbol: Symbol = root.parse().map_err(|_| parse_error())?;
        let month = code
            .chars()
            .next()
            .and_then(Month::from_code)
            .ok_or_else(parse_error)?;
        let year: i32 = year.parse().map_err(|_| parse_error())?;

        Ok(Self {
            symbol,
            year: 2000 + year,
            month,
        })
    }
}

/// # Summary
/// 具体到年月的期货合约，以及它作为活跃合约的交易日区间。
///
/// # Invariants
/// - `trade_dates` 为 `[上一合约月份换月日, 本合约换月日)` 与有效交易日的交集，升序。
/// - 同一品种的任意两个合约的 `trade_dates` 互不相交。
#[derive(Debug, Clone)]
pub struct Contract {
    instrument: Arc<Instrument>,
    month: Month,
    year: i32,
    trade_dates: Vec<NaiveDate>,
}

impl Contract {
    /// # Summary
    /// 构造合约并计算其活跃交易日。
    ///
    /// # Logic
    /// 1. 计算本合约月份的换月日作为区间右端（不含）。
    /// 2. 向前回退到品种的上一个有效合约月份（可能跨年），以其换月日作为区间左端。
    /// 3. 取区间内的全部有效交易日。
    ///
    /// # Arguments
    /// * `instrument`: 所属品种。
    /// * `month`: 合约月份，必须是品种的有效合约月份。
    /// * `year`: 合约年份，必须位于支持范围内。
    /// * `calendar`: 有效交易日集合。
    pub fn new(
        instrument: Arc<Instrument>,
        month: Month,
        year: i32,
        calendar: &TradingCalendar,
    ) -> Result<Self, ContractError> {
        if !(MIN_CONTRACT_YEAR..=MAX_CONTRACT_YEAR).contains(&year) {
            return Err(ContractError::YearOutOfRange(year));
        }

        let gap = instrument
            .months_since_prior(month)
            .ok_or(ContractError::MonthNotListed {
                symbol: instrument.symbol,
                month,
            })?;

        let current = roll_date(month, year)?;

        let anchor = NaiveDate::from_ymd_opt(year, month.number(), 1)
            .and_then(|d| d.checked_sub_months(Months::new(gap)))
            .ok_or(CalendarError::InvalidDate {
                year,
                month: month.number(),
                day: 1,
            })?;
        let prior_month = Month::from_number(anchor.month()).ok_or(CalendarError::InvalidDate {
            year: anchor.year(),
            month: anchor.month(),
            day: 1,
        })?;
        let prior = roll_date(prior_month, anchor.year())?;

        let trade_dates = calendar.range(prior..current).collect();

        Ok(Self {
            instrument,
            month,
            year,
            trade_dates,
        })
    }

    pub fn key(&self) -> ContractKey {
        ContractKey {
            symbol: self.instrument.symbol,
            year: self.year,
            month: self.month,
        }
    }

    pub fn instrument(&self) -> &Arc<Instrument> {
        &self.instrument
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// 该合约作为活跃合约的交易日，升序
    pub fn trade_dates(&self) -> &[NaiveDate] {
        &self.trade_dates
    }

    /// 远程引擎使用的合约代码，如 `ESH4`
    pub fn vendor_symbol(&self) -> String {
        format!(
            "{}{}{}",
            self.instrument.symbol.vendor_symbol(),
            self.month.code(),
            self.year.rem_euclid(10)
        )
    }
}

impl PartialEq for Contract {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Contract {}

impl PartialOrd for Contract {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Contract {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl std::hash::Hash for Contract {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl std::fmt::Display for Contract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.vendor_symbol())
    }
}
