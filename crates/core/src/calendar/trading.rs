use crate::calendar::error::CalendarError;
use crate::calendar::holiday::holidays_for_year;
use crate::common::time::TimeProvider;
use chrono::{Datelike, NaiveDate, TimeDelta, Weekday};
use std::collections::{BTreeSet, HashSet};
use std::ops::RangeBounds;

/// 可抓取历史数据的最早交易日
pub const MIN_TRADE_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2019, 12, 16) {
    Some(date) => date,
    None => NaiveDate::MIN,
};

/// 最近的若干个交易日在远端尚未完整落地，不允许选择
const UNSETTLED_TRADE_DAYS: usize = 2;

/// 周一至周五
pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// # Summary
/// 有效交易日集合：区间内剔除周末与节假日后的全部日期。
///
/// # Invariants
/// - 构建后不可变，有序且无重复。
/// - 集合中的每个日期都是工作日，且不属于对应年份的节假日。
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    days: BTreeSet<NaiveDate>,
}

impl TradingCalendar {
    /// # Summary
    /// 计算 `[min_date, until)` 范围内的全部交易日。
    ///
    /// # Logic
    /// 1. 对区间覆盖到的每一个年份计算节假日集合。
    /// 2. 逐日遍历，保留周一至周五且不属于节假日的日期。
    ///
    /// # Arguments
    /// * `min_date`: 起始日期（包含）。
    /// * `until`: 结束日期（不包含）。
    ///
    /// # Returns
    /// 成功返回交易日历；节假日推算失败时返回 CalendarError。
    pub fn compute(min_date: NaiveDate, until: NaiveDate) -> Result<Self, CalendarError> {
        let mut days = BTreeSet::new();
        if until <= min_date {
            return Ok(Self { days });
        }

        let mut holidays = HashSet::new();
        for year in min_date.year()..=until.year() {
            holidays.extend(holidays_for_year(year)?.into_iter().map(|(_, d)| d));
        }

        let mut date = min_date;
        while date < until {
            if is_weekday(date) && !holidays.contains(&date) {
                days.insert(date);
            }
            date = date + TimeDelta::days(1);
        }

        Ok(Self { days })
    }

    /// # Summary
    /// 构建从 [`MIN_TRADE_DATE`] 到“今天”（包含）的交易日历。
    ///
    /// # Arguments
    /// * `clock`: 提供“今天”的时钟。
    pub fn through_today(clock: &dyn TimeProvider) -> Result<Self, CalendarError> {
        let today = clock.today();
        Self::compute(MIN_TRADE_DATE, today + TimeDelta::days(1))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.days.contains(&date)
    }

    /// 按日期升序迭代
    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.iter().copied()
    }

    /// 区间内的交易日，边界语义与 `range` 参数一致
    pub fn range<R: RangeBounds<NaiveDate>>(&self, range: R) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.range(range).copied()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.days.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.days.last().copied()
    }

    /// 允许选择的最早日期
    pub fn min_bar_date(&self) -> Option<NaiveDate> {
        self.first()
    }

    /// 允许选择的最晚日期：倒数第三个交易日
    pub fn max_bar_date(&self) -> Option<NaiveDate> {
        self.days.iter().rev().nth(UNSETTLED_TRADE_DAYS).copied()
    }

    /// 允许选择的全部交易日
    pub fn selectable(&self) -> Vec<NaiveDate> {
        match (self.min_bar_date(), self.max_bar_date()) {
            (Some(min), Some(max)) => self.range(min..=max).collect(),
            _ => Vec::new(),
        }
    }
}
