use crate::calendar::error::CalendarError;
use chrono::{Datelike, NaiveDate, TimeDelta, Weekday};

/// # Summary
/// 美国市场休市节日。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Holiday {
    NewYearsDay,
    // 1 月第三个周一
    MartinLutherKingDay,
    // 2 月第三个周一
    PresidentsDay,
    // 复活节前的周五
    GoodFriday,
    // 5 月最后一个周一
    MemorialDay,
    // 2022 年起
    Juneteenth,
    IndependenceDay,
    // 9 月第一个周一
    LaborDay,
    // 11 月第四个周四
    ThanksgivingDay,
    DayAfterThanksgiving,
    ChristmasDay,
    // 次年元旦因周末调整落回本年
    NextNewYearsDay,
}

/// Juneteenth 自该年起成为休市日
const JUNETEENTH_FIRST_YEAR: i32 = 2022;

fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate, CalendarError> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or(CalendarError::InvalidDate { year, month, day })
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Result<NaiveDate, CalendarError> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n).ok_or(CalendarError::InvalidDate {
        year,
        month,
        day: 0,
    })
}

/// # Summary
/// 固定日期节日的周末顺延规则。
///
/// # Logic
/// 1. 周六顺延至前一个周五。
/// 2. 周日顺延至后一个周一。
/// 3. 其余情况保持不变。
pub fn adjust_for_weekend(holiday: NaiveDate) -> NaiveDate {
    match holiday.weekday() {
        Weekday::Sat => holiday - TimeDelta::days(1),
        Weekday::Sun => holiday + TimeDelta::days(1),
        _ => holiday,
    }
}

/// # Summary
/// 计算指定年份的复活节（周日）。
///
/// # Logic
/// 1. 采用高斯/米斯同余算法求出三月内的日序。
/// 2. 日序超过 31 时折算到四月。
pub fn easter_sunday(year: i32) -> Result<NaiveDate, CalendarError> {
    let g = year % 19;
    let c = year / 100;
    let h = (c - c / 4 - (8 * c + 13) / 25 + 19 * g + 15) % 30;
    let i = h - h / 28 * (1 - h / 28 * (29 / (h + 1)) * ((21 - g) / 11));

    let mut day = i - ((year + year / 4 + i + 2 - c + c / 4) % 7) + 28;
    let mut month = 3;

    if day > 31 {
        month += 1;
        day -= 31;
    }

    let day = u32::try_from(day).map_err(|_| CalendarError::InvalidDate {
        year,
        month,
        day: 0,
    })?;
    date(year, month, day)
}

/// 耶稣受难日：复活节前两天
pub fn good_friday(year: i32) -> Result<NaiveDate, CalendarError> {
    Ok(easter_sunday(year)? - TimeDelta::days(2))
}

/// # Summary
/// 计算指定年份的全部休市日。
///
/// # Logic
/// 1. 固定日期节日（元旦、Juneteenth、独立日、圣诞）按周末顺延规则调整。
/// 2. 按“第 N 个星期几”定义的节日直接做星期算术。
/// 3. 耶稣受难日由复活节推算。
/// 4. 次年元旦若因顺延落在本年，一并计入本年。
///
/// # Arguments
/// * `year`: 公历年份。
///
/// # Returns
/// 按规则顺序排列的 (节日, 日期) 列表，共 11 或 12 项（2022 年前不含 Juneteenth）。
pub fn holidays_for_year(year: i32) -> Result<Vec<(Holiday, NaiveDate)>, CalendarError> {
    let mut holidays = Vec::with_capacity(12);

    holidays.push((Holiday::NewYearsDay, adjust_for_weekend(date(year, 1, 1)?)));
    holidays.push((
        Holiday::MartinLutherKingDay,
        nth_weekday(year, 1, Weekday::Mon, 3)?,
    ));
    holidays.push((Holiday::PresidentsDay, nth_weekday(year, 2, Weekday::Mon, 3)?));
    holidays.push((Holiday::GoodFriday, good_friday(year)?));

    let mut memorial = date(year, 5, 31)?;
    while memorial.weekday() != Weekday::Mon {
        memorial = memorial - TimeDelta::days(1);
    }
    holidays.push((Holiday::MemorialDay, memorial));

    if year >= JUNETEENTH_FIRST_YEAR {
        holidays.push((Holiday::Juneteenth, adjust_for_weekend(date(year, 6, 19)?)));
    }

    holidays.push((Holiday::IndependenceDay, adjust_for_weekend(date(year, 7, 4)?)));
    holidays.push((Holiday::LaborDay, nth_weekday(year, 9, Weekday::Mon, 1)?));

    let thanksgiving = nth_weekday(year, 11, Weekday::Thu, 4)?;
    holidays.push((Holiday::ThanksgivingDay, thanksgiving));
    holidays.push((
        Holiday::DayAfterThanksgiving,
        thanksgiving + TimeDelta::days(1),
    ));

    holidays.push((Holiday::ChristmasDay, adjust_for_weekend(date(year, 12, 25)?)));

    let next_new_years = adjust_for_weekend(date(year + 1, 1, 1)?);
    if next_new_years.year() == year {
        holidays.push((Holiday::NextNewYearsDay, next_new_years));
    }

    Ok(holidays)
}
