use crate::calendar::error::CalendarError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::RwLock;

/// 交易时段所在时区（美东）。所有 K 线时间与交易日锚点均以此时区表达。
pub const TRADING_TZ: Tz = chrono_tz::America::New_York;

/// # Summary
/// 时间供给器接口，用于隔离物理系统时钟。
/// 交易日历的上界（“今天”）必须通过此接口获取。
pub trait TimeProvider: Send + Sync {
    /// 获取当前时间
    fn now(&self) -> DateTime<Utc>;

    /// 获取交易时区下的当前日期
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&TRADING_TZ).date_naive()
    }
}

/// # Summary
/// 真实时钟，直接返回操作系统当前时间。
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// # Summary
/// 测试专用的固定时钟，允许主动拨动时间。
///
/// # Invariants
/// - 内部利用 `RwLock` 提供多线程安全的读写。
pub struct FakeClockProvider {
    current_time: RwLock<DateTime<Utc>>,
}

impl FakeClockProvider {
    /// 使用指定的初始时间创建固定时钟
    pub fn new(initial_time: DateTime<Utc>) -> Self {
        Self {
            current_time: RwLock::new(initial_time),
        }
    }

    /// 强制修改时钟的当前时间
    pub fn set_time(&self, new_time: DateTime<Utc>) {
        let mut time = self
            .current_time
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *time = new_time;
    }
}

impl TimeProvider for FakeClockProvider {
    fn now(&self) -> DateTime<Utc> {
        *self
            .current_time
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// # Summary
/// 将交易时区的本地时间换算为 UTC 时刻。
///
/// # Logic
/// 1. 本地时间唯一对应时直接换算。
/// 2. 夏令时回拨导致的重复时间取较晚的时刻。
/// 3. 夏令时跳变导致的不存在时间，取跳变后区间的起点。
///
/// # Returns
/// 一天之内都找不到合法本地时间时返回 `CalendarError::UnresolvableLocalTime`。
pub fn local_to_utc(local: NaiveDateTime) -> Result<DateTime<Utc>, CalendarError> {
    match TRADING_TZ.from_local_datetime(&local).latest() {
        Some(zoned) => Ok(zoned.with_timezone(&Utc)),
        None => start_of_interval_after(local),
    }
}

/// 将 UTC 时刻换算为交易时区时间
pub fn utc_to_local(instant: DateTime<Utc>) -> DateTime<Tz> {
    instant.with_timezone(&TRADING_TZ)
}

// 时区跳变均发生在整分钟，逐分钟向后探测第一个合法的本地时间。
fn start_of_interval_after(local: NaiveDateTime) -> Result<DateTime<Utc>, CalendarError> {
    let mut probe = local
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(local);

    for _ in 0..(24 * 60) {
        probe += TimeDelta::minutes(1);
        if let Some(zoned) = TRADING_TZ.from_local_datetime(&probe).earliest() {
            return Ok(zoned.with_timezone(&Utc));
        }
    }

    Err(CalendarError::UnresolvableLocalTime(local))
}
