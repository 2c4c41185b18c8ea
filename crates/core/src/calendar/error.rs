use thiserror::Error;

/// # Summary
/// 日历域错误枚举，处理非法日期算术。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    // 年月日组合无法构成合法日期
    #[error("Invalid date: {year}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },
    // 本地时间在交易时区内一天之内找不到合法时刻
    #[error("Unresolvable local time: {0}")]
    UnresolvableLocalTime(chrono::NaiveDateTime),
}
