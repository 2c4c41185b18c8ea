use crate::bar::error::BarSetError;
use crate::common::BarKind;
use crate::job::Job;
use chrono::{DateTime, Timelike};
use chrono_tz::Tz;

/// # Summary
/// 单根 K 线，时间为交易时区下的收盘时刻。
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    // 收盘时间（交易时区）
    pub close_on: DateTime<Tz>,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
}

impl Bar {
    /// `MM/dd/yyyy HH:mm:ss.fff,Open,High,Low,Close`
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.close_on.format("%m/%d/%Y %H:%M:%S%.3f"),
            self.open,
            self.high,
            self.low,
            self.close
        )
    }

    /// `yyyyMMdd HHmmss fffffff;Open;High;Low;Close;0`，小数秒精确到 100 纳秒
    pub fn to_ninja_line(&self) -> String {
        let ticks = (self.close_on.nanosecond() % 1_000_000_000) / 100;
        format!(
            "{} {:07};{};{};{};{};0",
            self.close_on.format("%Y%m%d %H%M%S"),
            ticks,
            self.open,
            self.high,
            self.low,
            self.close
        )
    }

    pub fn to_line(&self, kind: BarKind) -> String {
        match kind {
            BarKind::Csv => self.to_csv_line(),
            BarKind::Ninja => self.to_ninja_line(),
        }
    }
}

/// # Summary
/// 单个抓取任务的 K 线集合，只允许追加。
///
/// # Invariants
/// - 收盘时间单调不减；乱序追加返回错误且不修改集合。
#[derive(Debug, Clone)]
pub struct BarSet {
    job: Job,
    bars: Vec<Bar>,
}

impl BarSet {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            bars: Vec::new(),
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    /// # Summary
    /// 追加一根 K 线。
    ///
    /// # Logic
    /// 1. 若集合非空且新 K 线早于最后一根，拒绝追加。
    /// 2. 否则追加到末尾（允许与最后一根同一时刻）。
    pub fn add(&mut self, bar: Bar) -> Result<(), BarSetError> {
        if let Some(last) = self.bars.last()
            && bar.close_on < last.close_on
        {
            return Err(BarSetError::OutOfOrder {
                job: self.job.to_string(),
                last: last.close_on.to_rfc3339(),
                received: bar.close_on.to_rfc3339(),
            });
        }

        self.bars.push(bar);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bar> + '_ {
        self.bars.iter()
    }

    pub fn into_job(self) -> Job {
        self.job
    }

    /// 渲染为某输出格式的完整文件内容，每行一根 K 线
    pub fn render(&self, kind: BarKind) -> String {
        let mut content = String::new();
        for bar in &self.bars {
            content.push_str(&bar.to_line(kind));
            content.push('\n');
        }
        content
    }
}

impl std::fmt::Display for BarSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.job.file_name(BarKind::Csv))
    }
}
