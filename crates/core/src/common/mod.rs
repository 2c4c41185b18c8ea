pub mod time;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 标准期货月份代码，按 1 月至 12 月排列。
const MONTH_CODES: [char; 12] = ['F', 'G', 'H', 'J', 'K', 'M', 'N', 'Q', 'U', 'V', 'X', 'Z'];

/// # Summary
/// 系统支持的期货品种代码。
///
/// # Invariants
/// - 作为品种注册表的唯一主键。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
    BP,
    CL,
    E7,
    ES,
    EU,
    GC,
    J7,
    JY,
    NQ,
    QM,
    QO,
    ZB,
    ZF,
    ZN,
}

impl Symbol {
    /// 全部品种，按枚举顺序排列
    pub const ALL: [Symbol; 14] = [
        Symbol::BP,
        Symbol::CL,
        Symbol::E7,
        Symbol::ES,
        Symbol::EU,
        Symbol::GC,
        Symbol::J7,
        Symbol::JY,
        Symbol::NQ,
        Symbol::QM,
        Symbol::QO,
        Symbol::ZB,
        Symbol::ZF,
        Symbol::ZN,
    ];

    /// # Summary
    /// 获取远程行情引擎使用的品种代码。
    ///
    /// # Logic
    /// 1. 外汇与迷你原油品种在引擎侧使用不同的根代码。
    /// 2. 其余品种与本地代码一致。
    pub fn vendor_symbol(&self) -> &'static str {
        match self {
            Symbol::BP => "6B",
            Symbol::EU => "6E",
            Symbol::JY => "6J",
            Symbol::QM => "QMMY",
            other => other.as_str(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Symbol::BP => "BP",
            Symbol::CL => "CL",
            Symbol::E7 => "E7",
            Symbol::ES => "ES",
            Symbol::EU => "EU",
            Symbol::GC => "GC",
            Symbol::J7 => "J7",
            Symbol::JY => "JY",
            Symbol::NQ => "NQ",
            Symbol::QM => "QM",
            Symbol::QO => "QO",
            Symbol::ZB => "ZB",
            Symbol::ZF => "ZF",
            Symbol::ZN => "ZN",
        }
    }
}

impl FromStr for Symbol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Symbol::ALL
            .into_iter()
            .find(|symbol| symbol.as_str() == wanted)
            .ok_or_else(|| format!("Unknown Symbol: {}", s))
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// # Summary
/// 品种挂牌的交易所。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Exchange {
    CBOE,
    CBOT,
    CME,
    NYMEX,
    COMEX,
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            Exchange::CBOE => "CBOE",
            Exchange::CBOT => "CBOT",
            Exchange::CME => "CME",
            Exchange::NYMEX => "NYMEX",
            Exchange::COMEX => "COMEX",
        };
        f.write_str(code)
    }
}

/// # Summary
/// 合约月份，取值 1 月至 12 月。
///
/// # Invariants
/// - 顺序与日历月份一致，可直接比较大小。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// 日历月份序号 (1..=12)
    pub fn number(&self) -> u32 {
        *self as u32 + 1
    }

    /// 根据日历月份序号构造，越界返回 None
    pub fn from_number(number: u32) -> Option<Month> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        Month::ALL.get(index).copied()
    }

    /// 单字母期货月份代码 (F, G, H ... Z)
    pub fn code(&self) -> char {
        MONTH_CODES[*self as usize]
    }

    /// 将期货月份代码解析为月份，大小写不敏感
    pub fn from_code(code: char) -> Option<Month> {
        let code = code.to_ascii_uppercase();
        MONTH_CODES
            .iter()
            .position(|c| *c == code)
            .and_then(|index| Month::ALL.get(index).copied())
    }
}

/// # Summary
/// K 线周期单位。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Period {
    // 秒线
    Seconds,
    // 分钟线
    Minutes,
}

impl Period {
    pub fn code(&self) -> char {
        match self {
            Period::Seconds => 'S',
            Period::Minutes => 'M',
        }
    }
}

/// # Summary
/// K 线尺寸，由周期单位与数量组成，文本形式如 `M5`、`S30`。
///
/// # Invariants
/// - `quantity` 取值范围为 1..=60，只能通过 [`BarSize::new`] 或解析构造。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BarSize {
    period: Period,
    quantity: u8,
}

impl BarSize {
    pub const MIN_QUANTITY: u8 = 1;
    pub const MAX_QUANTITY: u8 = 60;

    /// # Summary
    /// 构造 K 线尺寸。
    ///
    /// # Arguments
    /// * `period`: 周期单位。
    /// * `quantity`: 单位数量，必须位于 1..=60。
    ///
    /// # Returns
    /// 数量越界时返回错误描述。
    pub fn new(period: Period, quantity: u8) -> Result<Self, String> {
        if !(Self::MIN_QUANTITY..=Self::MAX_QUANTITY).contains(&quantity) {
            return Err(format!(
                "Bar quantity {} is outside {}..={}",
                quantity,
                Self::MIN_QUANTITY,
                Self::MAX_QUANTITY
            ));
        }
        Ok(Self { period, quantity })
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn quantity(&self) -> u8 {
        self.quantity
    }
}

impl Default for BarSize {
    fn default() -> Self {
        Self {
            period: Period::Minutes,
            quantity: 1,
        }
    }
}

impl FromStr for BarSize {
    type Err = String;

    /// # Logic
    /// 1. 首字母 `S`/`M`（大小写不敏感）确定周期单位。
    /// 2. 其后 1 至 3 位数字为数量，再交由 `new` 校验范围。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        let mut chars = value.chars();
        let period = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('S') => Period::Seconds,
            Some('M') => Period::Minutes,
            _ => return Err(format!("Unknown BarSize: {}", s)),
        };

        let digits = chars.as_str();
        if digits.is_empty() || digits.len() > 3 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("Unknown BarSize: {}", s));
        }

        let quantity: u8 = digits
            .parse()
            .map_err(|_| format!("Bar quantity out of range: {}", s))?;
        BarSize::new(period, quantity)
    }
}

impl std::fmt::Display for BarSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.period.code(), self.quantity)
    }
}

/// # Summary
/// 输出文件格式。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BarKind {
    // 逗号分隔的通用 CSV
    Csv,
    // NinjaTrader 导入格式
    Ninja,
}

impl FromStr for BarKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(BarKind::Csv),
            "ninja" => Ok(BarKind::Ninja),
            _ => Err(format!("Unknown BarKind: {}", s)),
        }
    }
}

impl std::fmt::Display for BarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BarKind::Csv => write!(f, "CSV"),
            BarKind::Ninja => write!(f, "NINJA"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_size_parse_and_display() {
        let size: BarSize = "m5".parse().unwrap();
        assert_eq!(size.period(), Period::Minutes);
        assert_eq!(size.quantity(), 5);
        assert_eq!(size.to_string(), "M5");

        let size: BarSize = "S30".parse().unwrap();
        assert_eq!(size.to_string(), "S30");
        assert_eq!(BarSize::default().to_string(), "M1");
    }

    #[test]
    fn test_bar_size_rejects_out_of_range() {
        assert!("M0".parse::<BarSize>().is_err());
        assert!("M61".parse::<BarSize>().is_err());
        assert!("S999".parse::<BarSize>().is_err());
        assert!("H1".parse::<BarSize>().is_err());
        assert!("M".parse::<BarSize>().is_err());
        assert!("M1x".parse::<BarSize>().is_err());
    }

    #[test]
    fn test_month_codes() {
        assert_eq!(Month::March.code(), 'H');
        assert_eq!(Month::December.code(), 'Z');
        assert_eq!(Month::from_code('u'), Some(Month::September));
        assert_eq!(Month::from_code('A'), None);
        assert_eq!(Month::from_number(1), Some(Month::January));
        assert_eq!(Month::from_number(13), None);
        assert_eq!(Month::from_number(0), None);
        assert_eq!(Month::October.number(), 10);
    }

    #[test]
    fn test_symbol_parse_and_vendor_mapping() {
        assert_eq!("es".parse::<Symbol>().unwrap(), Symbol::ES);
        assert!("XX".parse::<Symbol>().is_err());
        assert_eq!(Symbol::EU.vendor_symbol(), "6E");
        assert_eq!(Symbol::QM.vendor_symbol(), "QMMY");
        assert_eq!(Symbol::NQ.vendor_symbol(), "NQ");
    }

    #[test]
    fn test_bar_kind_parse() {
        assert_eq!("ninja".parse::<BarKind>().unwrap(), BarKind::Ninja);
        assert_eq!(BarKind::Csv.to_string(), "CSV");
        assert!("json".parse::<BarKind>().is_err());
    }
}
