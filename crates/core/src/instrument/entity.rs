use crate::common::{Exchange, Month, Symbol};
use crate::instrument::error::InstrumentError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// # Summary
/// 可交易品种实体。
///
/// # Invariants
/// - `months` 非空、升序且无重复。
/// - 构建后不可变。
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    // 品种代码，注册表主键
    pub symbol: Symbol,
    // 挂牌交易所
    pub exchange: Exchange,
    // 有效合约月份
    months: Vec<Month>,
    // 最小变动价位
    pub one_tick: f64,
}

impl Instrument {
    /// # Summary
    /// 创建品种实体。
    ///
    /// # Logic
    /// 1. 将月份代码串（如 `HMUZ`）逐字解析为月份。
    /// 2. 排序去重，空集合视为配置错误。
    ///
    /// # Arguments
    /// * `symbol`: 品种代码。
    /// * `exchange`: 交易所。
    /// * `months`: 合约月份代码串。
    /// * `one_tick`: 最小变动价位。
    pub fn new(
        symbol: Symbol,
        exchange: Exchange,
        months: &str,
        one_tick: f64,
    ) -> Result<Self, InstrumentError> {
        let mut parsed = months
            .chars()
            .map(|code| Month::from_code(code).ok_or(InstrumentError::InvalidMonthCode { symbol, code }))
            .collect::<Result<Vec<_>, _>>()?;

        parsed.sort();
        parsed.dedup();

        if parsed.is_empty() {
            return Err(InstrumentError::NoContractMonths(symbol));
        }

        Ok(Self {
            symbol,
            exchange,
            months: parsed,
            one_tick,
        })
    }

    pub fn months(&self) -> &[Month] {
        &self.months
    }

    /// # Summary
    /// 计算某合约月份距上一个有效合约月份的月数。
    ///
    /// # Logic
    /// 1. 若不是首个合约月份，直接与前一个月份相减。
    /// 2. 若是首个合约月份，则跨年回绕到最后一个合约月份。
    ///
    /// # Returns
    /// 月份不属于该品种时返回 None。
    pub fn months_since_prior(&self, month: Month) -> Option<u32> {
        let index = self.months.iter().position(|m| *m == month)?;
        if index > 0 {
            let prior = self.months.get(index - 1)?;
            Some(month.number() - prior.number())
        } else {
            let first = self.months.first()?;
            let last = self.months.last()?;
            Some(first.number() + (12 - last.number()))
        }
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// # Summary
/// 品种注册表：进程启动时从静态表一次性构建。
///
/// # Invariants
/// - Symbol 到品种的映射唯一且不可变。
#[derive(Debug, Clone)]
pub struct InstrumentRegistry {
    instruments: BTreeMap<Symbol, Arc<Instrument>>,
}

impl InstrumentRegistry {
    /// # Summary
    /// 由品种列表构建注册表，重复注册视为错误。
    pub fn new(instruments: Vec<Instrument>) -> Result<Self, InstrumentError> {
        let mut map = BTreeMap::new();
        for instrument in instruments {
            let symbol = instrument.symbol;
            if map.insert(symbol, Arc::new(instrument)).is_some() {
                return Err(InstrumentError::Duplicate(symbol));
            }
        }
        Ok(Self { instruments: map })
    }

    /// # Summary
    /// 内置的标准品种表。
    ///
    /// # Logic
    /// 1. 逐个声明品种、交易所、合约月份与最小变动价位。
    /// 2. 任一条目非法则整体失败。
    pub fn standard() -> Result<Self, InstrumentError> {
        use Exchange::*;
        use Symbol::*;

        let table: [(Symbol, Exchange, &str, f64); 14] = [
            (ES, CME, "HMUZ", 0.25),
            (NQ, CME, "HMUZ", 0.25),
            (CL, NYMEX, "FGHJKMNQUVXZ", 0.01),
            (QM, NYMEX, "FGHJKMNQUVXZ", 0.01),
            (ZB, CBOT, "HMUZ", 0.03125),
            (ZN, CBOT, "HMUZ", 0.015625),
            (GC, COMEX, "GJMQVZ", 0.1),
            (QO, COMEX, "FGJMQVZ", 0.25),
            (EU, CME, "HMUZ", 0.00005),
            (E7, CME, "HMUZ", 0.0001),
            (JY, CME, "HMUZ", 0.0000005),
            (J7, CME, "HMUZ", 0.000001),
            (BP, CME, "HMUZ", 0.0001),
            (ZF, CBOT, "HMUZ", 0.0078125),
        ];

        let instruments = table
            .into_iter()
            .map(|(symbol, exchange, months, tick)| Instrument::new(symbol, exchange, months, tick))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(instruments)
    }

    pub fn get(&self, symbol: Symbol) -> Result<Arc<Instrument>, InstrumentError> {
        self.instruments
            .get(&symbol)
            .cloned()
            .ok_or(InstrumentError::Unknown(symbol))
    }

    /// 按品种代码顺序迭代
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Instrument>> + '_ {
        self.instruments.values()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}
