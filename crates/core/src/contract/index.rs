use crate::calendar::TradingCalendar;
use crate::common::Symbol;
use crate::contract::entity::{Contract, MAX_CONTRACT_YEAR, MIN_CONTRACT_YEAR};
use crate::contract::error::ContractError;
use crate::instrument::entity::{Instrument, InstrumentRegistry};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// # Summary
/// 为单个品种构建支持年份范围内的全部合约。
///
/// # Logic
/// 1. 按年份升序、年内按合约月份升序遍历。
/// 2. 每个 (月份, 年份) 组合构造一个合约并计算其活跃交易日。
pub fn build_contracts(
    instrument: &Arc<Instrument>,
    calendar: &TradingCalendar,
) -> Result<Vec<Contract>, ContractError> {
    let mut contracts = Vec::new();
    for year in MIN_CONTRACT_YEAR..=MAX_CONTRACT_YEAR {
        for month in instrument.months() {
            contracts.push(Contract::new(instrument.clone(), *month, year, calendar)?);
        }
    }
    Ok(contracts)
}

/// # Summary
/// 合约索引：(品种, 交易日) 到唯一活跃合约的查找表。
///
/// # Invariants
/// - 构建后不可变。
/// - 每个 (品种, 交易日) 至多对应一个合约，冲突在构建时直接失败。
#[derive(Debug, Clone)]
pub struct ContractIndex {
    // 每个品种的合约列表，按 (年, 月) 升序
    contracts: BTreeMap<Symbol, Vec<Contract>>,
    // (品种, 交易日) -> 合约在列表中的下标
    by_trade_date: HashMap<(Symbol, NaiveDate), usize>,
}

impl ContractIndex {
    /// # Summary
    /// 由品种注册表与交易日历构建合约索引。
    ///
    /// # Logic
    /// 1. 为每个品种构建全部合约。
    /// 2. 展开每个合约的活跃交易日写入查找表。
    /// 3. 若同一 (品种, 交易日) 已被其他合约占用，说明日历构建有缺陷，立即失败。
    ///
    /// # Returns
    /// 成功返回索引；出现重复交易日时返回 `ContractError::DuplicateTradeDate`。
    pub fn build(
        registry: &InstrumentRegistry,
        calendar: &TradingCalendar,
    ) -> Result<Self, ContractError> {
        let mut contracts = BTreeMap::new();
        let mut by_trade_date = HashMap::new();

        for instrument in registry.iter() {
            let list = build_contracts(instrument, calendar)?;

            for (position, contract) in list.iter().enumerate() {
                for date in contract.trade_dates() {
                    let key = (instrument.symbol, *date);
                    if let Some(existing) = by_trade_date.insert(key, position) {
                        let first = list
                            .get(existing)
                            .map(|c| c.to_string())
                            .unwrap_or_default();
                        return Err(ContractError::DuplicateTradeDate {
                            symbol: instrument.symbol,
                            date: *date,
                            first,
                            second: contract.to_string(),
                        });
                    }
                }
            }

            debug!("{} contracts built for {}", list.len(), instrument.symbol);
            contracts.insert(instrument.symbol, list);
        }

        Ok(Self {
            contracts,
            by_trade_date,
        })
    }

    /// # Summary
    /// 查找某品种在指定交易日的活跃合约。
    ///
    /// # Returns
    /// 该日没有活跃合约（如超出支持年份或非交易日）时返回 `ContractError::NotFound`。
    pub fn resolve(&self, symbol: Symbol, date: NaiveDate) -> Result<&Contract, ContractError> {
        self.by_trade_date
            .get(&(symbol, date))
            .and_then(|position| self.contracts.get(&symbol)?.get(*position))
            .ok_or(ContractError::NotFound { symbol, date })
    }

    /// 某品种的全部合约，按 (年, 月) 升序
    pub fn contracts(&self, symbol: Symbol) -> &[Contract] {
        self.contracts
            .get(&symbol)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
