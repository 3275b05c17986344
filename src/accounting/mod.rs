//! Position and cash accounting.
//!
//! An [AccountingModel] turns the day's position and the newly visible price row into
//! per-instrument profit and trading cost. Models are stateful per instrument (previous quantity
//! and mid-price) and pluggable per trading target.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::market::TargetConfig;
use crate::store::DataStore;
use crate::types::Position;

/// Per-instrument pnl and cost for one simulated day.
pub type DailyBook = (HashMap<String, f64>, HashMap<String, f64>);

pub trait AccountingModel: Send {
    /// Compute `(pnl, cost)` from the previous day's position and the latest visible prices.
    /// With `liquidation` set, the day's position is forced into the base instrument first,
    /// modeling a full close-out.
    fn compute(
        &mut self,
        position: &Position,
        prices: &DataStore,
        liquidation: bool,
    ) -> Result<DailyBook>;
}

/// Build the accounting model for a trading target.
pub fn for_target(config: &TargetConfig) -> Box<dyn AccountingModel> {
    match config.target.asset_class {
        crate::market::AssetClass::Currency => Box::new(CurrencyAccounting::new(
            &config.base_instrument,
            config.instruments.clone(),
        )),
    }
}

/// Accounting for currency trading.
///
/// Overall investment size is assumed to always be 1, so pnl reads as a ratio as well. Quantity
/// is the weight divided by the mid-price; cost charges half the quoted spread on the traded
/// quantity difference.
pub struct CurrencyAccounting {
    base_instrument: String,
    instruments: Vec<String>,
    last_quantity: HashMap<String, f64>,
    last_price: HashMap<String, f64>,
}

impl CurrencyAccounting {
    pub fn new(base_instrument: impl Into<String>, instruments: Vec<String>) -> Self {
        Self {
            base_instrument: base_instrument.into(),
            instruments,
            last_quantity: HashMap::new(),
            last_price: HashMap::new(),
        }
    }
}

impl AccountingModel for CurrencyAccounting {
    fn compute(
        &mut self,
        position: &Position,
        prices: &DataStore,
        liquidation: bool,
    ) -> Result<DailyBook> {
        let mut pnl: HashMap<String, f64> =
            self.instruments.iter().map(|i| (i.clone(), 0.0)).collect();
        let mut cost: HashMap<String, f64> =
            self.instruments.iter().map(|i| (i.clone(), 0.0)).collect();

        for instrument in &self.instruments {
            let window = prices.get(instrument).ok_or_else(|| {
                Error::Configuration(format!(
                    "price dataset {} has no instrument {instrument}",
                    prices.name()
                ))
            })?;
            let schema = window.schema();
            let (buy_idx, sell_idx) = match (schema.index_of("buy"), schema.index_of("sell")) {
                (Some(b), Some(s)) => (b, s),
                _ => {
                    return Err(Error::Configuration(format!(
                        "price dataset {} lacks buy/sell fields",
                        prices.name()
                    )))
                }
            };
            let row = window.get(-1)?;
            // A null side means no tradable quote that day: zero contribution, state untouched.
            let (buy, sell) = match (row.value(buy_idx), row.value(sell_idx)) {
                (Some(buy), Some(sell)) => (buy, sell),
                _ => continue,
            };

            let weight = if liquidation {
                if *instrument == self.base_instrument {
                    1.0
                } else {
                    0.0
                }
            } else {
                position.weight(instrument)
            };

            let spread = (sell - buy) / 2.0;
            let mid = buy + spread;
            let quantity = weight / mid;
            let last_quantity = self.last_quantity.get(instrument).copied().unwrap_or(0.0);
            let last_price = self.last_price.get(instrument).copied().unwrap_or(0.0);

            pnl.insert(instrument.clone(), (mid - last_price) * last_quantity);
            cost.insert(
                instrument.clone(),
                ((quantity - last_quantity) * spread).abs(),
            );
            self.last_quantity.insert(instrument.clone(), quantity);
            self.last_price.insert(instrument.clone(), mid);
        }
        Ok((pnl, cost))
    }
}
