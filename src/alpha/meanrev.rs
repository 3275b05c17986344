//! Mean-reversion strategy.
//!
//! Positions are the gap between the running k-day mid-price mean and the current mid-price:
//! buy what fell below its recent average, sell what rose above it. The running sums are warmed
//! up from the history visible on the start date and maintained incrementally.

use std::collections::{HashMap, VecDeque};

use crate::error::{Error, Result};
use crate::store::DataStore;
use crate::types::{DateTime, Position};

use super::{Alpha, AlphaContext};

pub fn build(context: &AlphaContext) -> Result<Box<dyn Alpha>> {
    let k_days = context.param_usize("k")?;
    if k_days == 0 {
        return Err(Error::Configuration(
            "alpha parameter k must be positive".to_string(),
        ));
    }

    let prices = context.data.get(context.price_dataset).ok_or_else(|| {
        Error::Configuration(format!("dataset {} not loaded", context.price_dataset))
    })?;

    let mut mids = HashMap::new();
    for instrument in prices.instruments() {
        let window = prices
            .get(instrument)
            .ok_or_else(|| Error::Configuration(format!("dataset lost {instrument}")))?;
        let recent: VecDeque<f64> = (-(k_days as i64 + 1)..-1)
            .filter_map(|offset| window.get(offset).ok())
            .filter_map(|row| mid_price(&window.schema(), &row))
            .collect();
        mids.insert(instrument.clone(), recent);
    }

    Ok(Box::new(MeanReversion {
        price_dataset: context.price_dataset.to_string(),
        k_days,
        mids,
    }))
}

fn mid_price(schema: &crate::series::Schema, row: &crate::series::Row) -> Option<f64> {
    let buy = row.value(schema.index_of("buy")?)?;
    let sell = row.value(schema.index_of("sell")?)?;
    Some((buy + sell) / 2.0)
}

struct MeanReversion {
    price_dataset: String,
    k_days: usize,
    mids: HashMap<String, VecDeque<f64>>,
}

impl Alpha for MeanReversion {
    fn generate(
        &mut self,
        date: DateTime,
        data: &HashMap<String, DataStore>,
    ) -> Result<Position> {
        let prices = data.get(&self.price_dataset).ok_or_else(|| {
            Error::Configuration(format!("dataset {} not loaded", self.price_dataset))
        })?;

        let mut position = Position::new(date);
        for instrument in prices.instruments() {
            let window = prices.get(instrument).ok_or_else(|| {
                Error::Configuration(format!("dataset {} lost {instrument}", self.price_dataset))
            })?;
            let row = match window.get(-1) {
                Ok(row) => row,
                Err(_) => continue,
            };
            let new = match mid_price(&window.schema(), &row) {
                Some(mid) => mid,
                None => continue,
            };

            let recent = self.mids.entry(instrument.clone()).or_default();
            recent.push_back(new);
            if recent.len() > self.k_days {
                recent.pop_front();
            }
            let mean = recent.iter().sum::<f64>() / recent.len() as f64;
            position.insert(instrument.clone(), mean - new);
        }
        Ok(position)
    }
}
