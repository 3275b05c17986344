//! Momentum-following strategy.
//!
//! When an instrument has risen or fallen for `window` consecutive days and the accumulated
//! change rate exceeds `rate`, take a position proportional to that rate.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::store::DataStore;
use crate::types::{DateTime, Position};

use super::{Alpha, AlphaContext};

pub fn build(context: &AlphaContext) -> Result<Box<dyn Alpha>> {
    Ok(Box::new(Bandwagon {
        price_dataset: context.price_dataset.to_string(),
        window: context.param_usize("window")?,
        rate: context.param("rate")?,
    }))
}

struct Bandwagon {
    price_dataset: String,
    window: usize,
    rate: f64,
}

fn monotone(buys: &[f64]) -> bool {
    buys.windows(2).all(|pair| pair[0] < pair[1]) || buys.windows(2).all(|pair| pair[0] > pair[1])
}

impl Alpha for Bandwagon {
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
            let buy_idx = match window.schema().index_of("buy") {
                Some(idx) => idx,
                None => continue,
            };

            // Last window + 1 quotes; any gap or missing history rules the instrument out.
            let mut buys = Vec::with_capacity(self.window + 1);
            for offset in -(self.window as i64 + 1)..0 {
                match window.get(offset) {
                    Ok(row) => match row.value(buy_idx) {
                        Some(buy) => buys.push(buy),
                        None => break,
                    },
                    Err(_) => break,
                }
            }
            if buys.len() != self.window + 1 {
                continue;
            }

            let rate = (buys[self.window] - buys[0]) / buys[0];
            if monotone(&buys) && rate.abs() >= self.rate {
                position.insert(instrument.clone(), rate);
            }
        }
        Ok(position)
    }
}
