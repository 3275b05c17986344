//! Coin-flip strategy, useful as a control when comparing real strategies.

use std::collections::HashMap;

use rand::Rng;

use crate::error::{Error, Result};
use crate::store::DataStore;
use crate::types::{DateTime, Position};

use super::{Alpha, AlphaContext};

pub fn build(context: &AlphaContext) -> Result<Box<dyn Alpha>> {
    Ok(Box::new(DrawLots {
        price_dataset: context.price_dataset.to_string(),
    }))
}

struct DrawLots {
    price_dataset: String,
}

impl Alpha for DrawLots {
    fn generate(
        &mut self,
        date: DateTime,
        data: &HashMap<String, DataStore>,
    ) -> Result<Position> {
        let prices = data.get(&self.price_dataset).ok_or_else(|| {
            Error::Configuration(format!("dataset {} not loaded", self.price_dataset))
        })?;

        let mut rng = rand::thread_rng();
        let mut position = Position::new(date);
        for instrument in prices.instruments() {
            position.insert(instrument.clone(), rng.gen_range(-100..=100) as f64);
        }
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use crate::alpha::testutil::priced_store;
    use crate::alpha::{AlphaContext, AlphaRegistry};
    use crate::types::{DateTime, Params};

    const DAY: i64 = 86_400;

    #[test]
    fn test_that_every_instrument_draws_a_bounded_lot() {
        let (data, _calendar, _key) = priced_store(
            "currency_price_tw",
            &[("USD", &[(1.0, 1.0)]), ("EUR", &[(1.0, 1.0)])],
        );
        let params = Params::new();
        let context = AlphaContext {
            start_date: DateTime::from(DAY),
            price_dataset: "currency_price_tw",
            parameters: &params,
            data: &data,
        };
        let mut alpha = AlphaRegistry::builtin().build("draw_lots", &context).unwrap();
        let position = alpha.generate(DateTime::from(86_400), &data).unwrap();
        for instrument in ["USD", "EUR"] {
            let weight = position.weight(instrument);
            assert!((-100.0..=100.0).contains(&weight));
        }
    }
}
