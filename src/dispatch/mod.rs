//! Concurrent execution of simulation batches.
//!
//! The [Dispatcher] runs each submitted [SimConfig] as its own task over a deep-cloned
//! [RegionData], so runs never share mutable state, and reassembles the outcomes in submission
//! order. A failed simulation reports its error in place without disturbing the rest of the
//! batch.

use std::collections::HashMap;
use std::sync::Arc;

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::alpha::AlphaRegistry;
use crate::error::{Error, Result};
use crate::eval::{Evaluator, IndicatorValue};
use crate::market::MarketCatalog;
use crate::sim::{ResultRow, SimConfig, Simulator};
use crate::store::RegionData;

/// Everything one simulation run produced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimOutcome {
    pub name: String,
    /// Instrument order of the trading target; gives meaning to `position_vec` columns.
    pub instruments: Vec<String>,
    pub results: Vec<ResultRow>,
    /// Absent when evaluation was skipped.
    pub indicators: Option<HashMap<String, IndicatorValue>>,
}

#[derive(Clone)]
pub struct Dispatcher {
    catalog: Arc<MarketCatalog>,
    registry: Arc<AlphaRegistry>,
}

impl Dispatcher {
    pub fn new(catalog: Arc<MarketCatalog>, registry: Arc<AlphaRegistry>) -> Self {
        Self { catalog, registry }
    }

    /// Run every config concurrently against its own copy of `region`. The returned vector
    /// lines up with `configs`; each slot carries that run's outcome or its error.
    pub async fn run(
        &self,
        region: &RegionData,
        configs: Vec<SimConfig>,
        skip_evaluation: bool,
    ) -> Vec<(String, Result<SimOutcome>)> {
        let mut handles = Vec::with_capacity(configs.len());
        for config in configs {
            let name = config.name.clone();
            let region = region.deep_clone();
            let catalog = Arc::clone(&self.catalog);
            let registry = Arc::clone(&self.registry);
            let handle = tokio::spawn(async move {
                simulate(config, region, &catalog, &registry, skip_evaluation).await
            });
            handles.push((name, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => Err(Error::Configuration(format!(
                    "simulation {name} aborted: {join_error}"
                ))),
            };
            match &outcome {
                Ok(_) => info!("simulation {name} finished"),
                Err(e) => error!("simulation {name} failed: {e}"),
            }
            outcomes.push((name, outcome));
        }
        outcomes
    }
}

async fn simulate(
    config: SimConfig,
    region: RegionData,
    catalog: &MarketCatalog,
    registry: &AlphaRegistry,
    skip_evaluation: bool,
) -> Result<SimOutcome> {
    let name = config.name.clone();
    let target = catalog
        .get(&config.target)
        .ok_or_else(|| Error::Configuration(format!("unknown trading target {}", config.target)))?;
    let instruments = target.instruments.clone();

    let simulator = Simulator::new(config, region, catalog)?;
    let results = simulator.run(registry)?;

    let indicators = if skip_evaluation {
        None
    } else {
        Some(Evaluator::new_default().run(&instruments, &results).await)
    };

    Ok(SimOutcome {
        name,
        instruments,
        results,
        indicators,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::Dispatcher;
    use crate::alpha::AlphaRegistry;
    use crate::market::{MarketCatalog, TargetConfig, TradingTarget};
    use crate::series::{Row, Schema, TimeSeries};
    use crate::sim::SimConfig;
    use crate::store::{DataStore, RegionData};
    use crate::types::{DateTime, Params};
    use crate::window::TimeWindow;

    const DAY: i64 = 86_400;

    fn region(days: i64) -> RegionData {
        let dates: Vec<DateTime> = (1..=days).map(|d| DateTime::from(d * DAY)).collect();
        let calendar = TimeWindow::from_dates("workdays", dates).unwrap();
        let mut data = HashMap::new();
        for (instrument, base) in [("TWD", 1.0), ("USD", 30.0)] {
            let mut series = TimeSeries::new(Schema::new(
                "currency_price_tw",
                vec!["buy".to_string(), "sell".to_string()],
            ));
            for day in 1..=days {
                // Linear drift keeps every mean-reversion window strictly off its mean.
                let quote = base * (1.0 + 0.01 * day as f64);
                series
                    .push(Row::new(day * DAY, vec![Some(quote), Some(quote)]))
                    .unwrap();
            }
            data.insert(instrument.to_string(), series);
        }
        let price = DataStore::new("currency_price_tw", data);
        let region = RegionData::new(calendar, price, HashMap::new());
        region.synchronize().unwrap();
        region
    }

    fn catalog() -> Arc<MarketCatalog> {
        let mut catalog = MarketCatalog::new();
        catalog.insert(TargetConfig {
            target: TradingTarget::currency("TW"),
            instruments: vec!["TWD".to_string(), "USD".to_string()],
            price_dataset: "currency_price_tw".to_string(),
            base_instrument: "TWD".to_string(),
        });
        Arc::new(catalog)
    }

    fn config(name: &str, alpha: &str, k: f64) -> SimConfig {
        let mut parameters = Params::new();
        parameters.insert("k".to_string(), k);
        SimConfig {
            name: name.to_string(),
            author: "tester".to_string(),
            alpha: alpha.to_string(),
            start_date: DateTime::from(3 * DAY),
            end_date: None,
            target: TradingTarget::currency("TW"),
            data_list: vec!["currency_price_tw".to_string()],
            parameters,
        }
    }

    #[tokio::test]
    async fn test_that_concurrent_runs_come_back_in_submission_order() {
        let dispatcher = Dispatcher::new(catalog(), Arc::new(AlphaRegistry::builtin()));
        let region = region(10);
        let configs = vec![
            config("first", "mean_reversion", 2.0),
            config("second", "mean_reversion", 3.0),
            config("third", "mean_reversion", 4.0),
        ];

        let outcomes = dispatcher.run(&region, configs, true).await;
        assert_eq!(outcomes.len(), 3);
        let names: Vec<&str> = outcomes.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        for (_, outcome) in &outcomes {
            let outcome = outcome.as_ref().unwrap();
            assert_eq!(outcome.results.len(), 7);
            assert!(outcome.indicators.is_none());
        }
    }

    #[tokio::test]
    async fn test_that_one_failing_run_does_not_poison_the_batch() {
        let dispatcher = Dispatcher::new(catalog(), Arc::new(AlphaRegistry::builtin()));
        let region = region(6);
        let configs = vec![
            config("good", "mean_reversion", 2.0),
            config("bad", "no_such_alpha", 2.0),
        ];

        let outcomes = dispatcher.run(&region, configs, true).await;
        assert!(outcomes[0].1.is_ok());
        assert!(outcomes[1].1.is_err());
    }

    #[tokio::test]
    async fn test_that_evaluation_attaches_default_indicators() {
        let dispatcher = Dispatcher::new(catalog(), Arc::new(AlphaRegistry::builtin()));
        let region = region(8);
        let outcomes = dispatcher
            .run(&region, vec![config("run", "mean_reversion", 2.0)], false)
            .await;
        let outcome = outcomes[0].1.as_ref().unwrap();
        let indicators = outcome.indicators.as_ref().unwrap();
        assert!(indicators.contains_key("sharpe"));
        assert!(indicators.contains_key("max_drawdown"));
    }

    #[tokio::test]
    async fn test_that_the_source_region_stays_untouched() {
        let dispatcher = Dispatcher::new(catalog(), Arc::new(AlphaRegistry::builtin()));
        let region = region(6);
        dispatcher
            .run(&region, vec![config("run", "mean_reversion", 2.0)], true)
            .await;

        // No simulation key leaked into the shared region; installing one still works.
        let key = crate::window::AccessKey::mint();
        region.calendar.set_key(&key).unwrap();
        assert_eq!(region.price.get("USD").unwrap().len(), 6);
    }
}
