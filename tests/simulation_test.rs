use std::sync::Arc;

use alphasim::alpha::AlphaRegistry;
use alphasim::dispatch::Dispatcher;
use alphasim::input::random_region;
use alphasim::market::{MarketCatalog, TradingTarget};
use alphasim::sim::{SimConfig, Simulator};
use alphasim::types::{DateTime, Params};

const DAY: i64 = 86_400;

fn mean_reversion_config(name: &str, k: f64) -> SimConfig {
    let mut parameters = Params::new();
    parameters.insert("k".to_string(), k);
    SimConfig {
        name: name.to_string(),
        author: "integration".to_string(),
        alpha: "mean_reversion".to_string(),
        start_date: DateTime::from(20 * DAY),
        end_date: None,
        target: TradingTarget::currency("TW"),
        data_list: vec!["currency_price_tw".to_string()],
        parameters,
    }
}

#[test]
fn meanreversion_integration_test() {
    env_logger::init();
    let catalog = MarketCatalog::builtin();
    let target = catalog.get(&TradingTarget::currency("TW")).unwrap();
    let instruments: Vec<&str> = target.instruments.iter().map(|i| i.as_str()).collect();
    let region = random_region(
        200,
        &instruments,
        &target.base_instrument,
        &target.price_dataset,
    )
    .unwrap();

    let simulator =
        Simulator::new(mean_reversion_config("full-run", 5.0), region, &catalog).unwrap();
    let results = simulator.run(&AlphaRegistry::builtin()).unwrap();

    // Simulating from day 20 to the calendar end produces one row per remaining day.
    assert_eq!(results.len(), 180);
    assert_eq!(results.first().unwrap().date, DateTime::from(21 * DAY));
    assert_eq!(results.last().unwrap().date, DateTime::from(200 * DAY));

    // Positions stay normalized: absolute weights sum to 1 over the target instruments.
    for row in &results {
        let gross: f64 = row.position_vec.iter().map(|w| w.abs()).sum();
        assert!((gross - 1.0).abs() < 1e-9, "gross exposure {gross}");
    }
}

#[tokio::test]
async fn dispatcher_integration_test() {
    let catalog = Arc::new(MarketCatalog::builtin());
    let target = catalog.get(&TradingTarget::currency("TW")).unwrap();
    let instruments: Vec<&str> = target.instruments.iter().map(|i| i.as_str()).collect();
    let region = random_region(
        150,
        &instruments,
        &target.base_instrument,
        &target.price_dataset,
    )
    .unwrap();

    let dispatcher = Dispatcher::new(Arc::clone(&catalog), Arc::new(AlphaRegistry::builtin()));
    let configs = vec![
        mean_reversion_config("k2", 2.0),
        mean_reversion_config("k5", 5.0),
        mean_reversion_config("k10", 10.0),
    ];
    let outcomes = dispatcher.run(&region, configs, false).await;

    assert_eq!(outcomes.len(), 3);
    for (name, outcome) in &outcomes {
        let outcome = outcome
            .as_ref()
            .unwrap_or_else(|e| panic!("{name} failed: {e}"));
        assert_eq!(outcome.results.len(), 130);
        let indicators = outcome.indicators.as_ref().unwrap();
        for indicator in ["max_drawdown", "returns", "sharpe", "trading_costs", "turnover"] {
            assert!(indicators.contains_key(indicator), "{name} missing {indicator}");
        }
    }

    // The shared region was never mutated: a fresh simulation over it still works.
    let simulator =
        Simulator::new(mean_reversion_config("after", 3.0), region, &catalog).unwrap();
    assert!(simulator.run(&AlphaRegistry::builtin()).is_ok());
}
