//! Run the shipped strategies over a randomly generated region and print the outcomes.

use std::sync::Arc;

use anyhow::Result;

use alphasim::alpha::AlphaRegistry;
use alphasim::dispatch::Dispatcher;
use alphasim::input::random_region;
use alphasim::market::{MarketCatalog, TradingTarget};
use alphasim::sim::SimConfig;
use alphasim::types::{DateTime, Params};

const DAY: i64 = 86_400;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let catalog = Arc::new(MarketCatalog::builtin());
    let target = TradingTarget::currency("TW");
    let config = catalog
        .get(&target)
        .expect("builtin catalog always knows currency/TW");

    let instruments: Vec<&str> = config.instruments.iter().map(|i| i.as_str()).collect();
    let region = random_region(
        250,
        &instruments,
        &config.base_instrument,
        &config.price_dataset,
    )?;

    let mut meanrev_params = Params::new();
    meanrev_params.insert("k".to_string(), 5.0);

    let configs = vec![
        SimConfig {
            name: "draw-lots-demo".to_string(),
            author: "alphasim".to_string(),
            alpha: "draw_lots".to_string(),
            start_date: DateTime::from(10 * DAY),
            end_date: None,
            target: target.clone(),
            data_list: vec![config.price_dataset.clone()],
            parameters: Params::new(),
        },
        SimConfig {
            name: "mean-reversion-demo".to_string(),
            author: "alphasim".to_string(),
            alpha: "mean_reversion".to_string(),
            start_date: DateTime::from(10 * DAY),
            end_date: None,
            target,
            data_list: vec![config.price_dataset.clone()],
            parameters: meanrev_params,
        },
    ];

    let dispatcher = Dispatcher::new(catalog, Arc::new(AlphaRegistry::builtin()));
    for (name, outcome) in dispatcher.run(&region, configs, false).await {
        match outcome {
            Ok(outcome) => {
                println!("{name}: {} simulated days", outcome.results.len());
                if let Some(indicators) = &outcome.indicators {
                    println!("{}", serde_json::to_string_pretty(indicators)?);
                }
            }
            Err(e) => println!("{name} failed: {e}"),
        }
    }
    Ok(())
}
