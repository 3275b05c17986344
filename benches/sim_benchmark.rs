use criterion::{criterion_group, criterion_main, Criterion};

use alphasim::alpha::AlphaRegistry;
use alphasim::dispatch::Dispatcher;
use alphasim::input::random_region;
use alphasim::market::{MarketCatalog, TradingTarget};
use alphasim::sim::{SimConfig, Simulator};
use alphasim::types::{DateTime, Params};

use std::sync::Arc;

const DAY: i64 = 86_400;

fn config(name: &str) -> SimConfig {
    let mut parameters = Params::new();
    parameters.insert("k".to_string(), 5.0);
    SimConfig {
        name: name.to_string(),
        author: "bench".to_string(),
        alpha: "mean_reversion".to_string(),
        start_date: DateTime::from(10 * DAY),
        end_date: None,
        target: TradingTarget::currency("TW"),
        data_list: vec!["currency_price_tw".to_string()],
        parameters,
    }
}

pub fn full_simulation_random_data() {
    let catalog = MarketCatalog::builtin();
    let target = catalog.get(&TradingTarget::currency("TW")).unwrap();
    let instruments: Vec<&str> = target.instruments.iter().map(|i| i.as_str()).collect();
    let region = random_region(
        250,
        &instruments,
        &target.base_instrument,
        &target.price_dataset,
    )
    .unwrap();

    let simulator = Simulator::new(config("bench"), region.deep_clone(), &catalog).unwrap();
    simulator.run(&AlphaRegistry::builtin()).unwrap();
}

fn dispatch_batch() {
    let catalog = Arc::new(MarketCatalog::builtin());
    let target = catalog.get(&TradingTarget::currency("TW")).unwrap();
    let instruments: Vec<&str> = target.instruments.iter().map(|i| i.as_str()).collect();
    let region = random_region(
        100,
        &instruments,
        &target.base_instrument,
        &target.price_dataset,
    )
    .unwrap();

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let dispatcher = Dispatcher::new(Arc::clone(&catalog), Arc::new(AlphaRegistry::builtin()));
    let configs = (0..4).map(|i| config(&format!("bench-{i}"))).collect();
    runtime.block_on(async {
        dispatcher.run(&region, configs, false).await;
    });
}

fn benchmarks(c: &mut Criterion) {
    c.bench_function("full simulation", |b| b.iter(full_simulation_random_data));
    c.bench_function("dispatch batch", |b| b.iter(dispatch_batch));
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
