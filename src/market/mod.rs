//! Trading-target catalogue.
//!
//! The tables describing what can be traded where live in one explicitly constructed
//! [MarketCatalog] with process-wide read-only lifetime, built before any worker starts and
//! passed down, never consulted through globals.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Currency,
}

/// What is traded and where, for example currency in the TW region.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradingTarget {
    pub asset_class: AssetClass,
    pub region: String,
}

impl TradingTarget {
    pub fn currency(region: impl Into<String>) -> Self {
        Self {
            asset_class: AssetClass::Currency,
            region: region.into(),
        }
    }
}

impl std::fmt::Display for TradingTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.asset_class {
            AssetClass::Currency => write!(f, "currency/{}", self.region),
        }
    }
}

/// Per-target trading tables.
///
/// The instrument order is load-bearing: it defines the vector encoding of positions.
#[derive(Clone, Debug)]
pub struct TargetConfig {
    pub target: TradingTarget,
    pub instruments: Vec<String>,
    pub price_dataset: String,
    /// The instrument positions collapse into on liquidation; for currency targets, the
    /// official currency of the region.
    pub base_instrument: String,
}

#[derive(Clone, Debug, Default)]
pub struct MarketCatalog {
    targets: HashMap<TradingTarget, TargetConfig>,
}

impl MarketCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The targets the system trades out of the box.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.insert(TargetConfig {
            target: TradingTarget::currency("TW"),
            instruments: vec![
                "TWD".to_string(),
                "USD".to_string(),
                "EUR".to_string(),
                "JPY".to_string(),
                "GBP".to_string(),
            ],
            price_dataset: "currency_price_tw".to_string(),
            base_instrument: "TWD".to_string(),
        });
        catalog
    }

    pub fn insert(&mut self, config: TargetConfig) {
        self.targets.insert(config.target.clone(), config);
    }

    pub fn get(&self, target: &TradingTarget) -> Option<&TargetConfig> {
        self.targets.get(target)
    }
}
