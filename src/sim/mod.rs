//! Day-by-day simulation of one strategy over one region.
//!
//! The [Simulator] owns an isolated [RegionData] copy, installs its freshly minted [AccessKey]
//! on every window, and replays the calendar one trading day at a time: ask the strategy for a
//! position, make the day's prices visible, then mark the position against them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::accounting::{self, AccountingModel};
use crate::alpha::{AlphaContext, AlphaRegistry};
use crate::error::{Error, Result};
use crate::market::{MarketCatalog, TargetConfig, TradingTarget};
use crate::store::{DataStore, RegionData};
use crate::types::{DateTime, Params, Position};
use crate::window::AccessKey;

/// One simulation request: which strategy to run, where, over which dates, with which data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    /// Identifies the run in dispatcher output.
    pub name: String,
    pub author: String,
    /// Registered strategy name.
    pub alpha: String,
    pub start_date: DateTime,
    /// Defaults to the last known trading day; later dates are clamped to it.
    pub end_date: Option<DateTime>,
    pub target: TradingTarget,
    /// Datasets the strategy may read, by name.
    pub data_list: Vec<String>,
    #[serde(default)]
    pub parameters: Params,
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Configuration("simulation name is empty".to_string()));
        }
        if self.alpha.is_empty() {
            return Err(Error::Configuration(format!(
                "simulation {} names no alpha",
                self.name
            )));
        }
        if self.data_list.is_empty() {
            return Err(Error::Configuration(format!(
                "simulation {} loads no data",
                self.name
            )));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(Error::Configuration(format!(
                    "simulation {} ends ({end}) before it starts ({})",
                    self.name, self.start_date
                )));
            }
        }
        Ok(())
    }
}

/// One simulated day in the output: realized pnl and cost per instrument, plus the position
/// that produced them, both raw and encoded over the catalogue instrument order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResultRow {
    pub date: DateTime,
    pub pnl: HashMap<String, f64>,
    pub cost: HashMap<String, f64>,
    pub position_raw: Position,
    pub position_vec: Vec<f64>,
}

pub struct Simulator {
    config: SimConfig,
    target: TargetConfig,
    region: RegionData,
    /// Datasets visible to the strategy; shares windows with `region.others`.
    alpha_data: HashMap<String, DataStore>,
    accounting: Box<dyn AccountingModel>,
    key: AccessKey,
    end_date: DateTime,
}

impl Simulator {
    /// Take ownership of an isolated region copy and position every window on the start date.
    ///
    /// `region` must not be shared with any other simulation; use [RegionData::deep_clone].
    pub fn new(config: SimConfig, region: RegionData, catalog: &MarketCatalog) -> Result<Self> {
        config.validate()?;
        let target = catalog
            .get(&config.target)
            .ok_or_else(|| {
                Error::Configuration(format!("unknown trading target {}", config.target))
            })?
            .clone();

        let last_workday = region.calendar.last_date().ok_or_else(|| {
            Error::Configuration(format!("region {} has an empty calendar", config.target))
        })?;
        let end_date = match config.end_date {
            Some(end) if end < last_workday => end,
            _ => last_workday,
        };

        let mut alpha_data = HashMap::new();
        for name in &config.data_list {
            let store = match region.others.get(name) {
                Some(store) => store.clone(),
                // The price dataset is always available even when the loader did not place an
                // independent copy under `others`.
                None if *name == target.price_dataset => {
                    region.price.deep_clone(Some(&region.calendar))
                }
                None => {
                    return Err(Error::Configuration(format!(
                        "dataset {name} is not loaded for region {}",
                        target.target
                    )))
                }
            };
            alpha_data.insert(name.clone(), store);
        }

        let key = AccessKey::mint();
        region.calendar.set_key(&key)?;
        region.calendar.seek(config.start_date, Some(&key))?;
        region.price.set_key(&key)?;
        region.price.seek(config.start_date, Some(&key))?;
        for store in alpha_data.values() {
            store.set_key(&key)?;
            store.seek(config.start_date, Some(&key))?;
        }

        let accounting = accounting::for_target(&target);
        Ok(Self {
            config,
            target,
            region,
            alpha_data,
            accounting,
            key,
            end_date,
        })
    }

    /// Make the next trading day's rows visible everywhere.
    fn advance(&self) -> Result<()> {
        for store in self.alpha_data.values() {
            store.advance(Some(&self.key))?;
        }
        self.region.price.advance(Some(&self.key))?;
        self.region.calendar.advance(Some(&self.key))?;
        Ok(())
    }

    /// Run the simulation to its end date and return one [ResultRow] per trading day.
    pub fn run(mut self, registry: &AlphaRegistry) -> Result<Vec<ResultRow>> {
        let context = AlphaContext {
            start_date: self.config.start_date,
            price_dataset: &self.target.price_dataset,
            parameters: &self.config.parameters,
            data: &self.alpha_data,
        };
        let mut alpha = registry.build(&self.config.alpha, &context)?;

        let mut results = Vec::new();
        loop {
            let today = match self.region.calendar.today() {
                Some(date) if date < self.end_date => date,
                _ => break,
            };

            let mut position = alpha.generate(today, &self.alpha_data)?;
            position.normalize()?;
            if !position.is_tradable(&self.target.instruments) {
                return Err(Error::InvalidPosition {
                    date: today,
                    reason: format!(
                        "position holds instruments outside target {}",
                        self.target.target
                    ),
                });
            }

            self.advance()?;
            let marked = self.region.calendar.today().ok_or_else(|| {
                Error::OutOfRange(format!("calendar ran out after {today}"))
            })?;

            let liquidation = marked == self.end_date;
            let (pnl, cost) =
                self.accounting
                    .compute(&position, &self.region.price, liquidation)?;
            let position_vec = position.to_vec(&self.target.instruments);
            results.push(ResultRow {
                date: marked,
                pnl,
                cost,
                position_raw: position,
                position_vec,
            });
        }
        Ok(results)
    }
}
