//! Instrument-keyed collections of windows and the per-region data bundle.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::series::TimeSeries;
use crate::types::DateTime;
use crate::window::{AccessKey, Calendar, TimeWindow};

/// All windows of one dataset, keyed by instrument, mutated uniformly under one key and one
/// shared calendar.
#[derive(Debug, Clone)]
pub struct DataStore {
    name: String,
    windows: HashMap<String, TimeWindow>,
}

impl DataStore {
    pub fn new(name: impl Into<String>, data: HashMap<String, TimeSeries>) -> Self {
        Self {
            name: name.into(),
            windows: data
                .into_iter()
                .map(|(instrument, series)| (instrument, TimeWindow::new(series)))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, instrument: &str) -> Option<&TimeWindow> {
        self.windows.get(instrument)
    }

    pub fn instruments(&self) -> impl Iterator<Item = &String> {
        self.windows.keys()
    }

    pub fn set_key(&self, key: &AccessKey) -> Result<()> {
        for window in self.windows.values() {
            window.set_key(key)?;
        }
        Ok(())
    }

    pub fn advance(&self, key: Option<&AccessKey>) -> Result<()> {
        for window in self.windows.values() {
            window.advance(key)?;
        }
        Ok(())
    }

    pub fn seek(&self, target: DateTime, key: Option<&AccessKey>) -> Result<()> {
        for window in self.windows.values() {
            window.seek(target, key)?;
        }
        Ok(())
    }

    pub fn synchronize(&self, calendar: &Calendar, key: Option<&AccessKey>) -> Result<()> {
        for window in self.windows.values() {
            window.synchronize(calendar, key)?;
        }
        Ok(())
    }

    /// Bulk append of newly ingested rows. Dataset identity must match.
    pub fn extend(&self, other: &DataStore, key: Option<&AccessKey>) -> Result<()> {
        if self.name != other.name {
            return Err(Error::Configuration(format!(
                "cannot extend dataset {} with rows from {}",
                self.name, other.name
            )));
        }
        for (instrument, update) in &other.windows {
            match self.windows.get(instrument) {
                Some(window) => window.extend(update, key)?,
                None => {
                    return Err(Error::Configuration(format!(
                        "dataset {} has no instrument {instrument}",
                        self.name
                    )))
                }
            }
        }
        Ok(())
    }

    /// Independent copy with no keys installed, every window rebound to `calendar`.
    pub fn deep_clone(&self, calendar: Option<&Calendar>) -> Self {
        Self {
            name: self.name.clone(),
            windows: self
                .windows
                .iter()
                .map(|(instrument, window)| (instrument.clone(), window.deep_clone(calendar)))
                .collect(),
        }
    }
}

/// Everything one simulation consumes for a region: the calendar, the price dataset of the
/// trading target, and the auxiliary datasets named in the configuration.
#[derive(Debug, Clone)]
pub struct RegionData {
    pub calendar: Calendar,
    pub price: DataStore,
    pub others: HashMap<String, DataStore>,
}

impl RegionData {
    pub fn new(calendar: Calendar, price: DataStore, others: HashMap<String, DataStore>) -> Self {
        Self {
            calendar,
            price,
            others,
        }
    }

    /// Synchronize every dataset against the region calendar. Run once at load, before any key
    /// is installed.
    pub fn synchronize(&self) -> Result<()> {
        self.price.synchronize(&self.calendar, None)?;
        for dataset in self.others.values() {
            dataset.synchronize(&self.calendar, None)?;
        }
        Ok(())
    }

    /// Fully independent copy for one simulation run: fresh calendar, every window rebound to
    /// it, no keys installed. Concurrent simulations never share a mutable store.
    pub fn deep_clone(&self) -> Self {
        let calendar = self.calendar.deep_clone(None);
        Self {
            price: self.price.deep_clone(Some(&calendar)),
            others: self
                .others
                .iter()
                .map(|(name, dataset)| (name.clone(), dataset.deep_clone(Some(&calendar))))
                .collect(),
            calendar,
        }
    }
}
