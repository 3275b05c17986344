//! Trading strategies and their registry.
//!
//! An [Alpha] looks at the data visible today and proposes a [Position]. Strategies are
//! constructed through registered [AlphaBuilder] functions so a simulation request can name its
//! strategy as a string.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::store::DataStore;
use crate::types::{DateTime, Params, Position};

pub mod bandwagon;
pub mod drawlots;
pub mod meanrev;

/// A trading strategy. Called once per simulated day, in date order, with the data windows
/// already positioned on that day.
pub trait Alpha: Send {
    fn generate(
        &mut self,
        date: DateTime,
        data: &HashMap<String, DataStore>,
    ) -> Result<Position>;
}

/// Everything a builder may need: the simulation start date, the name of the price dataset of
/// the trading target, the request parameters, and the data windows positioned on the start
/// date (for warm-up).
pub struct AlphaContext<'a> {
    pub start_date: DateTime,
    pub price_dataset: &'a str,
    pub parameters: &'a Params,
    pub data: &'a HashMap<String, DataStore>,
}

impl AlphaContext<'_> {
    /// Fetch a required numeric parameter.
    pub fn param(&self, name: &str) -> Result<f64> {
        self.parameters
            .get(name)
            .copied()
            .ok_or_else(|| Error::Configuration(format!("missing alpha parameter {name}")))
    }

    /// Fetch a required parameter that must be a non-negative whole number.
    pub fn param_usize(&self, name: &str) -> Result<usize> {
        let value = self.param(name)?;
        if value < 0.0 || value.fract() != 0.0 {
            return Err(Error::Configuration(format!(
                "alpha parameter {name} must be a non-negative integer, got {value}"
            )));
        }
        Ok(value as usize)
    }
}

pub type AlphaBuilder = fn(&AlphaContext) -> Result<Box<dyn Alpha>>;

/// Name-to-builder table, fixed before any simulation starts.
#[derive(Clone, Default)]
pub struct AlphaRegistry {
    builders: HashMap<String, AlphaBuilder>,
}

impl AlphaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The strategies shipped with the engine.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.insert("bandwagon", bandwagon::build);
        registry.insert("mean_reversion", meanrev::build);
        registry.insert("draw_lots", drawlots::build);
        registry
    }

    pub fn insert(&mut self, name: impl Into<String>, builder: AlphaBuilder) {
        self.builders.insert(name.into(), builder);
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.builders.keys()
    }

    pub fn build(&self, name: &str, context: &AlphaContext) -> Result<Box<dyn Alpha>> {
        match self.builders.get(name) {
            Some(builder) => builder(context),
            None => Err(Error::Configuration(format!("unknown alpha {name}"))),
        }
    }
}


#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{AlphaContext, AlphaRegistry};
    use crate::types::Params;

    #[test]
    fn test_that_unknown_alpha_is_a_configuration_error() {
        let registry = AlphaRegistry::builtin();
        let params = Params::new();
        let data = HashMap::new();
        let context = AlphaContext {
            start_date: crate::types::DateTime::from(86_400),
            price_dataset: "currency_price_tw",
            parameters: &params,
            data: &data,
        };
        assert!(registry.build("no_such_alpha", &context).is_err());
    }

    #[test]
    fn test_that_builtin_registry_lists_shipped_strategies() {
        let registry = AlphaRegistry::builtin();
        let names: Vec<&String> = registry.names().collect();
        assert!(names.iter().any(|n| *n == "bandwagon"));
        assert!(names.iter().any(|n| *n == "mean_reversion"));
        assert!(names.iter().any(|n| *n == "draw_lots"));
    }

    #[test]
    fn test_that_fractional_window_parameters_are_rejected() {
        let mut params = Params::new();
        params.insert("window".to_string(), 2.5);
        let data = HashMap::new();
        let context = AlphaContext {
            start_date: crate::types::DateTime::from(86_400),
            price_dataset: "currency_price_tw",
            parameters: &params,
            data: &data,
        };
        assert!(context.param_usize("window").is_err());
        assert!(context.param("rate").is_err());
    }
}
