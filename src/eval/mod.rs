//! Performance indicators computed over simulation results.
//!
//! The [Evaluator] carries a selection of registered indicators and runs them concurrently over
//! one shared, column-encoded copy of the results. Indicators are pure functions of that
//! encoding, so a run is one spawn per indicator plus a channel drain.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::sim::ResultRow;
use crate::types::{DateTime, Position};

/// Result columns an indicator may read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Dates,
    Pnls,
    Costs,
    PositionsRaw,
    PositionsVec,
}

/// Column-encoded simulation results, built once per evaluation and shared by every indicator
/// task.
pub struct EvalInputs {
    pub dates: Vec<DateTime>,
    /// Per-instrument pnl series.
    pub pnls: HashMap<String, Vec<f64>>,
    /// Per-instrument trading-cost series.
    pub costs: HashMap<String, Vec<f64>>,
    /// The strategies' own positions, one per day.
    pub positions_raw: Vec<Position>,
    /// Position vectors over the catalogue instrument order, one per day.
    pub positions_vec: Vec<Vec<f64>>,
}

impl EvalInputs {
    pub fn encode(instruments: &[String], data: &[ResultRow]) -> Self {
        let column = |pick: fn(&ResultRow, &str) -> f64| -> HashMap<String, Vec<f64>> {
            instruments
                .iter()
                .map(|instrument| {
                    (
                        instrument.clone(),
                        data.iter().map(|row| pick(row, instrument)).collect(),
                    )
                })
                .collect()
        };
        Self {
            dates: data.iter().map(|row| row.date).collect(),
            pnls: column(|row, ins| row.pnl.get(ins).copied().unwrap_or(0.0)),
            costs: column(|row, ins| row.cost.get(ins).copied().unwrap_or(0.0)),
            positions_raw: data.iter().map(|row| row.position_raw.clone()).collect(),
            positions_vec: data.iter().map(|row| row.position_vec.clone()).collect(),
        }
    }

    /// Daily pnl summed across instruments.
    fn aggregated_pnls(&self) -> Vec<f64> {
        aggregate(&self.pnls, self.dates.len())
    }

    fn aggregated_costs(&self) -> Vec<f64> {
        aggregate(&self.costs, self.dates.len())
    }
}

fn aggregate(columns: &HashMap<String, Vec<f64>>, days: usize) -> Vec<f64> {
    let mut total = vec![0.0; days];
    for series in columns.values() {
        for (sum, value) in total.iter_mut().zip(series) {
            *sum += value;
        }
    }
    total
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mu = mean(values);
    (values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Value of one indicator. Most indicators reduce to a scalar; distribution-shaped ones report
/// mean and standard deviation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndicatorValue {
    Scalar(f64),
    Stats { mean: f64, std: f64 },
}

/// A registered indicator: its name, the columns it reads, and the computation itself.
#[derive(Debug)]
pub struct Indicator {
    pub name: &'static str,
    /// The columns `compute` reads. Contract metadata only: every task receives the full
    /// encoding, so the computation must hold to this declaration itself.
    pub fields: &'static [Field],
    pub compute: fn(&EvalInputs) -> IndicatorValue,
}

/// Deepest accumulated loss over any interval of the run; zero when pnl never retreats.
fn max_drawdown(inputs: &EvalInputs) -> IndicatorValue {
    let mut accumulated = 0.0;
    let mut peak = 0.0;
    let mut drawdown = 0.0_f64;
    for pnl in inputs.aggregated_pnls() {
        accumulated += pnl;
        drawdown = drawdown.min(accumulated - peak);
        peak = peak.max(accumulated);
    }
    IndicatorValue::Scalar(drawdown)
}

/// Annualized mean daily return.
fn returns(inputs: &EvalInputs) -> IndicatorValue {
    IndicatorValue::Scalar(mean(&inputs.aggregated_pnls()) * TRADING_DAYS_PER_YEAR)
}

fn sharpe(inputs: &EvalInputs) -> IndicatorValue {
    let pnls = inputs.aggregated_pnls();
    IndicatorValue::Scalar(mean(&pnls) / std_dev(&pnls))
}

/// Annualized mean daily trading cost.
fn trading_costs(inputs: &EvalInputs) -> IndicatorValue {
    IndicatorValue::Scalar(mean(&inputs.aggregated_costs()) * TRADING_DAYS_PER_YEAR)
}

/// Distribution of the daily traded volume, half the L1 distance between consecutive position
/// vectors.
fn turnover(inputs: &EvalInputs) -> IndicatorValue {
    let daily: Vec<f64> = inputs
        .positions_vec
        .windows(2)
        .map(|pair| {
            pair[0]
                .iter()
                .zip(&pair[1])
                .map(|(a, b)| (b - a).abs())
                .sum::<f64>()
                / 2.0
        })
        .collect();
    IndicatorValue::Stats {
        mean: mean(&daily),
        std: std_dev(&daily),
    }
}

/// Every indicator shipped with the engine; also the default selection.
pub const INDICATORS_ALL: &[Indicator] = &[
    Indicator {
        name: "max_drawdown",
        fields: &[Field::Pnls],
        compute: max_drawdown,
    },
    Indicator {
        name: "returns",
        fields: &[Field::Pnls],
        compute: returns,
    },
    Indicator {
        name: "sharpe",
        fields: &[Field::Pnls],
        compute: sharpe,
    },
    Indicator {
        name: "trading_costs",
        fields: &[Field::Costs],
        compute: trading_costs,
    },
    Indicator {
        name: "turnover",
        fields: &[Field::PositionsVec],
        compute: turnover,
    },
];

/// Runs a selection of indicators concurrently.
#[derive(Debug)]
pub struct Evaluator {
    indicators: Vec<&'static Indicator>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self {
            indicators: INDICATORS_ALL.iter().collect(),
        }
    }
}

impl Evaluator {
    /// All built-in indicators.
    pub fn new_default() -> Self {
        Self::default()
    }

    /// An explicit indicator table, which may include indicators outside the built-in set.
    pub fn with_table(indicators: Vec<&'static Indicator>) -> Self {
        Self { indicators }
    }

    /// Only the named indicators. Unknown names fail up front, before any simulation work is
    /// spent.
    pub fn with_indicators(names: &[String]) -> Result<Self> {
        let mut indicators = Vec::with_capacity(names.len());
        for name in names {
            let indicator = INDICATORS_ALL
                .iter()
                .find(|indicator| indicator.name == name.as_str())
                .ok_or_else(|| Error::IndicatorNotFound(name.clone()))?;
            indicators.push(indicator);
        }
        Ok(Self { indicators })
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.indicators.iter().map(|i| i.name).collect()
    }

    /// Evaluate every selected indicator over `data`, one task per indicator.
    pub async fn run(
        &self,
        instruments: &[String],
        data: &[ResultRow],
    ) -> HashMap<String, IndicatorValue> {
        let inputs = Arc::new(EvalInputs::encode(instruments, data));
        let (tx, mut rx) = mpsc::unbounded_channel();
        for indicator in &self.indicators {
            let inputs = Arc::clone(&inputs);
            let compute = indicator.compute;
            let name = indicator.name;
            let tx = tx.clone();
            tokio::spawn(async move {
                let _ = tx.send((name, compute(&inputs)));
            });
        }
        drop(tx);

        let mut results = HashMap::with_capacity(self.indicators.len());
        while let Some((name, value)) = rx.recv().await {
            results.insert(name.to_string(), value);
        }
        results
    }
}
