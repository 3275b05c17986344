//! # How does alphasim work?
//!
//! The development goal is a simple backtesting engine for daily trading strategies that makes
//! lookahead bias structurally impossible rather than a matter of discipline.
//!
//! A backtest is composed of three layers. At the bottom sits the point-in-time data layer:
//! every dataset is held behind a [TimeWindow](window::TimeWindow) that exposes history through
//! negative relative indices only, with index 0 reserved for the still-unknown current day.
//! Moving that boundary requires the [AccessKey](window::AccessKey) minted by the simulation
//! engine, so strategy code can read whatever it likes but can never advance time or peek at
//! tomorrow. All datasets of a region are merge-joined against one trading-day calendar before
//! any simulation starts, which gives every window the same shape and lets missing observations
//! surface as null rows instead of silently shifting indices.
//!
//! On top of that, the [Simulator](sim::Simulator) replays the calendar one day at a time: ask
//! the strategy for a position, make the day's prices visible, then mark the previous position
//! against them through an [AccountingModel](accounting::AccountingModel). The final day of a
//! run is treated as a forced liquidation into the base instrument of the trading target.
//!
//! The outer layer is throughput plumbing. The [Dispatcher](dispatch::Dispatcher) runs a batch
//! of simulations concurrently, each over its own deep-cloned copy of the region data, and the
//! [Evaluator](eval::Evaluator) reduces results to performance indicators, either in-process or
//! behind the HTTP service in [http]. Everything that crosses a task or wire boundary is plain
//! serde data.
//!
//! Strategies implement [Alpha](alpha::Alpha) and are registered by name in an
//! [AlphaRegistry](alpha::AlphaRegistry); the shipped ones double as templates.

pub mod accounting;
pub mod alpha;
pub mod dispatch;
pub mod error;
pub mod eval;
pub mod http;
pub mod input;
pub mod market;
pub mod series;
pub mod sim;
pub mod store;
pub mod types;
pub mod window;
