//! Analysis modules.
//!
//! This module turns the raw tables from `data` into the derived series
//! the charts and the report consume: per-country aggregation, daily
//! changes, rolling means, and the cross-dataset statistics.

pub mod stats;
pub mod timeseries;

pub use stats::*;
pub use timeseries::*;
