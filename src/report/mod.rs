//! Report generation modules.
//!
//! This module renders a finished analysis run as Markdown or JSON.

pub mod generator;

pub use generator::*;
