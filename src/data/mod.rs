//! Data acquisition modules.
//!
//! This module downloads the public COVID-19 source files and parses them
//! into the in-memory tables the analysis works on.

pub mod downloader;
pub mod loader;

pub use downloader::{download_datasets, DownloadOptions};
pub use loader::{load_datasets, Datasets};
