//! Peachtree Housing Market ETL Library
//!
//! This library provides the components for the peachtree housing-market
//! pipeline: fetching listing and sale events for the metro Atlanta counties,
//! cleaning and aggregating them, and synchronizing the results into SQLite.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod persistence;
pub mod pipeline;
