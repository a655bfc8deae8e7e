//! Survey-weighted household debt tables for the 2019 China Household
//! Finance Survey extracts.
//!
//! The pipeline loads the master and linked household tables
//! ([`loader`]), resolves heterogeneous city and province values to
//! canonical registry names ([`normalize`], [`registry`]), aggregates with
//! sample weights ([`weighted`]), and shapes the results into report tables
//! ([`reports`]), some of them carrying map coordinates ([`geo`]).
pub mod config;
pub mod error;
pub mod geo;
pub mod loader;
pub mod normalize;
pub mod output;
pub mod registry;
pub mod reports;
pub mod types;
pub mod util;
pub mod weighted;
