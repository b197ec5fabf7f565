//! Housekeeper hiring marketplace: REST service and client SDK.

pub mod client;
pub mod config;
pub mod error;
pub mod marketplace;
pub mod telemetry;
