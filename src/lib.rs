//! Changewatch - change detection for performance test results
//!
//! This library decides whether the newest data points of a tracked
//! variable represent a real shift. It ships a fixed threshold model, a
//! relative difference model and an e-divisive model backed by an external
//! tool, a registry resolving configured model identifiers, and a driver
//! that runs a variable's models over its history.

pub mod cli;
pub mod config;
pub mod descriptor;
pub mod driver;
pub mod error;
pub mod models;
pub mod registry;
pub mod stats;
pub mod types;
