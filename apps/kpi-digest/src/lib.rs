pub mod catalog;
pub mod chart;
pub mod cli;
pub mod config;
pub mod deck;
pub mod digest;
pub mod error;
pub mod sampling;
pub mod source;
pub mod telemetry;
