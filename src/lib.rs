pub mod baseline;
pub mod catalog;
pub mod deviation;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod latency;
pub mod ledger;
pub mod simulator;
pub mod stress;
pub mod triggers;
pub mod tui;
pub mod types;
pub mod web;
