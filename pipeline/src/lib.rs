pub mod config;
pub mod cycle;
pub mod db;
pub mod history;
pub mod market;
pub mod metrics;
pub mod pricing;
pub mod resolve;
pub mod source;
pub mod table;

pub mod error;
pub mod normalize;
pub mod time;
