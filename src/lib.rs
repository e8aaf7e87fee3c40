pub mod bucket;
pub mod config;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod output;
pub mod parser;
pub mod scan;
pub mod services;
pub mod snapshot;
