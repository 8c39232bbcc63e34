// src/lib.rs

pub mod audit;
pub mod clean;
pub mod config;
pub mod enrich;
pub mod error;
pub mod export;
pub mod fetch;
pub mod ingest;
pub mod inject;
pub mod pipeline;
pub mod sources;
pub mod store;
pub mod table;

#[cfg(test)]
mod testutil;

pub use error::PipelineError;
pub use table::{Column, Table, Value};
