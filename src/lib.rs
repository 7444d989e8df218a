//! Railway station import and nearest-station lookup

pub mod config;
pub mod contracts;
pub mod database;
pub mod errors;
pub mod geo;
pub mod http;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod query;
pub mod shutdown;
