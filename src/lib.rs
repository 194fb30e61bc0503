pub mod api;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod database;
pub mod embeddings;
pub mod errors;
pub mod loader;
pub mod logging;
pub mod models;
pub mod ranking;
pub mod retrieval;

#[cfg(test)]
mod errors_tests;

pub use config::AppConfig;
pub use errors::*;
