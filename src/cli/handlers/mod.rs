//! CLI command handlers module
//!
//! This module is organized by functional domains:
//! - init: Database schema initialization
//! - data: Import, sample data and single-joke additions
//! - search: Search and feedback
//! - serve: API server
//! - info: Information display (stats, config)

pub mod data;
pub mod info;
pub mod init;
pub mod search;
pub mod serve;

// Re-export all public handlers
pub use data::*;
pub use info::*;
pub use init::*;
pub use search::*;
pub use serve::*;
