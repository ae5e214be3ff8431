//! Database module for SiteWatch.
//!
//! Provides SQLite storage with embedded migrations and the repository
//! trait the monitor is written against.

mod models;
mod repository;
mod store;

pub use models::*;
pub use repository::*;
pub use store::*;
