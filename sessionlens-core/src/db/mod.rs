//! Database layer for sessionlens
//!
//! This module provides the event store using SQLite with:
//! - Drop-and-recreate schema for the batch-loaded event table
//! - Typed and CSV bulk loading
//! - Analytics pipeline queries and a read-only query escape hatch

pub mod load;
pub mod queries;
pub mod repo;
pub mod schema;

pub use load::{LoadOptions, ParsedEvents};
pub use repo::{Database, QueryResult};
