//! CLI command implementations

pub mod ask;
pub mod completions;
pub mod config;
pub mod entity;
pub mod io;
pub mod query;
