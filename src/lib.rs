//! Layered configuration engine for the n98-magerun administration tool.
//!
//! This module exports the cascade, its paths and errors for embedding and testing.

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod paths;
