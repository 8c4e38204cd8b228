//! Shared domain types for `rolemap`: the closed role set, target and result
//! models, the error taxonomy and the engine configuration.

pub mod config;
pub mod error;
pub mod models;
pub mod network;
