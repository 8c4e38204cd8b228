//! Windows server role mapping: discovery, port probing and role inference.

pub mod aggregator;
pub mod classifier;
pub mod discovery;
pub mod engine;
pub mod inventory;
pub mod network;
pub mod progress;
pub mod scanner;

pub use engine::Engine;
