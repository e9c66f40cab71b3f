// lib.rs
//! Traffic signal network simulator: a viewport-selected working set of
//! intersections, one green phase at a time, emergency preemption and an
//! operator console.

pub mod config;
pub mod control_system;
pub mod error;
pub mod flow_analyzer;
pub mod global_variables;
pub mod monitoring;
pub mod shared_data;
pub mod simulation_engine;
pub mod store;

pub use config::SimulationConfig;
pub use error::{Result, TrafficError};
pub use store::TrafficStore;
