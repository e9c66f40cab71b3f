// simulation_engine/mod.rs

pub mod intersections;
pub mod route_generation;
pub mod simulation;
pub mod state;
pub mod viewport;
