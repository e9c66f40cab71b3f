// control_system/mod.rs

pub mod commands;
pub mod traffic_light_controller;
pub mod update_loop;
