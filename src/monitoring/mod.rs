// monitoring/mod.rs

pub mod notifications;
pub mod traffic_monitoring_system;
