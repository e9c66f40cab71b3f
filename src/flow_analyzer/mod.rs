// flow_analyzer/mod.rs

pub mod traffic_analyzer;

pub use traffic_analyzer::{
    analyze_trends, system_status, CongestionLevel, ParkingLevel, SystemStatus, TrafficTrend,
    TrendDirection,
};
