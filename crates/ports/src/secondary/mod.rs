pub mod device_map_port;
pub mod metrics_port;
pub mod registration_store;
