pub mod config_reload;
pub mod registration_service_impl;
pub mod session_service_impl;
