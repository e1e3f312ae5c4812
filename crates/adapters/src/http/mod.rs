mod device_handler;
mod error;
mod firewall_handler;
mod ops_handler;
mod registration_handler;
mod router;
mod server;
mod state;

pub use router::build_router;
pub use server::run_control_server;
pub use state::AppState;
