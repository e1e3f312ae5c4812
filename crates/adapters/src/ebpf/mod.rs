mod device_map_manager;
mod loader;

pub use device_map_manager::DeviceMapManager;
pub use loader::EbpfHandle;
