use std::net::Ipv4Addr;

use aya::Ebpf;
use aya::maps::{Array, HashMap, MapData};
use domain::common::error::DomainError;
use ebpf_common::session::{DeviceEntry, INACTIVITY_INDEX};
use ports::secondary::device_map_port::DeviceMapPort;
use tracing::{debug, info};

/// Mirrors session state into the offload object's maps.
///
/// Uses two maps:
/// - `DEVICES`: `HashMap<[u8; 4], DeviceEntry>` (device IPv4 → record)
/// - `INACTIVITY_TIMEOUT`: `Array<u64>` (single entry at index 0)
pub struct DeviceMapManager {
    devices: HashMap<MapData, [u8; 4], DeviceEntry>,
    inactivity: Array<MapData, u64>,
}

impl DeviceMapManager {
    /// Take ownership of both maps from a loaded object.
    pub fn new(ebpf: &mut Ebpf) -> Result<Self, anyhow::Error> {
        let devices = HashMap::try_from(
            ebpf.take_map("DEVICES")
                .ok_or_else(|| anyhow::anyhow!("map 'DEVICES' not found"))?,
        )?;
        let inactivity = Array::try_from(
            ebpf.take_map("INACTIVITY_TIMEOUT")
                .ok_or_else(|| anyhow::anyhow!("map 'INACTIVITY_TIMEOUT' not found"))?,
        )?;

        info!("device maps acquired (DEVICES, INACTIVITY_TIMEOUT)");
        Ok(Self {
            devices,
            inactivity,
        })
    }
}

impl DeviceMapPort for DeviceMapManager {
    fn upsert_device(&mut self, ip: Ipv4Addr, entry: DeviceEntry) -> Result<(), DomainError> {
        self.devices
            .insert(ip.octets(), entry, 0)
            .map_err(|e| DomainError::TableError(format!("device upsert {ip} failed: {e}")))
    }

    fn remove_device(&mut self, ip: Ipv4Addr) -> Result<(), DomainError> {
        // Removing an absent entry is not an error; the kernel map may
        // already have been reconciled.
        if let Err(e) = self.devices.remove(&ip.octets()) {
            debug!(device = %ip, error = %e, "device remove skipped");
        }
        Ok(())
    }

    fn set_inactivity_timeout(&mut self, ns: u64) -> Result<(), DomainError> {
        self.inactivity
            .set(INACTIVITY_INDEX, ns, 0)
            .map_err(|e| DomainError::TableError(format!("inactivity update failed: {e}")))
    }
}
