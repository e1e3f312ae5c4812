use std::net::Ipv4Addr;

use domain::common::error::DomainError;
use ebpf_common::session::DeviceEntry;

/// Secondary port mirroring session state into the kernel maps consumed by
/// an attached offload object.
///
/// The userspace tables remain authoritative; mirror failures are surfaced
/// as `DomainError::TableError` and roll the triggering operation back.
/// Implemented by `DeviceMapManager` in the adapter layer.
pub trait DeviceMapPort: Send + Sync {
    /// Write (or overwrite) the 40-byte device record for an address.
    fn upsert_device(&mut self, ip: Ipv4Addr, entry: DeviceEntry) -> Result<(), DomainError>;

    /// Remove a device record. Removing an absent record is not an error.
    fn remove_device(&mut self, ip: Ipv4Addr) -> Result<(), DomainError>;

    /// Write index 0 of the global inactivity-timeout map
    /// (`u64::MAX` disables the sliding-window check).
    fn set_inactivity_timeout(&mut self, ns: u64) -> Result<(), DomainError>;
}
