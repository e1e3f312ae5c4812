use crate::WrongLength;

/// Wire size of a packed [`DeviceEntry`].
pub const DEVICE_ENTRY_LEN: usize = 40;

/// Length of the user identifier (SHA-1 of the username).
pub const USER_HASH_LEN: usize = 20;

/// Sentinel for a disabled absolute session lifetime: the device record's
/// `session_expiry` is set to this value instead of a deadline.
pub const SESSION_EXPIRY_DISABLED: u64 = u64::MAX;

/// Sentinel stored at index 0 of the inactivity map when the sliding-window
/// check is disabled.
pub const INACTIVITY_DISABLED: u64 = u64::MAX;

/// Index of the single inactivity-timeout entry in its array map.
pub const INACTIVITY_INDEX: u32 = 0;

/// Per-device session record shared across the kernel boundary (40 bytes,
/// little-endian):
/// `{ user_hash: [20]u8, _pad: [4]u8, last_packet_time: u64, session_expiry: u64 }`.
///
/// Both timers are nanoseconds on the shared monotonic (boot) clock.
/// `last_packet_time == 0 && session_expiry == 0` iff the device is not
/// currently authorized.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceEntry {
    pub user_hash: [u8; USER_HASH_LEN],
    pub _pad: [u8; 4],
    pub last_packet_time: u64,
    pub session_expiry: u64,
}

impl DeviceEntry {
    /// A freshly enrolled (unauthorized) device for the given user.
    pub fn new(user_hash: [u8; USER_HASH_LEN]) -> Self {
        Self {
            user_hash,
            _pad: [0; 4],
            last_packet_time: 0,
            session_expiry: 0,
        }
    }

    /// Pack into the normative 40-byte wire layout.
    pub fn pack(&self) -> [u8; DEVICE_ENTRY_LEN] {
        let mut out = [0u8; DEVICE_ENTRY_LEN];
        out[..USER_HASH_LEN].copy_from_slice(&self.user_hash);
        out[24..32].copy_from_slice(&self.last_packet_time.to_le_bytes());
        out[32..40].copy_from_slice(&self.session_expiry.to_le_bytes());
        out
    }

    /// Unpack from the 40-byte wire layout. Fails on any other length.
    pub fn unpack(bytes: &[u8]) -> Result<Self, WrongLength> {
        if bytes.len() != DEVICE_ENTRY_LEN {
            return Err(WrongLength {
                expected: DEVICE_ENTRY_LEN,
                got: bytes.len(),
            });
        }
        let mut user_hash = [0u8; USER_HASH_LEN];
        user_hash.copy_from_slice(&bytes[..USER_HASH_LEN]);
        let mut word = [0u8; 8];
        word.copy_from_slice(&bytes[24..32]);
        let last_packet_time = u64::from_le_bytes(word);
        word.copy_from_slice(&bytes[32..40]);
        let session_expiry = u64::from_le_bytes(word);
        Ok(Self {
            user_hash,
            _pad: [0; 4],
            last_packet_time,
            session_expiry,
        })
    }
}

// SAFETY: #[repr(C)], Copy, 'static, primitives only, padding explicit.
#[cfg(feature = "userspace")]
unsafe impl aya::Pod for DeviceEntry {}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem;

    #[test]
    fn device_entry_size_and_offsets() {
        assert_eq!(mem::size_of::<DeviceEntry>(), DEVICE_ENTRY_LEN);
        assert_eq!(mem::align_of::<DeviceEntry>(), 8);
        assert_eq!(mem::offset_of!(DeviceEntry, user_hash), 0);
        assert_eq!(mem::offset_of!(DeviceEntry, last_packet_time), 24);
        assert_eq!(mem::offset_of!(DeviceEntry, session_expiry), 32);
    }

    #[test]
    fn device_entry_roundtrip() {
        let entry = DeviceEntry {
            user_hash: [0xAB; USER_HASH_LEN],
            _pad: [0; 4],
            last_packet_time: 123_456_789,
            session_expiry: SESSION_EXPIRY_DISABLED,
        };
        assert_eq!(DeviceEntry::unpack(&entry.pack()).unwrap(), entry);
    }

    #[test]
    fn new_device_has_zeroed_timers() {
        let entry = DeviceEntry::new([1; USER_HASH_LEN]);
        assert_eq!(entry.last_packet_time, 0);
        assert_eq!(entry.session_expiry, 0);
    }

    #[test]
    fn timers_are_little_endian_in_wire_form() {
        let mut entry = DeviceEntry::new([0; USER_HASH_LEN]);
        entry.last_packet_time = 1;
        entry.session_expiry = 0x0102_0304_0506_0708;
        let bytes = entry.pack();
        assert_eq!(bytes[24], 1);
        assert_eq!(bytes[25..32], [0; 7]);
        assert_eq!(bytes[32], 0x08);
        assert_eq!(bytes[39], 0x01);
    }

    #[test]
    fn unpack_rejects_wrong_length() {
        assert!(DeviceEntry::unpack(&[0u8; 39]).is_err());
        assert!(DeviceEntry::unpack(&[0u8; 41]).is_err());
    }
}
