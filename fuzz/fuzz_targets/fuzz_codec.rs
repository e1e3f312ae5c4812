#![no_main]

use libfuzzer_sys::fuzz_target;

use ebpf_common::routes::{PolicyEntry, RouteKey};
use ebpf_common::session::DeviceEntry;

// Decoders must reject any wrong-length input and round-trip anything
// they accept.
fuzz_target!(|data: &[u8]| {
    match RouteKey::unpack(data) {
        Ok(key) => assert_eq!(key.pack().as_slice(), data),
        Err(e) => assert_ne!(e.expected, data.len()),
    }

    match PolicyEntry::unpack(data) {
        Ok(policy) => assert_eq!(policy.pack().as_slice(), data),
        Err(e) => assert_ne!(e.expected, data.len()),
    }

    match DeviceEntry::unpack(data) {
        Ok(entry) => {
            // Timers and hash survive; the pad bytes are normalised to zero.
            let repacked = entry.pack();
            assert_eq!(&repacked[..20], &data[..20]);
            assert_eq!(&repacked[24..], &data[24..]);
        }
        Err(e) => assert_ne!(e.expected, data.len()),
    }
});
