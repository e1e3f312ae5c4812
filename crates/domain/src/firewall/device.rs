use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use ebpf_common::session::{DeviceEntry, INACTIVITY_DISABLED};

use crate::common::entity::UserHash;

/// Live session state for one enrolled device.
///
/// The timers are atomics because the decision path stores
/// `last_packet_time` while holding only shared references; those stores
/// race benignly with the controller (monotonic last-seen, last writer
/// wins).
#[derive(Debug)]
pub struct DeviceRecord {
    user_hash: UserHash,
    locked: AtomicBool,
    last_packet_time: AtomicU64,
    session_expiry: AtomicU64,
}

impl DeviceRecord {
    pub fn new(user_hash: UserHash) -> Self {
        Self {
            user_hash,
            locked: AtomicBool::new(false),
            last_packet_time: AtomicU64::new(0),
            session_expiry: AtomicU64::new(0),
        }
    }

    pub fn user_hash(&self) -> UserHash {
        self.user_hash
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    pub fn set_locked(&self, locked: bool) {
        self.locked.store(locked, Ordering::Relaxed);
    }

    pub fn last_packet_time(&self) -> u64 {
        self.last_packet_time.load(Ordering::Relaxed)
    }

    pub fn session_expiry(&self) -> u64 {
        self.session_expiry.load(Ordering::Relaxed)
    }

    /// Record fast-path activity. The only write the decision path performs.
    pub fn touch(&self, now: u64) {
        self.last_packet_time.store(now, Ordering::Relaxed);
    }

    /// Arm the session timers (controller only).
    pub fn start_session(&self, now: u64, expiry: u64) {
        self.last_packet_time.store(now, Ordering::Relaxed);
        self.session_expiry.store(expiry, Ordering::Relaxed);
    }

    /// Zero both timers; the record state for "not authorized".
    pub fn clear_session(&self) {
        self.last_packet_time.store(0, Ordering::Relaxed);
        self.session_expiry.store(0, Ordering::Relaxed);
    }

    /// The session predicate: both timers live, the absolute deadline not
    /// passed, and the inactivity window (when enabled) not exceeded.
    pub fn is_authed(&self, now: u64, inactivity_ns: u64) -> bool {
        let last = self.last_packet_time();
        let expiry = self.session_expiry();
        if last == 0 || expiry == 0 {
            return false;
        }
        if now > expiry {
            return false;
        }
        inactivity_ns == INACTIVITY_DISABLED || now.saturating_sub(last) <= inactivity_ns
    }

    /// Snapshot in the shared wire layout.
    pub fn entry(&self) -> DeviceEntry {
        DeviceEntry {
            user_hash: *self.user_hash.as_bytes(),
            _pad: [0; 4],
            last_packet_time: self.last_packet_time(),
            session_expiry: self.session_expiry(),
        }
    }
}

/// Device table: IPv4 → session record, at most one device per address.
///
/// The map itself is guarded; the records are shared out as `Arc` so the
/// decision path touches timers without holding the table lock.
#[derive(Debug, Default)]
pub struct DeviceTable {
    devices: RwLock<HashMap<Ipv4Addr, Arc<DeviceRecord>>>,
}

impl DeviceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh record. Returns `false` when the address is taken.
    pub fn insert(&self, ip: Ipv4Addr, user_hash: UserHash) -> bool {
        let mut devices = self.devices.write().expect("device table poisoned");
        if devices.contains_key(&ip) {
            return false;
        }
        devices.insert(ip, Arc::new(DeviceRecord::new(user_hash)));
        true
    }

    pub fn remove(&self, ip: Ipv4Addr) -> Option<Arc<DeviceRecord>> {
        self.devices
            .write()
            .expect("device table poisoned")
            .remove(&ip)
    }

    pub fn get(&self, ip: Ipv4Addr) -> Option<Arc<DeviceRecord>> {
        self.devices
            .read()
            .expect("device table poisoned")
            .get(&ip)
            .cloned()
    }

    /// Stable-ordered snapshot of all devices.
    pub fn snapshot(&self) -> Vec<(Ipv4Addr, Arc<DeviceRecord>)> {
        let mut all: Vec<_> = self
            .devices
            .read()
            .expect("device table poisoned")
            .iter()
            .map(|(ip, record)| (*ip, Arc::clone(record)))
            .collect();
        all.sort_by_key(|(ip, _)| *ip);
        all
    }

    /// Number of devices belonging to the given user.
    pub fn count_for_user(&self, user_hash: UserHash) -> usize {
        self.devices
            .read()
            .expect("device table poisoned")
            .values()
            .filter(|record| record.user_hash() == user_hash)
            .count()
    }

    pub fn len(&self) -> usize {
        self.devices.read().expect("device table poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
