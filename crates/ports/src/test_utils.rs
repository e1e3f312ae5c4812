//! Shared test doubles for the application and adapter layers.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use domain::common::error::DomainError;
use domain::firewall::clock::Clock;
use domain::routes::error::RouteError;
use domain::routes::parser::AddressResolver;
use ebpf_common::session::DeviceEntry;

use crate::secondary::device_map_port::DeviceMapPort;
use crate::secondary::metrics_port::MetricsPort;
use crate::secondary::registration_store::{Registration, RegistrationStore};

/// No-op implementation of the metrics port.
pub struct NoopMetrics;

impl MetricsPort for NoopMetrics {}

/// Hand-driven monotonic clock.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn at(ns: u64) -> Self {
        Self(AtomicU64::new(ns))
    }

    pub fn advance(&self, ns: u64) {
        self.0.fetch_add(ns, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Resolver backed by a fixed name→addresses map; unknown names are
/// unresolvable.
#[derive(Debug, Default)]
pub struct StaticResolver {
    names: HashMap<String, Vec<Ipv4Addr>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: &str, addrs: &[Ipv4Addr]) -> Self {
        self.names.insert(name.to_string(), addrs.to_vec());
        self
    }
}

impl AddressResolver for StaticResolver {
    fn lookup_ipv4(&self, name: &str) -> Result<Vec<Ipv4Addr>, RouteError> {
        self.names
            .get(name)
            .cloned()
            .ok_or_else(|| RouteError::Unresolvable(name.to_string()))
    }
}

/// In-memory registration store.
#[derive(Debug, Default)]
pub struct MemoryRegistrationStore {
    registrations: Mutex<Vec<Registration>>,
}

impl RegistrationStore for MemoryRegistrationStore {
    fn list(&self) -> Result<Vec<Registration>, DomainError> {
        Ok(self
            .registrations
            .lock()
            .expect("registration store poisoned")
            .clone())
    }

    fn insert(&self, registration: &Registration) -> Result<(), DomainError> {
        let mut store = self
            .registrations
            .lock()
            .expect("registration store poisoned");
        if store.iter().any(|r| r.token == registration.token) {
            return Err(DomainError::DeviceExists(registration.token.clone()));
        }
        store.push(registration.clone());
        Ok(())
    }

    fn delete(&self, token: &str) -> Result<(), DomainError> {
        let mut store = self
            .registrations
            .lock()
            .expect("registration store poisoned");
        let before = store.len();
        store.retain(|r| r.token != token);
        if store.len() == before {
            return Err(DomainError::NotFound(token.to_string()));
        }
        Ok(())
    }
}

/// In-memory device-map mirror recording what the kernel would see.
#[derive(Debug, Default)]
pub struct RecordingDeviceMap {
    pub devices: Mutex<HashMap<Ipv4Addr, DeviceEntry>>,
    pub inactivity_ns: AtomicU64,
}

impl DeviceMapPort for RecordingDeviceMap {
    fn upsert_device(&mut self, ip: Ipv4Addr, entry: DeviceEntry) -> Result<(), DomainError> {
        self.devices
            .lock()
            .expect("recording map poisoned")
            .insert(ip, entry);
        Ok(())
    }

    fn remove_device(&mut self, ip: Ipv4Addr) -> Result<(), DomainError> {
        self.devices
            .lock()
            .expect("recording map poisoned")
            .remove(&ip);
        Ok(())
    }

    fn set_inactivity_timeout(&mut self, ns: u64) -> Result<(), DomainError> {
        self.inactivity_ns.store(ns, Ordering::Relaxed);
        Ok(())
    }
}
