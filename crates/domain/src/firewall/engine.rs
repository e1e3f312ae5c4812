use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ebpf_common::routes::{PROTO_TCP, PROTO_UDP, PolicyList};
use ebpf_common::session::INACTIVITY_DISABLED;

use crate::common::entity::UserHash;

use super::clock::Clock;
use super::device::DeviceTable;
use super::tables::PolicyTables;

/// Which side of the tunnel a packet was captured on. Fixed per attach
/// point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Traffic towards a device: the device is the destination.
    Ingress,
    /// Traffic from a device: the device is the source.
    Egress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Drop,
}

const IPV4_MIN_HEADER_LEN: usize = 20;

/// The per-packet decision program plus the tables it reads.
///
/// Wait-free per packet: two trie lookups, one device lookup, and at most
/// one relaxed store into the device record. All mutation beyond that
/// timestamp funnels through the session controller.
pub struct FirewallEngine {
    devices: DeviceTable,
    tables: PolicyTables,
    inactivity_ns: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl FirewallEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            devices: DeviceTable::new(),
            tables: PolicyTables::new(),
            inactivity_ns: AtomicU64::new(INACTIVITY_DISABLED),
            clock,
        }
    }

    pub fn devices(&self) -> &DeviceTable {
        &self.devices
    }

    pub fn tables(&self) -> &PolicyTables {
        &self.tables
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Global inactivity window in nanoseconds (`u64::MAX` disables).
    pub fn inactivity_ns(&self) -> u64 {
        self.inactivity_ns.load(Ordering::Relaxed)
    }

    pub fn set_inactivity_ns(&self, ns: u64) {
        self.inactivity_ns.store(ns, Ordering::Relaxed);
    }

    /// The session predicate for a device address at the current instant.
    pub fn is_authed(&self, ip: Ipv4Addr) -> bool {
        self.devices
            .get(ip)
            .is_some_and(|record| record.is_authed(self.clock.now_ns(), self.inactivity_ns()))
    }

    /// Decide one packet. `packet` starts at the IPv4 header.
    ///
    /// There is no error channel: every structural anomaly (short packet,
    /// non-v4, unknown device, missing tables) is a DROP.
    pub fn evaluate(&self, direction: Direction, packet: &[u8]) -> Verdict {
        let Some(header) = Ipv4Header::parse(packet) else {
            return Verdict::Drop;
        };

        let (device_ip, policy_ip) = match direction {
            Direction::Egress => (header.src, header.dst),
            Direction::Ingress => (header.dst, header.src),
        };

        let Some(device) = self.devices.get(device_ip) else {
            return Verdict::Drop;
        };

        let Some(tables) = self.tables.user_tables(device.user_hash()) else {
            return Verdict::Drop;
        };

        // Public routes match regardless of session state.
        if let Some(policies) = tables.public.lookup(policy_ip) {
            if matches_any(policies, header.proto, header.dst_port) {
                return Verdict::Pass;
            }
        }

        let now = self.clock.now_ns();
        if !device.is_authed(now, self.inactivity_ns()) {
            return Verdict::Drop;
        }

        if let Some(policies) = tables.mfa.lookup(policy_ip) {
            if matches_any(policies, header.proto, header.dst_port) {
                device.touch(now);
                return Verdict::Pass;
            }
        }

        Verdict::Drop
    }
}

fn matches_any(policies: &PolicyList, proto: u16, port: u16) -> bool {
    policies.iter().any(|policy| policy.matches(proto, port))
}

struct Ipv4Header {
    src: Ipv4Addr,
    dst: Ipv4Addr,
    /// Effective protocol: the raw IP protocol number. Policies with a
    /// concrete protocol only ever name TCP/UDP/ICMP, so anything else can
    /// match only `proto=ANY` entries.
    proto: u16,
    /// Destination port, 0 for portless protocols or truncated L4 headers.
    dst_port: u16,
}

impl Ipv4Header {
    fn parse(packet: &[u8]) -> Option<Self> {
        if packet.len() < IPV4_MIN_HEADER_LEN {
            return None;
        }
        let version = packet[0] >> 4;
        if version != 4 {
            return None;
        }
        let header_len = usize::from(packet[0] & 0x0F) * 4;
        if header_len < IPV4_MIN_HEADER_LEN || packet.len() < header_len {
            return None;
        }

        let proto = u16::from(packet[9]);
        let src = Ipv4Addr::new(packet[12], packet[13], packet[14], packet[15]);
        let dst = Ipv4Addr::new(packet[16], packet[17], packet[18], packet[19]);

        let dst_port = match proto {
            p if p == PROTO_TCP || p == PROTO_UDP => {
                // Destination port sits two bytes into the L4 header.
                if packet.len() >= header_len + 4 {
                    u16::from_be_bytes([packet[header_len + 2], packet[header_len + 3]])
                } else {
                    0
                }
            }
            _ => 0,
        };

        Some(Self {
            src,
            dst,
            proto,
            dst_port,
        })
    }
}
