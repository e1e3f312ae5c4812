use core::fmt;
use core::net::Ipv4Addr;

use crate::WrongLength;

/// Maximum number of policies a single route key may carry.
pub const MAX_POLICIES: usize = 128;

/// IP protocol numbers used in `PolicyEntry.proto` (IANA). `ANY` (0) matches
/// regardless of the packet's L4 protocol.
pub const PROTO_ANY: u16 = 0;
pub const PROTO_ICMP: u16 = 1;
pub const PROTO_TCP: u16 = 6;
pub const PROTO_UDP: u16 = 17;

/// `PolicyEntry.policy_type` bits. `SINGLE` and `RANGE` select the port
/// operator; `PUBLIC` marks an entry compiled from the always-allowed rule
/// list. Physical table placement is authoritative; the decision path never
/// reads the `PUBLIC` bit.
pub const POLICY_SINGLE: u16 = 1 << 0;
pub const POLICY_RANGE: u16 = 1 << 1;
pub const POLICY_PUBLIC: u16 = 1 << 2;

/// Wire size of a packed [`RouteKey`].
pub const ROUTE_KEY_LEN: usize = 8;

/// Wire size of a packed [`PolicyEntry`].
pub const POLICY_ENTRY_LEN: usize = 8;

/// LPM trie key: `{ prefix_len: u32 little-endian, addr: 4 bytes network
/// order }` (8 bytes).
///
/// The prefix length occupies the lowest-addressed 4 bytes so an LPM trie
/// matches on the trailing IP bits up to `prefix_len`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteKey {
    /// CIDR prefix length (0-32).
    pub prefix_len: u32,
    /// IPv4 address in network byte order.
    pub addr: [u8; 4],
}

impl RouteKey {
    pub fn new(prefix_len: u32, ip: Ipv4Addr) -> Self {
        Self {
            prefix_len,
            addr: ip.octets(),
        }
    }

    pub fn ip(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.addr)
    }

    /// Pack into the normative 8-byte wire layout.
    pub fn pack(&self) -> [u8; ROUTE_KEY_LEN] {
        let mut out = [0u8; ROUTE_KEY_LEN];
        out[..4].copy_from_slice(&self.prefix_len.to_le_bytes());
        out[4..].copy_from_slice(&self.addr);
        out
    }

    /// Unpack from the 8-byte wire layout. Fails on any other length.
    pub fn unpack(bytes: &[u8]) -> Result<Self, WrongLength> {
        if bytes.len() != ROUTE_KEY_LEN {
            return Err(WrongLength {
                expected: ROUTE_KEY_LEN,
                got: bytes.len(),
            });
        }
        Ok(Self {
            prefix_len: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            addr: [bytes[4], bytes[5], bytes[6], bytes[7]],
        })
    }
}

impl fmt::Display for RouteKey {
    /// Canonical rendering: `a.b.c.d/n`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ip(), self.prefix_len)
    }
}

/// Packed policy matcher (8 bytes, little-endian fields):
/// `{ policy_type: u16, proto: u16, lower_port: u16, upper_port: u16 }`.
///
/// Ports are host byte order. For `SINGLE` entries only `lower_port` is
/// meaningful and 0 denotes "no port" (bare addresses and ICMP).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PolicyEntry {
    pub policy_type: u16,
    pub proto: u16,
    pub lower_port: u16,
    pub upper_port: u16,
}

impl PolicyEntry {
    pub const fn zeroed() -> Self {
        Self {
            policy_type: 0,
            proto: 0,
            lower_port: 0,
            upper_port: 0,
        }
    }

    pub fn is_range(&self) -> bool {
        self.policy_type & POLICY_RANGE != 0
    }

    pub fn is_public(&self) -> bool {
        self.policy_type & POLICY_PUBLIC != 0
    }

    /// Match predicate shared by the decision path and the tests.
    ///
    /// `proto` is the packet's effective IP protocol number and `port` its
    /// destination port (0 when the protocol has no ports).
    pub fn matches(&self, proto: u16, port: u16) -> bool {
        if self.proto != PROTO_ANY && self.proto != proto {
            return false;
        }
        if self.is_range() {
            self.lower_port <= port && port <= self.upper_port
        } else {
            // SINGLE: lower_port 0 means any port.
            self.lower_port == 0 || self.lower_port == port
        }
    }

    /// Pack into the normative 8-byte wire layout.
    pub fn pack(&self) -> [u8; POLICY_ENTRY_LEN] {
        let mut out = [0u8; POLICY_ENTRY_LEN];
        out[0..2].copy_from_slice(&self.policy_type.to_le_bytes());
        out[2..4].copy_from_slice(&self.proto.to_le_bytes());
        out[4..6].copy_from_slice(&self.lower_port.to_le_bytes());
        out[6..8].copy_from_slice(&self.upper_port.to_le_bytes());
        out
    }

    /// Unpack from the 8-byte wire layout. Fails on any other length.
    pub fn unpack(bytes: &[u8]) -> Result<Self, WrongLength> {
        if bytes.len() != POLICY_ENTRY_LEN {
            return Err(WrongLength {
                expected: POLICY_ENTRY_LEN,
                got: bytes.len(),
            });
        }
        Ok(Self {
            policy_type: u16::from_le_bytes([bytes[0], bytes[1]]),
            proto: u16::from_le_bytes([bytes[2], bytes[3]]),
            lower_port: u16::from_le_bytes([bytes[4], bytes[5]]),
            upper_port: u16::from_le_bytes([bytes[6], bytes[7]]),
        })
    }
}

fn proto_str(proto: u16) -> &'static str {
    match proto {
        PROTO_ICMP => "icmp",
        PROTO_TCP => "tcp",
        PROTO_UDP => "udp",
        _ => "any",
    }
}

impl fmt::Display for PolicyEntry {
    /// Stable rendering used by the firewall listing: `any`, `icmp`,
    /// `443/tcp`, `100-200/any`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_range() {
            return write!(
                f,
                "{}-{}/{}",
                self.lower_port,
                self.upper_port,
                proto_str(self.proto)
            );
        }
        if self.lower_port == 0 {
            if self.proto == PROTO_ICMP {
                return f.write_str("icmp");
            }
            return f.write_str("any");
        }
        write!(f, "{}/{}", self.lower_port, proto_str(self.proto))
    }
}

/// Inner-trie value: an explicit count followed by a fixed-capacity policy
/// array, unused slots zeroed (`{ u32 count, [MAX_POLICIES]PolicyEntry }`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyList {
    pub count: u32,
    pub entries: [PolicyEntry; MAX_POLICIES],
}

impl PolicyList {
    /// Build from a slice. Returns `None` when the slice exceeds
    /// `MAX_POLICIES`.
    pub fn from_slice(policies: &[PolicyEntry]) -> Option<Self> {
        if policies.len() > MAX_POLICIES {
            return None;
        }
        let mut entries = [PolicyEntry::zeroed(); MAX_POLICIES];
        entries[..policies.len()].copy_from_slice(policies);
        Some(Self {
            #[allow(clippy::cast_possible_truncation)] // bounded by MAX_POLICIES
            count: policies.len() as u32,
            entries,
        })
    }

    /// Iterate the populated prefix of the array.
    pub fn iter(&self) -> impl Iterator<Item = &PolicyEntry> {
        let count = (self.count as usize).min(MAX_POLICIES);
        self.entries[..count].iter()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

// SAFETY: all types are #[repr(C)], Copy, 'static and contain only
// primitives with explicit padding, so they are valid for zero-copy eBPF
// map access.
#[cfg(feature = "userspace")]
unsafe impl aya::Pod for RouteKey {}
#[cfg(feature = "userspace")]
unsafe impl aya::Pod for PolicyEntry {}
#[cfg(feature = "userspace")]
unsafe impl aya::Pod for PolicyList {}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem;

    // ── Layout ──────────────────────────────────────────────────────

    #[test]
    fn route_key_size_and_offsets() {
        assert_eq!(mem::size_of::<RouteKey>(), ROUTE_KEY_LEN);
        assert_eq!(mem::align_of::<RouteKey>(), 4);
        assert_eq!(mem::offset_of!(RouteKey, prefix_len), 0);
        assert_eq!(mem::offset_of!(RouteKey, addr), 4);
    }

    #[test]
    fn policy_entry_size_and_offsets() {
        assert_eq!(mem::size_of::<PolicyEntry>(), POLICY_ENTRY_LEN);
        assert_eq!(mem::align_of::<PolicyEntry>(), 2);
        assert_eq!(mem::offset_of!(PolicyEntry, policy_type), 0);
        assert_eq!(mem::offset_of!(PolicyEntry, proto), 2);
        assert_eq!(mem::offset_of!(PolicyEntry, lower_port), 4);
        assert_eq!(mem::offset_of!(PolicyEntry, upper_port), 6);
    }

    #[test]
    fn policy_list_size() {
        assert_eq!(
            mem::size_of::<PolicyList>(),
            4 + MAX_POLICIES * POLICY_ENTRY_LEN
        );
        assert_eq!(mem::offset_of!(PolicyList, count), 0);
        assert_eq!(mem::offset_of!(PolicyList, entries), 4);
    }

    #[test]
    fn policy_type_bits_are_distinct() {
        assert_eq!(POLICY_SINGLE & POLICY_RANGE, 0);
        assert_eq!(POLICY_SINGLE & POLICY_PUBLIC, 0);
        assert_eq!(POLICY_RANGE & POLICY_PUBLIC, 0);
    }

    // ── Codec round-trips ───────────────────────────────────────────

    #[test]
    fn route_key_roundtrip() {
        for prefix_len in 0..=32u32 {
            let key = RouteKey::new(prefix_len, Ipv4Addr::new(10, 2, 3, 254));
            assert_eq!(RouteKey::unpack(&key.pack()).unwrap(), key);
        }
    }

    #[test]
    fn route_key_wire_layout() {
        let key = RouteKey::new(24, Ipv4Addr::new(192, 168, 1, 0));
        assert_eq!(key.pack(), [24, 0, 0, 0, 192, 168, 1, 0]);
    }

    #[test]
    fn route_key_unpack_rejects_wrong_length() {
        assert!(RouteKey::unpack(&[0u8; 7]).is_err());
        assert!(RouteKey::unpack(&[0u8; 9]).is_err());
        assert!(RouteKey::unpack(&[]).is_err());
    }

    #[test]
    fn route_key_display_is_canonical() {
        let key = RouteKey::new(32, Ipv4Addr::new(1, 1, 1, 1));
        assert_eq!(key.to_string(), "1.1.1.1/32");
        let key = RouteKey::new(16, Ipv4Addr::new(172, 16, 0, 0));
        assert_eq!(key.to_string(), "172.16.0.0/16");
    }

    #[test]
    fn policy_entry_roundtrip() {
        let policy = PolicyEntry {
            policy_type: POLICY_RANGE | POLICY_PUBLIC,
            proto: PROTO_TCP,
            lower_port: 100,
            upper_port: 150,
        };
        assert_eq!(PolicyEntry::unpack(&policy.pack()).unwrap(), policy);
    }

    #[test]
    fn policy_entry_wire_layout_is_little_endian() {
        let policy = PolicyEntry {
            policy_type: POLICY_SINGLE,
            proto: PROTO_UDP,
            lower_port: 0x1234,
            upper_port: 0,
        };
        assert_eq!(policy.pack(), [1, 0, 17, 0, 0x34, 0x12, 0, 0]);
    }

    #[test]
    fn policy_entry_unpack_rejects_wrong_length() {
        let err = PolicyEntry::unpack(&[0u8; 3]).unwrap_err();
        assert_eq!(err.expected, POLICY_ENTRY_LEN);
        assert_eq!(err.got, 3);
    }

    // ── Match predicate ─────────────────────────────────────────────

    #[test]
    fn single_zero_port_matches_any_port() {
        let policy = PolicyEntry {
            policy_type: POLICY_SINGLE,
            proto: PROTO_ANY,
            lower_port: 0,
            upper_port: 0,
        };
        assert!(policy.matches(PROTO_TCP, 80));
        assert!(policy.matches(PROTO_UDP, 0));
        assert!(policy.matches(47, 0)); // GRE matches an any/any policy
    }

    #[test]
    fn single_port_requires_exact_match() {
        let policy = PolicyEntry {
            policy_type: POLICY_SINGLE,
            proto: PROTO_TCP,
            lower_port: 33,
            upper_port: 0,
        };
        assert!(policy.matches(PROTO_TCP, 33));
        assert!(!policy.matches(PROTO_TCP, 34));
        assert!(!policy.matches(PROTO_UDP, 33));
    }

    #[test]
    fn range_is_inclusive() {
        let policy = PolicyEntry {
            policy_type: POLICY_RANGE,
            proto: PROTO_ANY,
            lower_port: 100,
            upper_port: 150,
        };
        assert!(policy.matches(PROTO_TCP, 100));
        assert!(policy.matches(PROTO_UDP, 150));
        assert!(!policy.matches(PROTO_TCP, 99));
        assert!(!policy.matches(PROTO_TCP, 151));
    }

    #[test]
    fn icmp_policy_matches_icmp_only() {
        let policy = PolicyEntry {
            policy_type: POLICY_SINGLE,
            proto: PROTO_ICMP,
            lower_port: 0,
            upper_port: 0,
        };
        assert!(policy.matches(PROTO_ICMP, 0));
        assert!(!policy.matches(PROTO_TCP, 0));
    }

    // ── Display ─────────────────────────────────────────────────────

    #[test]
    fn policy_display_forms() {
        let any = PolicyEntry {
            policy_type: POLICY_SINGLE,
            proto: PROTO_ANY,
            lower_port: 0,
            upper_port: 0,
        };
        assert_eq!(any.to_string(), "any");

        let icmp = PolicyEntry {
            policy_type: POLICY_SINGLE,
            proto: PROTO_ICMP,
            lower_port: 0,
            upper_port: 0,
        };
        assert_eq!(icmp.to_string(), "icmp");

        let single = PolicyEntry {
            policy_type: POLICY_SINGLE | POLICY_PUBLIC,
            proto: PROTO_TCP,
            lower_port: 443,
            upper_port: 0,
        };
        assert_eq!(single.to_string(), "443/tcp");

        let range = PolicyEntry {
            policy_type: POLICY_RANGE,
            proto: PROTO_ANY,
            lower_port: 100,
            upper_port: 200,
        };
        assert_eq!(range.to_string(), "100-200/any");
    }

    // ── PolicyList ──────────────────────────────────────────────────

    #[test]
    fn policy_list_from_slice_pads_with_zeroes() {
        let policies = [PolicyEntry {
            policy_type: POLICY_SINGLE,
            proto: PROTO_TCP,
            lower_port: 22,
            upper_port: 0,
        }];
        let list = PolicyList::from_slice(&policies).unwrap();
        assert_eq!(list.count, 1);
        assert_eq!(list.entries[0], policies[0]);
        assert_eq!(list.entries[1], PolicyEntry::zeroed());
        assert_eq!(list.iter().count(), 1);
    }

    #[test]
    fn policy_list_rejects_overflow() {
        let policies = [PolicyEntry::zeroed(); MAX_POLICIES + 1];
        assert!(PolicyList::from_slice(&policies).is_none());

        let at_capacity = [PolicyEntry::zeroed(); MAX_POLICIES];
        assert!(PolicyList::from_slice(&at_capacity).is_some());
    }
}
