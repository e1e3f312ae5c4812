use std::fmt;
use std::fmt::Write as _;

use ebpf_common::routes::{PROTO_ANY, PROTO_ICMP, PROTO_TCP, PROTO_UDP};
use ebpf_common::session::USER_HASH_LEN;
use sha1::{Digest, Sha1};

/// L4 protocols expressible in rules. `Any` matches regardless of the
/// packet's IP protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Any,
    Icmp,
    Tcp,
    Udp,
}

impl Protocol {
    /// The IANA protocol number carried in the packed policy value.
    pub fn to_u16(self) -> u16 {
        match self {
            Self::Any => PROTO_ANY,
            Self::Icmp => PROTO_ICMP,
            Self::Tcp => PROTO_TCP,
            Self::Udp => PROTO_UDP,
        }
    }
}

/// Fixed-width user identifier: the 20-byte SHA-1 of the username.
///
/// Used solely as a stable map key across the kernel boundary, never as a
/// credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserHash([u8; USER_HASH_LEN]);

impl UserHash {
    pub fn from_username(username: &str) -> Self {
        let digest = Sha1::digest(username.as_bytes());
        Self(digest.into())
    }

    pub fn as_bytes(&self) -> &[u8; USER_HASH_LEN] {
        &self.0
    }
}

impl From<[u8; USER_HASH_LEN]> for UserHash {
    fn from(bytes: [u8; USER_HASH_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for UserHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut hex = String::with_capacity(USER_HASH_LEN * 2);
        for byte in self.0 {
            let _ = write!(hex, "{byte:02x}");
        }
        f.write_str(&hex)
    }
}
