use std::net::Ipv4Addr;

use domain::routes::error::RouteError;
use domain::routes::parser::AddressResolver;
use hickory_resolver::Resolver;
use tracing::debug;

/// `AddressResolver` backed by the system resolver configuration.
///
/// Only A records are queried, which discards IPv6 results before they
/// reach the parser. Lookups block; rule compilation runs on the control
/// plane where blocking is allowed.
pub struct SystemResolver {
    resolver: Resolver,
}

impl SystemResolver {
    /// Build from `/etc/resolv.conf` (or the platform equivalent).
    pub fn from_system() -> Result<Self, std::io::Error> {
        Ok(Self {
            resolver: Resolver::from_system_conf()?,
        })
    }
}

impl AddressResolver for SystemResolver {
    fn lookup_ipv4(&self, name: &str) -> Result<Vec<Ipv4Addr>, RouteError> {
        let lookup = self.resolver.ipv4_lookup(name).map_err(|e| {
            debug!(name, error = %e, "A record lookup failed");
            RouteError::Unresolvable(name.to_string())
        })?;
        Ok(lookup.iter().map(|a| a.0).collect())
    }
}
