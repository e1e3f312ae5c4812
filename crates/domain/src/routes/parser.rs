use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ebpf_common::routes::{
    POLICY_PUBLIC, POLICY_RANGE, POLICY_SINGLE, PolicyEntry, RouteKey,
};

use crate::common::entity::Protocol;

use super::entity::Rule;
use super::error::RouteError;

/// Name resolution seam for the parser. Rule compilation runs on the
/// control plane and may block; implementations return only IPv4 results
/// (IPv6 records are discarded before this trait is reached).
pub trait AddressResolver: Send + Sync {
    fn lookup_ipv4(&self, name: &str) -> Result<Vec<Ipv4Addr>, RouteError>;
}

/// Compile a user's two rule lists into merged per-key routes.
///
/// `mfa` entries are parsed first with no base flag, then `public` entries
/// with the `PUBLIC` flag. Keys appearing more than once across both lists
/// collapse into a single route whose policies retain insertion order
/// (public after mfa). The output preserves first-occurrence key order.
pub fn compile(
    mfa: &[String],
    public: &[String],
    resolver: &dyn AddressResolver,
) -> Result<Vec<Rule>, RouteError> {
    let mut result: Vec<Rule> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (lines, base) in [(mfa, 0u16), (public, POLICY_PUBLIC)] {
        for line in lines {
            let parsed = parse_rule(base, line, resolver)?;
            for key in parsed.keys {
                if let Some(&index) = seen.get(&key.to_string()) {
                    result[index].policies.extend_from_slice(&parsed.policies);
                    continue;
                }
                seen.insert(key.to_string(), result.len());
                result.push(Rule {
                    keys: vec![key],
                    policies: parsed.policies.clone(),
                });
            }
        }
    }

    // Enforce the per-key capacity after merging; the fixed-capacity
    // conversion re-checks but this is where the overflow is reported.
    for rule in &result {
        rule.policy_list()?;
    }

    Ok(result)
}

/// Compile both lists and discard the output. Used to validate ACLs at
/// config-load time.
pub fn validate_rules(
    mfa: &[String],
    public: &[String],
    resolver: &dyn AddressResolver,
) -> Result<(), RouteError> {
    compile(mfa, public, resolver).map(|_| ())
}

/// Render the canonical route strings (`a.b.c.d/n`) for every address of
/// every rule. The peer manager programs these as allowed-IPs.
pub fn acls_to_routes(
    rules: &[String],
    resolver: &dyn AddressResolver,
) -> Result<Vec<String>, RouteError> {
    let mut routes = Vec::new();
    for rule in rules {
        let address = rule.split_whitespace().next().ok_or(RouteError::EmptyRule)?;
        for key in parse_keys(address, resolver)? {
            routes.push(key.to_string());
        }
    }
    Ok(routes)
}

/// Parse one rule line into keys plus policies, OR-ing `base_type` into
/// every policy's type bits.
pub fn parse_rule(
    base_type: u16,
    rule: &str,
    resolver: &dyn AddressResolver,
) -> Result<Rule, RouteError> {
    let mut parts = rule.split_whitespace();
    let address = parts.next().ok_or(RouteError::EmptyRule)?;

    let keys = parse_keys(address, resolver)?;

    let mut policies = Vec::new();
    let mut saw_service = false;
    for field in parts {
        saw_service = true;
        let mut policy = parse_service(field)?;
        policy.policy_type |= base_type;
        policies.push(policy);
    }

    if !saw_service {
        // An address with no service qualifier is an any-port/any-proto rule.
        policies.push(PolicyEntry {
            policy_type: base_type | POLICY_SINGLE,
            proto: Protocol::Any.to_u16(),
            lower_port: 0,
            upper_port: 0,
        });
    }

    Ok(Rule { keys, policies })
}

fn parse_keys(address: &str, resolver: &dyn AddressResolver) -> Result<Vec<RouteKey>, RouteError> {
    Ok(parse_address(address, resolver)?
        .into_iter()
        .map(|(ip, prefix_len)| RouteKey::new(prefix_len, ip))
        .collect())
}

/// Resolve a rule address into one or more `(network, prefix_len)` pairs:
/// an IPv4 literal (/32), a CIDR (address masked to its prefix), or a DNS
/// name (one /32 per A record).
fn parse_address(
    address: &str,
    resolver: &dyn AddressResolver,
) -> Result<Vec<(Ipv4Addr, u32)>, RouteError> {
    if let Ok(ip) = Ipv4Addr::from_str(address) {
        return Ok(vec![(ip, 32)]);
    }

    if let Some(cidr) = parse_cidr(address) {
        return Ok(vec![cidr]);
    }

    // Neither literal nor CIDR: treat as a domain name.
    let addresses = resolver.lookup_ipv4(address)?;
    if addresses.is_empty() {
        return Err(RouteError::NoAddresses(address.to_string()));
    }
    Ok(addresses.into_iter().map(|ip| (ip, 32)).collect())
}

fn parse_cidr(address: &str) -> Option<(Ipv4Addr, u32)> {
    let (ip_part, prefix_part) = address.split_once('/')?;
    let ip = Ipv4Addr::from_str(ip_part).ok()?;
    let prefix_len: u32 = prefix_part.parse().ok()?;
    if prefix_len > 32 {
        return None;
    }
    // Mask the host bits off so the key is the network address.
    let mask: u32 = if prefix_len == 0 {
        0
    } else {
        !0u32 << (32 - prefix_len)
    };
    Some((Ipv4Addr::from(u32::from(ip) & mask), prefix_len))
}

/// Parse one service qualifier: `icmp`, `PORT/PROTO` or `LOW-HIGH/PROTO`.
fn parse_service(service: &str) -> Result<PolicyEntry, RouteError> {
    let Some((port_part, proto_part)) = service.split_once('/') else {
        // Qualifiers without a port, currently only `icmp`.
        if service == "icmp" {
            return Ok(PolicyEntry {
                policy_type: POLICY_SINGLE,
                proto: Protocol::Icmp.to_u16(),
                lower_port: 0,
                upper_port: 0,
            });
        }
        return Err(RouteError::MalformedService(service.to_string()));
    };

    let proto = parse_proto(proto_part)?;

    match port_part.split_once('-') {
        Some((lower, upper)) => {
            let lower = parse_port(lower)?;
            let upper = parse_port(upper)?;
            if lower > upper {
                return Err(RouteError::InvertedRange { lower, upper });
            }
            Ok(PolicyEntry {
                policy_type: POLICY_RANGE,
                proto: proto.to_u16(),
                lower_port: lower,
                upper_port: upper,
            })
        }
        None => Ok(PolicyEntry {
            policy_type: POLICY_SINGLE,
            proto: proto.to_u16(),
            lower_port: parse_port(port_part)?,
            upper_port: 0,
        }),
    }
}

fn parse_port(port: &str) -> Result<u16, RouteError> {
    port.parse()
        .map_err(|_| RouteError::InvalidPort(port.to_string()))
}

fn parse_proto(proto: &str) -> Result<Protocol, RouteError> {
    match proto.to_ascii_lowercase().as_str() {
        "any" => Ok(Protocol::Any),
        "tcp" => Ok(Protocol::Tcp),
        "udp" => Ok(Protocol::Udp),
        _ => Err(RouteError::UnknownProtocol(proto.to_string())),
    }
}
