use thiserror::Error;

use ebpf_common::routes::MAX_POLICIES;

/// Errors from rule parsing and compilation. The first offending field is
/// reported verbatim; no partial output is surfaced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("empty rule")]
    EmptyRule,

    #[error("malformed port/service declaration: {0}")]
    MalformedService(String),

    #[error("could not convert port definition to number: {0}")]
    InvalidPort(String),

    #[error("unknown service protocol: {0}")]
    UnknownProtocol(String),

    #[error("lower port cannot be higher than upper port: lower: {lower} upper: {upper}")]
    InvertedRange { lower: u16, upper: u16 },

    #[error("unable to resolve address from: {0}")]
    Unresolvable(String),

    #[error("no usable IPv4 addresses for {0} (IPv6-only names are unsupported)")]
    NoAddresses(String),

    #[error("number of policies for key {key} exceeds the maximum of {MAX_POLICIES}")]
    TooManyPolicies { key: String },
}
