use ebpf_common::routes::{PolicyEntry, PolicyList, RouteKey};

use super::error::RouteError;

/// One compiled route: an LPM key (or several, when a domain name expanded
/// to multiple A records) and the policies that apply behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub keys: Vec<RouteKey>,
    pub policies: Vec<PolicyEntry>,
}

impl Rule {
    /// Convert the policy vector into the fixed-capacity table value,
    /// zero-padding the unused tail.
    pub fn policy_list(&self) -> Result<PolicyList, RouteError> {
        PolicyList::from_slice(&self.policies).ok_or_else(|| RouteError::TooManyPolicies {
            key: self
                .keys
                .first()
                .map(RouteKey::to_string)
                .unwrap_or_default(),
        })
    }
}
