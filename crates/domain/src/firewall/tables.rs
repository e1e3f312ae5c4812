use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use ebpf_common::routes::{PolicyEntry, PolicyList, RouteKey};

use crate::common::entity::UserHash;
use crate::routes::entity::Rule;
use crate::routes::error::RouteError;

/// The pair of per-user tries. Cloning is cheap (two `Arc`s); a clone taken
/// by the decision path keeps observing the tries it started with even while
/// the controller swaps in replacements.
#[derive(Debug, Clone, Default)]
pub struct UserTables {
    pub public: Arc<super::trie::PolicyTrie>,
    pub mfa: Arc<super::trie::PolicyTrie>,
}

/// Per-user policy tables: user-hash → (public trie, mfa trie).
///
/// Swaps are atomic per trie: a concurrent reader observes either the old
/// or the new trie, never a partially populated one. Cross-trie atomicity is
/// not guaranteed and not required; a packet flow racing a replacement
/// simply retries on its next packet.
#[derive(Debug, Default)]
pub struct PolicyTables {
    users: RwLock<HashMap<UserHash, UserTables>>,
}

impl PolicyTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the user's tries with freshly built ones from compiled rules.
    ///
    /// Entries carrying the `PUBLIC` bit land in the public trie, everything
    /// else in the mfa trie, regardless of which input list produced them.
    pub fn set_user_policies(&self, user: UserHash, rules: &[Rule]) -> Result<(), RouteError> {
        let mut public = super::trie::PolicyTrie::new();
        let mut mfa = super::trie::PolicyTrie::new();

        for rule in rules {
            let (public_entries, mfa_entries): (Vec<PolicyEntry>, Vec<PolicyEntry>) =
                rule.policies.iter().copied().partition(PolicyEntry::is_public);

            for key in &rule.keys {
                if !public_entries.is_empty() {
                    let list = PolicyList::from_slice(&public_entries).ok_or_else(|| {
                        RouteError::TooManyPolicies {
                            key: key.to_string(),
                        }
                    })?;
                    public.insert(*key, list);
                }
                if !mfa_entries.is_empty() {
                    let list = PolicyList::from_slice(&mfa_entries).ok_or_else(|| {
                        RouteError::TooManyPolicies {
                            key: key.to_string(),
                        }
                    })?;
                    mfa.insert(*key, list);
                }
            }
        }

        let tables = UserTables {
            public: Arc::new(public),
            mfa: Arc::new(mfa),
        };

        self.users
            .write()
            .expect("policy tables poisoned")
            .insert(user, tables);
        Ok(())
    }

    /// Drop both outer-map entries for the user.
    pub fn remove_user(&self, user: UserHash) -> bool {
        self.users
            .write()
            .expect("policy tables poisoned")
            .remove(&user)
            .is_some()
    }

    pub fn contains_user(&self, user: UserHash) -> bool {
        self.users
            .read()
            .expect("policy tables poisoned")
            .contains_key(&user)
    }

    /// Clone out the user's current trie pair.
    pub fn user_tables(&self, user: UserHash) -> Option<UserTables> {
        self.users
            .read()
            .expect("policy tables poisoned")
            .get(&user)
            .cloned()
    }

    /// Snapshot of all users' table contents, for the firewall listing.
    #[allow(clippy::type_complexity)]
    pub fn dump(&self) -> Vec<(UserHash, Vec<(RouteKey, PolicyList)>, Vec<(RouteKey, PolicyList)>)> {
        self.users
            .read()
            .expect("policy tables poisoned")
            .iter()
            .map(|(user, tables)| (*user, tables.public.entries(), tables.mfa.entries()))
            .collect()
    }
}
