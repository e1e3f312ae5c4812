use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;

use domain::routes::parser::{AddressResolver, validate_rules};
use ports::secondary::metrics_port::MetricsPort;
use tokio::sync::Mutex;
use tracing::info;

use crate::session_service_impl::SessionAppService;

/// One user's ACLs as declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAcl {
    pub username: String,
    /// Always-allowed routes ("allow" in config).
    pub public: Vec<String>,
    /// Routes gated on a live session.
    pub mfa: Vec<String>,
}

/// One device as declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    pub address: Ipv4Addr,
    pub username: String,
}

/// Application service for applying configuration: initial load and hot
/// reload share the same path. One reload runs at a time.
pub struct ConfigReloadService {
    session: Arc<SessionAppService>,
    metrics: Arc<dyn MetricsPort>,
    reload_mutex: Mutex<()>,
}

impl ConfigReloadService {
    pub fn new(session: Arc<SessionAppService>, metrics: Arc<dyn MetricsPort>) -> Self {
        Self {
            session,
            metrics,
            reload_mutex: Mutex::new(()),
        }
    }

    /// Re-parse every user's ACLs, swap the per-user tables, and reconcile
    /// the device set: configured devices are enrolled, devices absent from
    /// the configuration are removed, users absent from the configuration
    /// lose their tables.
    ///
    /// Validation happens before any mutation so a bad rule leaves the live
    /// tables untouched.
    pub async fn reload(
        &self,
        acls: &[UserAcl],
        devices: &[DeviceSpec],
        resolver: &dyn AddressResolver,
    ) -> anyhow::Result<()> {
        let _guard = self.reload_mutex.lock().await;

        let result = self.apply(acls, devices, resolver);
        match &result {
            Ok(()) => {
                self.metrics.record_config_reload("success");
                info!(
                    users = acls.len(),
                    devices = devices.len(),
                    "configuration reloaded"
                );
            }
            Err(e) => {
                self.metrics.record_config_reload("failure");
                tracing::error!(error = %e, "configuration reload failed");
            }
        }
        result
    }

    fn apply(
        &self,
        acls: &[UserAcl],
        devices: &[DeviceSpec],
        resolver: &dyn AddressResolver,
    ) -> anyhow::Result<()> {
        // Phase 1: validate everything up front.
        for acl in acls {
            validate_rules(&acl.mfa, &acl.public, resolver)
                .map_err(|e| anyhow::anyhow!("ACLs for {}: {e}", acl.username))?;
        }
        let configured_users: HashSet<&str> = acls.iter().map(|a| a.username.as_str()).collect();
        for device in devices {
            if !configured_users.contains(device.username.as_str()) {
                anyhow::bail!(
                    "device {} references user {} with no ACLs",
                    device.address,
                    device.username
                );
            }
        }

        // Phase 2: drop stale state. Devices absent from the configuration
        // (or moved to another user) go first, then users that disappeared
        // entirely, so an address can change hands within one reload.
        let configured: HashSet<Ipv4Addr> = devices.iter().map(|d| d.address).collect();
        for info in self.session.list_devices("") {
            let stale = !configured.contains(&info.address)
                || devices
                    .iter()
                    .any(|d| d.address == info.address && d.username != info.username);
            if stale {
                self.session.remove_device(info.address)?;
            }
        }
        for username in self.session.known_users() {
            if !configured_users.contains(username.as_str()) {
                self.session.remove_user(&username)?;
            }
        }

        // Phase 3: install the new tables for every configured user.
        // Existing sessions keep running under the refreshed policy for the
        // remainder of their window.
        for acl in acls {
            self.session
                .set_user_acls(&acl.username, &acl.mfa, &acl.public, resolver)?;
        }

        // Phase 4: enrol newly configured devices.
        let live: HashSet<Ipv4Addr> = self
            .session
            .list_devices("")
            .into_iter()
            .map(|d| d.address)
            .collect();
        for device in devices {
            if !live.contains(&device.address) {
                self.session.add_device(device.address, &device.username)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use domain::common::entity::UserHash;
    use domain::firewall::engine::FirewallEngine;
    use ports::test_utils::{ManualClock, NoopMetrics, StaticResolver};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    fn acl(username: &str, public: &[&str], mfa: &[&str]) -> UserAcl {
        UserAcl {
            username: username.to_string(),
            public: strings(public),
            mfa: strings(mfa),
        }
    }

    fn device(address: &str, username: &str) -> DeviceSpec {
        DeviceSpec {
            address: ip(address),
            username: username.to_string(),
        }
    }

    fn setup() -> (Arc<SessionAppService>, ConfigReloadService) {
        let engine = Arc::new(FirewallEngine::new(Arc::new(ManualClock::at(1))));
        let session = Arc::new(SessionAppService::new(engine, Arc::new(NoopMetrics)));
        let reload = ConfigReloadService::new(Arc::clone(&session), Arc::new(NoopMetrics));
        (session, reload)
    }

    #[tokio::test]
    async fn reload_installs_users_and_devices() {
        let (session, reload) = setup();
        reload
            .reload(
                &[acl("alice", &["1.1.1.1"], &["8.8.8.8"])],
                &[device("192.168.1.2", "alice")],
                &StaticResolver::new(),
            )
            .await
            .unwrap();

        assert_eq!(session.list_devices("alice").len(), 1);
        assert!(
            session
                .engine()
                .tables()
                .contains_user(UserHash::from_username("alice"))
        );
    }

    #[tokio::test]
    async fn reload_removes_absent_devices_and_users() {
        let (session, reload) = setup();
        let resolver = StaticResolver::new();
        reload
            .reload(
                &[
                    acl("alice", &["1.1.1.1"], &[]),
                    acl("bob", &["2.2.2.2"], &[]),
                ],
                &[
                    device("192.168.1.2", "alice"),
                    device("192.168.1.3", "bob"),
                ],
                &resolver,
            )
            .await
            .unwrap();

        reload
            .reload(
                &[acl("alice", &["1.1.1.1"], &[])],
                &[device("192.168.1.2", "alice")],
                &resolver,
            )
            .await
            .unwrap();

        assert_eq!(session.list_devices("").len(), 1);
        assert!(
            !session
                .engine()
                .tables()
                .contains_user(UserHash::from_username("bob"))
        );
    }

    #[tokio::test]
    async fn reload_moves_a_device_between_users() {
        let (session, reload) = setup();
        let resolver = StaticResolver::new();
        reload
            .reload(
                &[acl("alice", &["1.1.1.1"], &[]), acl("bob", &["2.2.2.2"], &[])],
                &[device("192.168.1.2", "alice")],
                &resolver,
            )
            .await
            .unwrap();

        reload
            .reload(
                &[acl("alice", &["1.1.1.1"], &[]), acl("bob", &["2.2.2.2"], &[])],
                &[device("192.168.1.2", "bob")],
                &resolver,
            )
            .await
            .unwrap();

        let devices = session.list_devices("");
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].username, "bob");
    }

    #[tokio::test]
    async fn invalid_acl_fails_before_any_mutation() {
        let (session, reload) = setup();
        let resolver = StaticResolver::new();
        reload
            .reload(
                &[acl("alice", &["1.1.1.1"], &[])],
                &[device("192.168.1.2", "alice")],
                &resolver,
            )
            .await
            .unwrap();

        let err = reload
            .reload(
                &[
                    acl("alice", &["1.1.1.1", "2.2.2.2"], &[]),
                    acl("bob", &["bad port/xxx"], &[]),
                ],
                &[],
                &resolver,
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bob"));

        // Old state survives: alice still has her device and her old rules.
        assert_eq!(session.list_devices("alice").len(), 1);
        let rules = session.dump_rules();
        assert_eq!(rules["alice"].public, vec!["1.1.1.1/32 any"]);
    }

    #[tokio::test]
    async fn device_with_unknown_user_is_rejected() {
        let (_, reload) = setup();
        let err = reload
            .reload(
                &[acl("alice", &["1.1.1.1"], &[])],
                &[device("192.168.1.2", "ghost")],
                &StaticResolver::new(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[tokio::test]
    async fn reload_preserves_running_sessions() {
        let (session, reload) = setup();
        let resolver = StaticResolver::new();
        reload
            .reload(
                &[acl("alice", &[], &["8.8.8.8"])],
                &[device("192.168.1.2", "alice")],
                &resolver,
            )
            .await
            .unwrap();
        session.set_authorized(ip("192.168.1.2"), "alice").unwrap();

        reload
            .reload(
                &[acl("alice", &[], &["8.8.8.8", "9.9.9.9"])],
                &[device("192.168.1.2", "alice")],
                &resolver,
            )
            .await
            .unwrap();

        // The session expiry was not reset by the policy swap.
        assert!(session.is_authed(ip("192.168.1.2")));
    }
}
