use std::time::Duration;

// ── Paths ──────────────────────────────────────────────────────────

pub const DEFAULT_CONFIG_PATH: &str = "/etc/wireward/config.yaml";
pub const DEFAULT_SOCKET_PATH: &str = "/run/wireward/ctrl.sock";
pub const DEFAULT_REGISTRATION_DB_PATH: &str = "/var/lib/wireward/registrations.redb";
pub const DEFAULT_PIN_DIR: &str = "/sys/fs/bpf/wireward";

// ── Control socket ─────────────────────────────────────────────────

/// The control socket is loopback-only and carries privileged operations.
pub const SOCKET_MODE: u32 = 0o600;

// ── Timers ─────────────────────────────────────────────────────────

/// Cadence of the session expiry sweep.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_mode_is_owner_only() {
        assert_eq!(SOCKET_MODE & 0o077, 0);
    }

    #[test]
    fn sweep_runs_at_least_once_per_second() {
        assert!(SWEEP_INTERVAL <= Duration::from_secs(1));
        assert!(SWEEP_INTERVAL > Duration::ZERO);
    }
}
