/// Metrics recording port. All methods default to no-ops so tests and
/// metrics-less deployments can share `NoopMetrics`.
pub trait MetricsPort: Send + Sync {
    /// One packet decision. `direction` is `ingress`/`egress`, `verdict` is
    /// `pass`/`drop`.
    fn record_verdict(&self, _direction: &str, _verdict: &str) {}

    /// A session transition: `authorized`, `deauthorized` or `expired`.
    fn record_session_event(&self, _event: &str) {}

    /// Outcome of a configuration reload (`success`/`failure`).
    fn record_config_reload(&self, _result: &str) {}

    fn set_active_sessions(&self, _count: u64) {}

    fn set_device_count(&self, _count: u64) {}
}
