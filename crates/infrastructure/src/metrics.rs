use ports::secondary::metrics_port::MetricsPort;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

// ── Label types ─────────────────────────────────────────────────────

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct VerdictLabels {
    pub direction: String,
    pub verdict: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct EventLabels {
    pub event: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ResultLabels {
    pub result: String,
}

// ── Gateway metrics registry ────────────────────────────────────────

/// Prometheus registry for the gateway. All families use interior
/// mutability, so recording needs only `&self`; wrap in `Arc` to share.
pub struct GatewayMetrics {
    registry: Registry,
    pub verdicts_total: Family<VerdictLabels, Counter>,
    pub session_events_total: Family<EventLabels, Counter>,
    pub config_reloads_total: Family<ResultLabels, Counter>,
    pub active_sessions: Gauge,
    pub devices: Gauge,
}

impl GatewayMetrics {
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("wireward");

        let verdicts_total = Family::<VerdictLabels, Counter>::default();
        registry.register(
            "verdicts",
            "Packet decisions by direction and verdict",
            verdicts_total.clone(),
        );

        let session_events_total = Family::<EventLabels, Counter>::default();
        registry.register(
            "session_events",
            "Session transitions (authorized, deauthorized, expired)",
            session_events_total.clone(),
        );

        let config_reloads_total = Family::<ResultLabels, Counter>::default();
        registry.register(
            "config_reloads",
            "Configuration reloads by result",
            config_reloads_total.clone(),
        );

        let active_sessions = Gauge::default();
        registry.register(
            "active_sessions",
            "Devices with a live authorized session",
            active_sessions.clone(),
        );

        let devices = Gauge::default();
        registry.register("devices", "Enrolled devices", devices.clone());

        Self {
            registry,
            verdicts_total,
            session_events_total,
            config_reloads_total,
            active_sessions,
            devices,
        }
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        encode(&mut out, &self.registry)?;
        Ok(out)
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsPort for GatewayMetrics {
    fn record_verdict(&self, direction: &str, verdict: &str) {
        self.verdicts_total
            .get_or_create(&VerdictLabels {
                direction: direction.to_string(),
                verdict: verdict.to_string(),
            })
            .inc();
    }

    fn record_session_event(&self, event: &str) {
        self.session_events_total
            .get_or_create(&EventLabels {
                event: event.to_string(),
            })
            .inc();
    }

    fn record_config_reload(&self, result: &str) {
        self.config_reloads_total
            .get_or_create(&ResultLabels {
                result: result.to_string(),
            })
            .inc();
    }

    fn set_active_sessions(&self, count: u64) {
        #[allow(clippy::cast_possible_wrap)]
        self.active_sessions.set(count as i64);
    }

    fn set_device_count(&self, count: u64) {
        #[allow(clippy::cast_possible_wrap)]
        self.devices.set(count as i64);
    }
}
