use std::path::PathBuf;
use std::sync::Arc;

use application::config_reload::ConfigReloadService;
use application::registration_service_impl::RegistrationAppService;
use application::session_service_impl::SessionAppService;
use domain::routes::parser::AddressResolver;
use infrastructure::metrics::GatewayMetrics;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::ebpf::EbpfHandle;

/// Shared state for the control-socket server, passed to handlers via
/// `State(Arc<AppState>)`.
pub struct AppState {
    pub version: &'static str,
    pub metrics: Arc<GatewayMetrics>,
    pub session: Arc<SessionAppService>,
    pub registrations: Arc<RegistrationAppService>,
    pub reload: Arc<ConfigReloadService>,
    pub resolver: Arc<dyn AddressResolver>,
    /// Re-read on `/config/reload`.
    pub config_path: PathBuf,
    /// The loaded offload object, when one is configured.
    pub ebpf: Mutex<Option<EbpfHandle>>,
    pub pin_dir: PathBuf,
    /// Cancelled by `/shutdown` and by signals.
    pub shutdown: CancellationToken,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        metrics: Arc<GatewayMetrics>,
        session: Arc<SessionAppService>,
        registrations: Arc<RegistrationAppService>,
        reload: Arc<ConfigReloadService>,
        resolver: Arc<dyn AddressResolver>,
        config_path: PathBuf,
        ebpf: Option<EbpfHandle>,
        pin_dir: PathBuf,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            metrics,
            session,
            registrations,
            reload,
            resolver,
            config_path,
            ebpf: Mutex::new(ebpf),
            pin_dir,
            shutdown,
        }
    }
}
