use std::path::{Path, PathBuf};
use std::sync::Arc;

use adapters::dns::SystemResolver;
use adapters::ebpf::{DeviceMapManager, EbpfHandle};
use adapters::http::{AppState, run_control_server};
use adapters::storage::RedbRegistrationStore;
use application::config_reload::ConfigReloadService;
use application::registration_service_impl::RegistrationAppService;
use application::session_service_impl::SessionAppService;
use domain::firewall::clock::MonotonicClock;
use domain::firewall::engine::FirewallEngine;
use domain::routes::parser::AddressResolver;
use infrastructure::config::GatewayConfig;
use infrastructure::constants::SWEEP_INTERVAL;
use infrastructure::logging::init_logging;
use infrastructure::metrics::GatewayMetrics;
use ports::secondary::metrics_port::MetricsPort;
use tracing::info;

use crate::cli::Cli;

/// Run the gateway daemon and block until shutdown.
pub async fn run(cli: &Cli) -> anyhow::Result<()> {
    // ── 1. Config and logging ───────────────────────────────────────
    let config = GatewayConfig::load(Path::new(&cli.config))?;
    let log_level = cli.log_level.unwrap_or(config.gateway.log_level);
    let log_format = cli.log_format.unwrap_or(config.gateway.log_format);
    init_logging(log_level, log_format)?;

    info!(
        config_path = %cli.config,
        version = env!("CARGO_PKG_VERSION"),
        "wireward agent starting"
    );

    // ── 2. Engine and session controller ────────────────────────────
    let metrics = Arc::new(GatewayMetrics::new());
    let engine = Arc::new(FirewallEngine::new(Arc::new(MonotonicClock)));
    let session = Arc::new(SessionAppService::new(
        engine,
        Arc::clone(&metrics) as Arc<dyn MetricsPort>,
    ));

    // ── 3. Optional eBPF offload, wired before the tables fill ──────
    let ebpf = match &config.ebpf.object_path {
        Some(object_path) => {
            let mut handle = EbpfHandle::load(Path::new(object_path))?;
            if let Some(interface) = &config.ebpf.interface {
                handle.attach_xdp(interface)?;
            }
            let manager = DeviceMapManager::new(handle.ebpf_mut())?;
            session.set_map_port(Box::new(manager));
            Some(handle)
        }
        None => None,
    };

    session.set_session_limits(config.max_session_ns(), config.inactivity_ns())?;

    // ── 4. Initial table population ─────────────────────────────────
    let resolver: Arc<dyn AddressResolver> = Arc::new(SystemResolver::from_system()?);
    let reload = Arc::new(ConfigReloadService::new(
        Arc::clone(&session),
        Arc::clone(&metrics) as Arc<dyn MetricsPort>,
    ));
    reload
        .reload(
            &config.user_acls(),
            &config.device_specs(),
            resolver.as_ref(),
        )
        .await?;

    // ── 5. Registration store ───────────────────────────────────────
    let store = RedbRegistrationStore::open(Path::new(&config.gateway.registration_db_path))
        .map_err(|e| anyhow::anyhow!("registration store: {e}"))?;
    let registrations = Arc::new(RegistrationAppService::new(Arc::new(store)));

    // ── 6. Shutdown, sweep task, control server ─────────────────────
    let shutdown_token = crate::shutdown::create_shutdown_token();

    let sweep_session = Arc::clone(&session);
    let sweep_token = shutdown_token.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    sweep_session.sweep();
                }
                () = sweep_token.cancelled() => break,
            }
        }
    });

    let state = Arc::new(AppState::new(
        metrics,
        session,
        registrations,
        reload,
        resolver,
        PathBuf::from(&cli.config),
        ebpf,
        PathBuf::from(&config.ebpf.pin_dir),
        shutdown_token.clone(),
    ));

    let socket_path = PathBuf::from(&config.gateway.control_socket_path);
    let server_token = shutdown_token.clone();
    run_control_server(state, &socket_path, async move {
        server_token.cancelled().await;
    })
    .await?;

    info!("wireward agent stopped");
    Ok(())
}
