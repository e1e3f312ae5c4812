use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

use super::device_handler::{delete_device, list_devices, lock_device, sessions, unlock_device};
use super::firewall_handler::list_rules;
use super::ops_handler::{
    metrics, pin_ebpf, reload_config, shutdown, unpin_ebpf, version, version_bpf,
};
use super::registration_handler::{
    create_registration, delete_registration, list_registrations,
};
use super::state::AppState;

/// Maximum request body size (form posts only, 16 KiB is plenty).
const MAX_BODY_SIZE: usize = 16 * 1024;

/// Build the control-socket router. The socket itself is 0600 and
/// loopback-only, so there is no auth layer here.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/device/list", get(list_devices))
        .route("/device/delete", post(delete_device))
        .route("/device/lock", post(lock_device))
        .route("/device/unlock", post(unlock_device))
        .route("/device/sessions", get(sessions))
        .route("/firewall/list", get(list_rules))
        .route("/config/reload", post(reload_config))
        .route("/version", get(version))
        .route("/version/bpf", get(version_bpf))
        .route("/registration/list", get(list_registrations))
        .route("/registration/create", post(create_registration))
        .route("/registration/delete", post(delete_registration))
        .route("/shutdown", get(shutdown))
        .route("/ebpf/pin", get(pin_ebpf))
        .route("/ebpf/unpin", get(unpin_ebpf))
        .route("/metrics", get(metrics))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::Ipv4Addr;
    use std::path::PathBuf;

    use application::config_reload::ConfigReloadService;
    use application::registration_service_impl::RegistrationAppService;
    use application::session_service_impl::SessionAppService;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use domain::firewall::engine::FirewallEngine;
    use http_body_util::BodyExt;
    use infrastructure::metrics::GatewayMetrics;
    use ports::secondary::metrics_port::MetricsPort;
    use ports::test_utils::{ManualClock, MemoryRegistrationStore, StaticResolver};
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn test_state() -> Arc<AppState> {
        let metrics = Arc::new(GatewayMetrics::new());
        let engine = Arc::new(FirewallEngine::new(Arc::new(ManualClock::at(1))));
        let session = Arc::new(SessionAppService::new(
            engine,
            Arc::clone(&metrics) as Arc<dyn MetricsPort>,
        ));
        let registrations = Arc::new(RegistrationAppService::new(Arc::new(
            MemoryRegistrationStore::default(),
        )));
        let reload = Arc::new(ConfigReloadService::new(
            Arc::clone(&session),
            Arc::clone(&metrics) as Arc<dyn MetricsPort>,
        ));

        session
            .set_user_acls(
                "tester",
                &strings(&["8.8.8.8"]),
                &strings(&["1.1.1.1/32"]),
                &StaticResolver::new(),
            )
            .unwrap();
        session
            .add_device(Ipv4Addr::new(192, 168, 1, 2), "tester")
            .unwrap();

        Arc::new(AppState::new(
            metrics,
            session,
            registrations,
            reload,
            Arc::new(StaticResolver::new()),
            PathBuf::from("/nonexistent/config.yaml"),
            None,
            PathBuf::from("/sys/fs/bpf/wireward-test"),
            CancellationToken::new(),
        ))
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(resp: axum::response::Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn form_post(path: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    // ── Devices ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn device_list_returns_json() {
        let router = build_router(test_state());
        let resp = router.oneshot(get_req("/device/list")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["address"], "192.168.1.2");
        assert_eq!(json[0]["username"], "tester");
        assert_eq!(json[0]["authorized"], false);
    }

    #[tokio::test]
    async fn device_list_filters_by_username() {
        let router = build_router(test_state());
        let resp = router
            .oneshot(get_req("/device/list?username=ghost"))
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert!(json.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn device_delete_removes_all_user_devices() {
        let state = test_state();
        let router = build_router(Arc::clone(&state));
        let resp = router
            .oneshot(form_post("/device/delete", "username=tester"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(state.session.list_devices("").is_empty());
    }

    #[tokio::test]
    async fn device_delete_unknown_user_is_plain_text_404() {
        let router = build_router(test_state());
        let resp = router
            .oneshot(form_post("/device/delete", "username=ghost"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(resp).await, "not found: ghost");
    }

    #[tokio::test]
    async fn lock_then_unlock_roundtrip() {
        let state = test_state();
        let router = build_router(Arc::clone(&state));

        let resp = router
            .clone()
            .oneshot(form_post("/device/lock", "username=tester"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(state.session.list_devices("tester")[0].locked);

        let resp = router
            .oneshot(form_post("/device/unlock", "username=tester"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!state.session.list_devices("tester")[0].locked);
    }

    #[tokio::test]
    async fn sessions_listing_is_plain_text() {
        let state = test_state();
        let router = build_router(Arc::clone(&state));

        let resp = router
            .clone()
            .oneshot(get_req("/device/sessions"))
            .await
            .unwrap();
        assert_eq!(body_text(resp).await, "no active sessions\n");

        state
            .session
            .set_authorized(Ipv4Addr::new(192, 168, 1, 2), "tester")
            .unwrap();
        let resp = router.oneshot(get_req("/device/sessions")).await.unwrap();
        assert_eq!(body_text(resp).await, "192.168.1.2 tester\n");
    }

    // ── Firewall ────────────────────────────────────────────────────

    #[tokio::test]
    async fn firewall_list_dumps_tries() {
        let router = build_router(test_state());
        let resp = router.oneshot(get_req("/firewall/list")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["tester"]["public"][0], "1.1.1.1/32 any");
        assert_eq!(json["tester"]["mfa"][0], "8.8.8.8/32 any");
    }

    // ── Registrations ───────────────────────────────────────────────

    #[tokio::test]
    async fn registration_create_list_delete() {
        let router = build_router(test_state());

        let resp = router
            .clone()
            .oneshot(form_post(
                "/registration/create",
                "username=alice&token=tok-1",
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["Token"], "tok-1");
        assert_eq!(json["Username"], "alice");

        let resp = router
            .clone()
            .oneshot(get_req("/registration/list"))
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["tok-1"], "alice");

        let resp = router
            .clone()
            .oneshot(form_post("/registration/delete", "id=tok-1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = router
            .oneshot(get_req("/registration/list"))
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert!(json.as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn registration_create_generates_token_when_empty() {
        let router = build_router(test_state());
        let resp = router
            .oneshot(form_post("/registration/create", "username=alice&token="))
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["Token"].as_str().unwrap().len(), 32);
    }

    // ── Ops ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn version_is_plain_text() {
        let router = build_router(test_state());
        let resp = router.oneshot(get_req("/version")).await.unwrap();
        let text = body_text(resp).await;
        assert!(text.starts_with("wireward "));
    }

    #[tokio::test]
    async fn version_bpf_without_object_reports_unloaded() {
        let router = build_router(test_state());
        let resp = router.oneshot(get_req("/version/bpf")).await.unwrap();
        assert_eq!(body_text(resp).await, "unloaded");
    }

    #[tokio::test]
    async fn shutdown_cancels_the_token() {
        let state = test_state();
        let router = build_router(Arc::clone(&state));
        assert!(!state.shutdown.is_cancelled());

        let resp = router.oneshot(get_req("/shutdown")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(state.shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn pin_without_object_is_service_unavailable() {
        let router = build_router(test_state());
        let resp = router.oneshot(get_req("/ebpf/pin")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_text(resp).await, "eBPF is not loaded");
    }

    #[tokio::test]
    async fn reload_with_missing_config_file_is_bad_request() {
        let router = build_router(test_state());
        let resp = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/config/reload")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn metrics_exposition_renders() {
        let router = build_router(test_state());
        let resp = router.oneshot(get_req("/metrics")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let text = body_text(resp).await;
        assert!(text.contains("wireward_devices"));
    }
}
