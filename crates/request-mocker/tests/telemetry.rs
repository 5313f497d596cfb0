//! Subscriber installation runs in its own test binary: the global default
//! can only be set once per process.

use request_mocker::telemetry::init_tracing;

#[test]
fn test_init_tracing_installs_once() {
    assert!(init_tracing("request_mocker=debug"));
    assert!(!init_tracing("request_mocker=debug"));
    tracing::info!("subscriber installed");
}
