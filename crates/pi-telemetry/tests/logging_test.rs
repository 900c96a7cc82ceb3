use pi_telemetry::logging;

#[test]
fn test_init_logging_human() {
    // Should not panic; second call is a safe no-op.
    logging::init_logging("test-service", "debug");
    logging::init_logging("test-service", "info");

    tracing::info!(key = "value", "human-readable log line");
}

#[test]
fn test_init_logging_json() {
    // The global subscriber may already be set by another test in this
    // binary; in that case this silently does nothing.
    logging::init_logging_json("test-service-json", "info");

    tracing::info!(key = "value", "json log line");
}

#[test]
fn test_init_dispatches_on_format() {
    logging::init("dispatch-test", "warn", true);
    logging::init("dispatch-test", "warn", false);
}
