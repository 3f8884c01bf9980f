use skylab::core::{
    normalize_instance_name, DEFAULT_FETCH_RETRY_INTERVAL, DEFAULT_FETCH_RETRY_TIMEOUT,
    DEFAULT_FETCH_TIMEOUT, DEFAULT_STORAGE_KEY,
};
use skylab::{
    ErrorCode, FetchMethod, RequestStyle, SkylabConfig, Variant, DEFAULT_INSTANCE_NAME,
    DEFAULT_SERVER_URL,
};
use std::time::Duration;

#[test]
fn test_default_values() {
    let config = SkylabConfig::default();

    assert_eq!(config.server_url, DEFAULT_SERVER_URL);
    assert_eq!(config.server_url, "https://api.lab.amplitude.com");
    assert!(config.fallback_variant.is_none());
    assert!(config.initial_flags.is_empty());
    assert!(!config.prefer_initial_flags);
    assert_eq!(config.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
    assert_eq!(config.fetch_timeout, Duration::from_millis(500));
    assert!(config.fetch_retry);
    assert_eq!(config.fetch_retry_timeout, DEFAULT_FETCH_RETRY_TIMEOUT);
    assert_eq!(config.fetch_retry_interval, DEFAULT_FETCH_RETRY_INTERVAL);
    assert_eq!(config.instance_name, DEFAULT_INSTANCE_NAME);
    assert!(!config.debug);
    assert!(!config.debug_assignment_requests);
    assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    assert_eq!(config.request_style.method, FetchMethod::Get);
}

#[test]
fn test_builder_custom_values() {
    let config = SkylabConfig::builder()
        .server_url("https://flags.example.com")
        .fallback_variant("off")
        .initial_flag("checkout", "control")
        .initial_flag("banner", Variant::with_payload("on", serde_json::json!({"x": 1})))
        .prefer_initial_flags(true)
        .fetch_timeout(Duration::from_secs(2))
        .fetch_retry(false)
        .fetch_retry_timeout(Duration::from_secs(3))
        .fetch_retry_interval(Duration::from_secs(4))
        .instance_name("Mobile")
        .debug(true)
        .debug_assignment_requests(true)
        .storage_key("custom-meta")
        .request_style(RequestStyle::legacy())
        .build();

    assert_eq!(config.server_url, "https://flags.example.com");
    assert_eq!(config.fallback_variant.as_deref(), Some("off"));
    assert_eq!(config.initial_flags.len(), 2);
    assert_eq!(config.initial_flags["checkout"], Variant::new("control"));
    assert!(config.prefer_initial_flags);
    assert_eq!(config.fetch_timeout, Duration::from_secs(2));
    assert!(!config.fetch_retry);
    assert_eq!(config.fetch_retry_timeout, Duration::from_secs(3));
    assert_eq!(config.fetch_retry_interval, Duration::from_secs(4));
    assert_eq!(config.normalized_instance_name(), "mobile");
    assert!(config.debug);
    assert!(config.debug_assignment_requests);
    assert_eq!(config.storage_key, "custom-meta");
    assert_eq!(config.request_style, RequestStyle::legacy());
}

#[test]
fn test_validation_errors() {
    let cases = [
        SkylabConfig::builder().server_url("  ").build(),
        SkylabConfig::builder().fetch_timeout(Duration::ZERO).build(),
        SkylabConfig::builder()
            .fetch_retry_interval(Duration::ZERO)
            .build(),
        SkylabConfig::builder()
            .fetch_retry_timeout(Duration::ZERO)
            .build(),
    ];

    for config in cases {
        let error = config.validate().unwrap_err();
        assert_eq!(error.code, ErrorCode::ConfigInvalid);
    }
}

#[test]
fn test_zero_interval_allowed_without_retry() {
    let config = SkylabConfig::builder()
        .fetch_retry(false)
        .fetch_retry_interval(Duration::ZERO)
        .fetch_retry_timeout(Duration::ZERO)
        .build();

    assert!(config.validate().is_ok());
}

#[test]
fn test_normalize_instance_name() {
    assert_eq!(normalize_instance_name("Mobile"), "mobile");
    assert_eq!(normalize_instance_name("  web "), "web");
    assert_eq!(normalize_instance_name(""), DEFAULT_INSTANCE_NAME);
    assert_eq!(normalize_instance_name("   "), DEFAULT_INSTANCE_NAME);
}
