use skylab::{Skylab, SkylabClient, SkylabConfig, DEFAULT_INSTANCE_NAME};

fn named(name: &str) -> SkylabConfig {
    SkylabConfig::builder()
        .instance_name(name)
        .fetch_retry(false)
        .build()
}

#[test]
fn test_init_returns_existing_instance() {
    Skylab::init("client-key-first", named("checkout")).unwrap();

    let second = Skylab::init(
        "client-key-other",
        SkylabConfig::builder()
            .instance_name("Checkout")
            .fallback_variant("ignored")
            .build(),
    )
    .unwrap();

    assert!(second.config().fallback_variant.is_none());
    assert_eq!(second.config().instance_name, "checkout");
}

#[test]
fn test_lookup_is_case_insensitive() {
    Skylab::init("client-key-lookup", named("Search-Page")).unwrap();

    assert!(Skylab::instance("search-page").is_some());
    assert!(Skylab::instance("  SEARCH-PAGE ").is_some());
    assert!(Skylab::instance("unknown-page").is_none());
}

#[test]
fn test_blank_name_is_default_instance() {
    Skylab::init("client-key-default", named("")).unwrap();

    assert!(Skylab::default_instance().is_some());
    assert!(Skylab::instance(DEFAULT_INSTANCE_NAME).is_some());
}

#[test]
fn test_remove_unregisters() {
    Skylab::init("client-key-remove", named("removable")).unwrap();

    let removed = Skylab::remove("removable");

    assert!(removed.is_some());
    assert!(!removed.unwrap().is_retrying());
    assert!(Skylab::instance("removable").is_none());
    assert!(Skylab::remove("removable").is_none());
}

#[test]
fn test_register_keeps_first_client() {
    let first = SkylabClient::new("client-key-reg-1", named("registered")).unwrap();
    let second = SkylabClient::new(
        "client-key-reg-2",
        SkylabConfig::builder()
            .instance_name("registered")
            .fallback_variant("second")
            .build(),
    )
    .unwrap();

    Skylab::register(first);
    let kept = Skylab::register(second);

    assert!(kept.config().fallback_variant.is_none());
}

#[test]
fn test_invalid_config_not_registered() {
    let config = SkylabConfig::builder()
        .instance_name("broken")
        .server_url("")
        .build();

    assert!(Skylab::init("client-key-broken", config).is_err());
    assert!(Skylab::instance("broken").is_none());
}
