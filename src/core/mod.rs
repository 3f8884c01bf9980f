mod config;
mod context_manager;
mod diagnostics;
mod resolver;
mod retry_timer;

pub use config::{
    normalize_instance_name, SkylabConfig, SkylabConfigBuilder, DEFAULT_FETCH_RETRY_INTERVAL,
    DEFAULT_FETCH_RETRY_TIMEOUT, DEFAULT_FETCH_TIMEOUT, DEFAULT_INSTANCE_NAME,
    DEFAULT_SERVER_URL, DEFAULT_STORAGE_KEY,
};
pub use context_manager::{
    build_context, context_id, encode_context, library, ContextManager, ContextProvider,
    EnrollmentStore, LIBRARY_NAME,
};
pub use diagnostics::{
    Diagnostic, DiagnosticEvent, DiagnosticObserver, Level, NoopObserver, SharedObserver,
    TracingObserver,
};
pub use resolver::{resolve_variant, Resolution};
pub use retry_timer::{RetryCallback, RetryFuture, RetryState, RetryTimer};
