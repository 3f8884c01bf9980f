use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::{
    context_id, encode_context, resolve_variant, ContextManager, ContextProvider, Diagnostic,
    DiagnosticEvent, DiagnosticObserver, EnrollmentStore, RetryCallback, RetryFuture, RetryState,
    RetryTimer, SharedObserver, SkylabConfig, TracingObserver,
};
use crate::error::{Result, SkylabError};
use crate::http::{build_fetch_request, HttpClient, ReqwestHttpClient, DEBUG_PARAM_LENGTH};
use crate::storage::{LocalStorage, MemoryBackend, Storage, StorageBackend};
use crate::types::{FlagAssignment, SkylabUser, Variant, VariantMap, VariantSource};
use crate::utils::random_string;

pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

struct ClientInner {
    api_key: String,
    config: SkylabConfig,
    http_client: Arc<dyn HttpClient>,
    storage: RwLock<Box<dyn Storage>>,
    context: ContextManager,
    retry_timer: RetryTimer,
    generation: AtomicU64,
    observer: SharedObserver,
}

/// Resolves variants for the current user and keeps them fresh.
///
/// `get_variant` and `get_variants` answer synchronously from the local
/// store. `start` and `set_user` fetch in the background of the caller's
/// await and never fail; problems are reported to the configured
/// [`DiagnosticObserver`](crate::core::DiagnosticObserver) and, when retries
/// are enabled, retried every `fetch_retry_interval` until a fetch succeeds.
///
/// Cloning is cheap and clones share state. The retry timer stops when
/// [`SkylabClient::close`] is called or the last clone is dropped.
#[derive(Clone)]
pub struct SkylabClient {
    inner: Arc<ClientInner>,
}

impl SkylabClient {
    /// Create a client with the default transport and in-memory persistence.
    ///
    /// An empty `api_key` yields an inert client: lookups return an empty
    /// variant and no requests are made.
    pub fn new(api_key: impl Into<String>, config: SkylabConfig) -> Result<Self> {
        Self::builder(api_key).config(config).build()
    }

    pub fn builder(api_key: impl Into<String>) -> SkylabClientBuilder {
        SkylabClientBuilder::new(api_key)
    }

    pub fn config(&self) -> &SkylabConfig {
        &self.inner.config
    }

    /// Load persisted variants and fetch for `user`.
    ///
    /// With `prefer_initial_flags`, `initial_flags` are seeded into the store
    /// first so they take precedence over cached values until the fetch
    /// completes.
    pub async fn start(&self, user: SkylabUser) {
        let inner = &self.inner;
        inner.context.set_user(user.clone());
        inner.load_storage();

        if inner.config.prefer_initial_flags && !inner.config.initial_flags.is_empty() {
            let mut storage = inner.storage.write();
            for (key, variant) in &inner.config.initial_flags {
                storage.put(key.clone(), variant.clone());
            }
        }

        let _ = inner
            .fetch_all(&user, inner.config.fetch_timeout, inner.config.fetch_retry)
            .await;
    }

    /// Switch to a new user and fetch their variants.
    ///
    /// Variants of the previous user keep being served until the fetch
    /// completes.
    pub async fn set_user(&self, user: SkylabUser) {
        let inner = &self.inner;
        inner.context.set_user(user.clone());

        let _ = inner
            .fetch_all(&user, inner.config.fetch_timeout, inner.config.fetch_retry)
            .await;
    }

    /// Install a provider whose identity fields override the user's on the
    /// next fetch.
    pub fn set_context_provider(&self, provider: impl ContextProvider + 'static) {
        self.inner.context.set_provider(Arc::new(provider));
    }

    /// One fetch cycle: request, parse, replace the store.
    ///
    /// When `enable_retry` is set, an armed retry timer is cancelled before
    /// the request and re-armed if the cycle fails.
    pub async fn fetch_all(
        &self,
        user: &SkylabUser,
        timeout: Duration,
        enable_retry: bool,
    ) -> Result<VariantMap> {
        self.inner.fetch_all(user, timeout, enable_retry).await
    }

    /// Variant for `flag_key`, never blocking and never failing.
    pub fn get_variant(&self, flag_key: &str, fallback: Option<Variant>) -> Variant {
        let inner = &self.inner;
        if inner.api_key.is_empty() {
            inner.emit_resolved(flag_key, &Variant::empty(), VariantSource::Inert);
            return Variant::empty();
        }

        let resolution = {
            let storage = inner.storage.read();
            resolve_variant(flag_key, &**storage, fallback, &inner.config)
        };

        inner.emit_resolved(flag_key, &resolution.variant, resolution.source);
        resolution.variant
    }

    /// Snapshot of every stored variant.
    pub fn get_variants(&self) -> VariantMap {
        if self.inner.api_key.is_empty() {
            return VariantMap::new();
        }
        self.inner.storage.read().get_all()
    }

    /// The user most recently passed to `start` or `set_user`.
    pub fn user(&self) -> SkylabUser {
        self.inner.context.user()
    }

    /// Whether a background retry loop is running.
    pub fn is_retrying(&self) -> bool {
        self.inner.retry_timer.is_armed()
    }

    pub fn retry_state(&self) -> RetryState {
        self.inner.retry_timer.state()
    }

    /// Stop background retries. The client stays usable.
    pub fn close(&self) {
        self.inner.stop_retries();
    }
}

impl ClientInner {
    fn emit(&self, event: DiagnosticEvent) {
        self.observer.on_event(&Diagnostic::new(event));
    }

    fn emit_resolved(&self, flag_key: &str, variant: &Variant, source: VariantSource) {
        if self.config.debug {
            self.emit(DiagnosticEvent::VariantResolved {
                flag_key: flag_key.to_string(),
                value: variant.value.clone(),
                source,
            });
        }
    }

    /// Backend I/O runs under the read lock so lookups keep flowing; only
    /// the swap takes the write lock.
    fn load_storage(&self) {
        let result = self.storage.read().read_persisted();
        match result {
            Ok(variants) => self.storage.write().replace(variants),
            Err(e) => {
                self.storage.write().clear();
                self.emit(DiagnosticEvent::storage_load_failed(&e));
            }
        }
    }

    async fn fetch_all(
        self: &Arc<Self>,
        user: &SkylabUser,
        timeout: Duration,
        enable_retry: bool,
    ) -> Result<VariantMap> {
        if self.api_key.is_empty() {
            return Err(SkylabError::missing_api_key());
        }

        // A deliberate fetch replaces any background retry loop.
        if enable_retry {
            self.stop_retries();
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.emit(DiagnosticEvent::FetchStarted {
            generation,
            timeout,
        });

        let result = self.do_fetch(user, timeout).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            self.emit(DiagnosticEvent::FetchSuperseded { generation });
            return Err(result.err().unwrap_or_else(|| SkylabError::superseded(generation)));
        }

        match result {
            Ok(variants) => {
                self.store_variants(&variants);
                self.stop_retries();
                self.emit(DiagnosticEvent::FetchSucceeded {
                    generation,
                    variants: variants.len(),
                });
                Ok(variants)
            }
            Err(e) => {
                self.emit(DiagnosticEvent::fetch_failed(generation, &e));
                if enable_retry {
                    self.start_retries();
                }
                Err(e)
            }
        }
    }

    async fn do_fetch(&self, user: &SkylabUser, timeout: Duration) -> Result<VariantMap> {
        let request = {
            let context = self.context.build(user);
            let encoded = encode_context(&context);
            let debug_param = self
                .config
                .debug_assignment_requests
                .then(|| random_string(DEBUG_PARAM_LENGTH));

            if self.config.debug {
                tracing::debug!("[Skylab] Fetch variants for user: {:?}", context);
            }

            build_fetch_request(
                &self.config.request_style,
                &self.config.server_url,
                &self.api_key,
                &encoded,
                context_id(&context),
                debug_param.as_deref(),
            )
        };

        let response = self
            .http_client
            .request_with_timeout(timeout, request)
            .await?
            .error_for_status()?;

        let assignments: HashMap<String, FlagAssignment> = response.json()?;
        Ok(assignments
            .into_iter()
            .map(|(key, assignment)| (key, Variant::from(assignment)))
            .collect())
    }

    /// Clear, put every entry, save. Readers see either the old or the new
    /// mapping because the write lock spans the whole in-memory replacement.
    fn store_variants(&self, variants: &VariantMap) {
        {
            let mut storage = self.storage.write();
            storage.clear();
            for (key, variant) in variants {
                storage.put(key.clone(), variant.clone());
            }
        }

        let result = self.storage.read().save();
        if let Err(e) = result {
            self.emit(DiagnosticEvent::storage_save_failed(&e));
        }
    }

    fn start_retries(self: &Arc<Self>) {
        let interval = self.retry_timer.interval();
        let timeout = self.config.fetch_retry_timeout;
        if interval.is_zero() || timeout.is_zero() {
            self.emit(DiagnosticEvent::RetryUnavailable { interval, timeout });
            return;
        }

        let client = Arc::downgrade(self);
        let on_tick: RetryCallback = Arc::new(move || -> RetryFuture {
            let client = client.clone();
            Box::pin(async move {
                let Some(inner) = client.upgrade() else {
                    return;
                };
                inner.emit(DiagnosticEvent::RetryTick);
                let user = inner.context.user();
                let _ = inner
                    .fetch_all(&user, inner.config.fetch_retry_timeout, false)
                    .await;
            })
        });

        if self.retry_timer.arm(on_tick) {
            self.emit(DiagnosticEvent::RetryArmed { interval });
        } else {
            self.emit(DiagnosticEvent::RetryAlreadyArmed);
        }
    }

    fn stop_retries(&self) {
        if self.retry_timer.cancel() {
            self.emit(DiagnosticEvent::RetryCancelled);
        }
    }
}

/// Builder for [`SkylabClient`] with pluggable collaborators.
pub struct SkylabClientBuilder {
    api_key: String,
    config: SkylabConfig,
    http_client: Option<Arc<dyn HttpClient>>,
    backend: Option<Arc<dyn StorageBackend>>,
    storage: Option<Box<dyn Storage>>,
    observer: Option<SharedObserver>,
    context_provider: Option<Arc<dyn ContextProvider>>,
}

impl SkylabClientBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            config: SkylabConfig::default(),
            http_client: None,
            backend: None,
            storage: None,
            observer: None,
            context_provider: None,
        }
    }

    pub fn config(mut self, config: SkylabConfig) -> Self {
        self.config = config;
        self
    }

    pub fn http_client(mut self, client: impl HttpClient + 'static) -> Self {
        self.http_client = Some(Arc::new(client));
        self
    }

    pub fn shared_http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Medium for the default variant store and the enrollment id.
    pub fn storage_backend(mut self, backend: impl StorageBackend + 'static) -> Self {
        self.backend = Some(Arc::new(backend));
        self
    }

    /// Replace the variant store entirely. The backend, if any, still holds
    /// the enrollment id.
    pub fn storage(mut self, storage: impl Storage + 'static) -> Self {
        self.storage = Some(Box::new(storage));
        self
    }

    pub fn observer(mut self, observer: impl DiagnosticObserver + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn shared_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn context_provider(mut self, provider: impl ContextProvider + 'static) -> Self {
        self.context_provider = Some(Arc::new(provider));
        self
    }

    pub fn build(self) -> Result<SkylabClient> {
        self.config.validate()?;

        let http_client: Arc<dyn HttpClient> = match self.http_client {
            Some(client) => client,
            None => Arc::new(ReqwestHttpClient::new()?),
        };

        let backend: Arc<dyn StorageBackend> = match self.backend {
            Some(backend) => backend,
            None => Arc::new(MemoryBackend::new()),
        };

        let storage = match self.storage {
            Some(storage) => storage,
            None => Box::new(LocalStorage::for_api_key(&self.api_key, Arc::clone(&backend))),
        };

        let context = ContextManager::new(EnrollmentStore::new(
            backend,
            self.config.storage_key.clone(),
        ));
        if let Some(provider) = self.context_provider {
            context.set_provider(provider);
        }

        let retry_timer = RetryTimer::new(self.config.fetch_retry_interval);

        Ok(SkylabClient {
            inner: Arc::new(ClientInner {
                api_key: self.api_key,
                config: self.config,
                http_client,
                storage: RwLock::new(storage),
                context,
                retry_timer,
                generation: AtomicU64::new(0),
                observer: self.observer.unwrap_or_else(|| Arc::new(TracingObserver)),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpRequest, HttpResponse};
    use async_trait::async_trait;

    struct StaticClient {
        body: &'static str,
    }

    #[async_trait]
    impl HttpClient for StaticClient {
        async fn request(&self, _request: HttpRequest) -> Result<HttpResponse> {
            Ok(HttpResponse::new(200, self.body))
        }
    }

    fn client(api_key: &str, config: SkylabConfig) -> SkylabClient {
        SkylabClient::builder(api_key)
            .config(config)
            .http_client(StaticClient {
                body: r#"{"flag":{"key":"on","payload":{"pct":50}}}"#,
            })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_start_stores_fetched_variants() {
        let client = client("client-key", SkylabConfig::default());

        client.start(SkylabUser::with_user_id("u1")).await;

        assert_eq!(
            client.get_variant("flag", None),
            Variant::with_payload("on", serde_json::json!({"pct": 50}))
        );
        assert!(!client.is_retrying());
    }

    #[tokio::test]
    async fn test_empty_key_is_inert() {
        let client = client("", SkylabConfig::builder().fallback_variant("off").build());

        client.start(SkylabUser::with_user_id("u1")).await;

        assert_eq!(client.get_variant("flag", None), Variant::empty());
        assert!(client.get_variants().is_empty());
        assert!(!client.is_retrying());
    }

    #[tokio::test]
    async fn test_fetch_all_rejects_missing_key() {
        let client = client("", SkylabConfig::default());

        let error = client
            .fetch_all(&SkylabUser::new(), Duration::from_millis(500), true)
            .await
            .unwrap_err();

        assert!(error.is_config_error());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = SkylabClient::builder("client-key")
            .config(SkylabConfig::builder().server_url("").build())
            .http_client(StaticClient { body: "{}" })
            .build();

        assert!(result.is_err());
    }
}
