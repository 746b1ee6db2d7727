//! Credential resolution for the price API.
//!
//! The resolver tries an ordered list of sources: the external secret store
//! first, then the statically configured fallback. A store failure degrades
//! to the fallback instead of failing the cycle. The resolved credential is
//! cached for the process lifetime; under normal operation the store is hit
//! exactly once. There is no retry inside a single resolve call; the next
//! scheduled cycle is the retry point.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use thiserror::Error;

use crate::errors::ResolveError;

/// Error from the secret store collaborator.
#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("secret not found: {0}")]
    NotFound(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("store failure: {0}")]
    Unavailable(String),
}

/// Key/value secret store reachable by name.
///
/// Implementations may be a managed secret service, the OS keyring, or a
/// local file. `Ok(None)` means the store answered but holds no value under
/// that name.
pub trait SecretStore: Send + Sync {
    fn get_secret(&self, name: &str) -> Result<Option<String>, SecretStoreError>;
}

/// Where a credential came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    SecretStore,
    StaticFallback,
}

/// An opaque API credential plus provenance metadata.
///
/// Never serialized; `Debug` redacts the secret so it cannot leak through
/// log formatting.
#[derive(Clone)]
pub struct Credential {
    secret: String,
    pub source: CredentialSource,
    pub fetched_at: DateTime<Utc>,
}

impl Credential {
    fn new(secret: String, source: CredentialSource) -> Self {
        Self {
            secret,
            source,
            fetched_at: Utc::now(),
        }
    }

    /// The secret value, for building API requests.
    pub fn reveal(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &"<redacted>")
            .field("source", &self.source)
            .field("fetched_at", &self.fetched_at)
            .finish()
    }
}

/// Resolver configuration, fixed for the process lifetime.
#[derive(Clone, Debug)]
pub struct CredentialConfig {
    /// Whether to consult the secret store at all.
    pub use_store: bool,
    /// Name the credential is stored under.
    pub secret_name: String,
    /// Statically configured fallback value; `None` or empty means no
    /// fallback is available.
    pub static_fallback: Option<String>,
}

/// The ordered resolution strategies, tried in sequence.
#[derive(Clone, Copy, Debug)]
enum ResolutionStep {
    StoreLookup,
    StaticFallback,
}

const RESOLUTION_ORDER: &[ResolutionStep] =
    &[ResolutionStep::StoreLookup, ResolutionStep::StaticFallback];

/// Resolves and caches the price API credential.
///
/// The cache is explicit process-scoped state: it lives for the lifetime of
/// this resolver and is dropped only through [`invalidate`](Self::invalidate),
/// which the orchestrator calls when the API signals an auth failure.
pub struct CredentialResolver {
    store: Arc<dyn SecretStore>,
    config: CredentialConfig,
    cached: Mutex<Option<Credential>>,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn SecretStore>, config: CredentialConfig) -> Self {
        Self {
            store,
            config,
            cached: Mutex::new(None),
        }
    }

    /// Resolve a credential, preferring the cache, then the store, then the
    /// static fallback.
    pub fn resolve(&self) -> Result<Credential, ResolveError> {
        let mut cached = self.lock_cache();
        if let Some(credential) = cached.as_ref() {
            debug!("credential cache hit (source {:?})", credential.source);
            return Ok(credential.clone());
        }

        for step in RESOLUTION_ORDER {
            if let Some(credential) = self.try_step(*step) {
                info!("credential resolved from {:?}", credential.source);
                *cached = Some(credential.clone());
                return Ok(credential);
            }
        }

        Err(ResolveError::NoCredential)
    }

    /// Drop the cached credential so the next resolve goes back to the
    /// sources. Called on the auth-failure signal from the quote client.
    pub fn invalidate(&self) {
        let mut cached = self.lock_cache();
        if cached.take().is_some() {
            warn!("cached credential invalidated after auth failure");
        }
    }

    fn try_step(&self, step: ResolutionStep) -> Option<Credential> {
        match step {
            ResolutionStep::StoreLookup => {
                if !self.config.use_store {
                    debug!("secret store disabled, skipping lookup");
                    return None;
                }
                match self.store.get_secret(&self.config.secret_name) {
                    Ok(Some(value)) if !value.is_empty() => {
                        Some(Credential::new(value, CredentialSource::SecretStore))
                    }
                    Ok(_) => {
                        warn!(
                            "secret '{}' empty or missing, degrading to static fallback",
                            self.config.secret_name
                        );
                        None
                    }
                    Err(e) => {
                        // Any store error degrades rather than failing the
                        // cycle. No retry here.
                        warn!(
                            "secret store lookup for '{}' failed ({}), degrading to static fallback",
                            self.config.secret_name, e
                        );
                        None
                    }
                }
            }
            ResolutionStep::StaticFallback => self
                .config
                .static_fallback
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| Credential::new(v.to_string(), CredentialSource::StaticFallback)),
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, Option<Credential>> {
        self.cached.lock().unwrap_or_else(|poisoned| {
            warn!("credential cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counting store double: answers with a fixed result and records how
    /// many lookups were made.
    struct FakeStore {
        result: fn() -> Result<Option<String>, SecretStoreError>,
        lookups: AtomicUsize,
    }

    impl FakeStore {
        fn returning(result: fn() -> Result<Option<String>, SecretStoreError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                lookups: AtomicUsize::new(0),
            })
        }

        fn lookup_count(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    impl SecretStore for FakeStore {
        fn get_secret(&self, _name: &str) -> Result<Option<String>, SecretStoreError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn config(use_store: bool, fallback: Option<&str>) -> CredentialConfig {
        CredentialConfig {
            use_store,
            secret_name: "finnhub-api-key".to_string(),
            static_fallback: fallback.map(str::to_string),
        }
    }

    #[test]
    fn resolves_from_store_and_caches() {
        let store = FakeStore::returning(|| Ok(Some("key-from-store".to_string())));
        let resolver = CredentialResolver::new(store.clone(), config(true, Some("fallback")));

        let first = resolver.resolve().unwrap();
        assert_eq!(first.reveal(), "key-from-store");
        assert_eq!(first.source, CredentialSource::SecretStore);

        // Second resolve is a cache hit: still exactly one store lookup.
        let second = resolver.resolve().unwrap();
        assert_eq!(second.reveal(), "key-from-store");
        assert_eq!(store.lookup_count(), 1);
    }

    #[test]
    fn store_failure_degrades_to_fallback() {
        let store =
            FakeStore::returning(|| Err(SecretStoreError::Unavailable("boom".to_string())));
        let resolver = CredentialResolver::new(store, config(true, Some("static-key")));

        let credential = resolver.resolve().unwrap();
        assert_eq!(credential.reveal(), "static-key");
        assert_eq!(credential.source, CredentialSource::StaticFallback);
    }

    #[test]
    fn store_disabled_uses_fallback_without_lookup() {
        let store = FakeStore::returning(|| Ok(Some("never-used".to_string())));
        let resolver = CredentialResolver::new(store.clone(), config(false, Some("static-key")));

        let credential = resolver.resolve().unwrap();
        assert_eq!(credential.source, CredentialSource::StaticFallback);
        assert_eq!(store.lookup_count(), 0);
    }

    #[test]
    fn empty_fallback_after_store_failure_is_no_credential() {
        let store =
            FakeStore::returning(|| Err(SecretStoreError::NotFound("missing".to_string())));
        let resolver = CredentialResolver::new(store, config(true, Some("")));

        assert!(matches!(
            resolver.resolve(),
            Err(ResolveError::NoCredential)
        ));
    }

    #[test]
    fn no_sources_at_all_is_no_credential() {
        let store = FakeStore::returning(|| Ok(None));
        let resolver = CredentialResolver::new(store, config(false, None));

        assert!(matches!(
            resolver.resolve(),
            Err(ResolveError::NoCredential)
        ));
    }

    #[test]
    fn invalidate_forces_fresh_lookup() {
        let store = FakeStore::returning(|| Ok(Some("key".to_string())));
        let resolver = CredentialResolver::new(store.clone(), config(true, None));

        resolver.resolve().unwrap();
        resolver.invalidate();
        resolver.resolve().unwrap();

        assert_eq!(store.lookup_count(), 2);
    }

    #[test]
    fn debug_output_redacts_secret() {
        let credential =
            Credential::new("super-secret".to_string(), CredentialSource::SecretStore);
        let formatted = format!("{:?}", credential);
        assert!(!formatted.contains("super-secret"));
        assert!(formatted.contains("<redacted>"));
    }
}
