//! Logical-name lookup of the booking data source.
//!
//! A [`DataSourceRegistry`] maps symbolic names to connection pools. The
//! [`DataSourceResolver`] consults the component-scoped name first, falls back
//! to the global name, and caches the first pool it obtains for its own
//! lifetime. Later backend failures are not retried here; they surface from
//! whichever query hit them.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use smiles_core::config::AppConfig;

use crate::connection::{connect_with_settings, DbPool};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("logical name `{0}` is not bound")]
    NotBound(String),
    #[error("could not open data source bound to `{name}`: {source}")]
    Connect {
        name: String,
        #[source]
        source: sqlx::Error,
    },
}

#[derive(Debug, Error)]
#[error(
    "unable to resolve data source via `{scoped_name}` ({scoped_error}) or `{global_name}`: {source}"
)]
pub struct ResolveError {
    pub scoped_name: String,
    pub global_name: String,
    pub scoped_error: LookupError,
    #[source]
    pub source: LookupError,
}

#[async_trait]
pub trait DataSourceRegistry: Send + Sync {
    async fn lookup(&self, name: &str) -> Result<DbPool, LookupError>;
}

/// Registry backed by configured `logical name -> sqlite URL` bindings.
/// Every successful lookup opens a fresh pool.
#[derive(Clone, Debug)]
pub struct ConfiguredRegistry {
    bindings: HashMap<String, String>,
    max_connections: u32,
    timeout_secs: u64,
}

impl ConfiguredRegistry {
    pub fn new(bindings: HashMap<String, String>, max_connections: u32, timeout_secs: u64) -> Self {
        Self { bindings, max_connections, timeout_secs }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let bindings =
            config.datasource.effective_bindings(&config.database.url).into_iter().collect();
        Self::new(bindings, config.database.max_connections, config.database.timeout_secs)
    }

    pub fn binding(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(String::as_str)
    }
}

#[async_trait]
impl DataSourceRegistry for ConfiguredRegistry {
    async fn lookup(&self, name: &str) -> Result<DbPool, LookupError> {
        let url = self.bindings.get(name).ok_or_else(|| LookupError::NotBound(name.to_string()))?;

        connect_with_settings(url, self.max_connections, self.timeout_secs)
            .await
            .map_err(|source| LookupError::Connect { name: name.to_string(), source })
    }
}

/// Registry over pools that are already open.
#[derive(Clone, Debug, Default)]
pub struct PoolRegistry {
    pools: HashMap<String, DbPool>,
}

impl PoolRegistry {
    pub fn bind(mut self, name: impl Into<String>, pool: DbPool) -> Self {
        self.pools.insert(name.into(), pool);
        self
    }
}

#[async_trait]
impl DataSourceRegistry for PoolRegistry {
    async fn lookup(&self, name: &str) -> Result<DbPool, LookupError> {
        self.pools.get(name).cloned().ok_or_else(|| LookupError::NotBound(name.to_string()))
    }
}

pub struct DataSourceResolver {
    registry: Arc<dyn DataSourceRegistry>,
    scoped_name: String,
    global_name: String,
    resolved: OnceCell<DbPool>,
}

impl DataSourceResolver {
    pub fn new(
        registry: Arc<dyn DataSourceRegistry>,
        scoped_name: impl Into<String>,
        global_name: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            scoped_name: scoped_name.into(),
            global_name: global_name.into(),
            resolved: OnceCell::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(ConfiguredRegistry::from_config(config)),
            config.datasource.scoped_name.clone(),
            config.datasource.global_name.clone(),
        )
    }

    /// Resolver that hands out `pool` under the global name.
    pub fn for_pool(pool: DbPool) -> Self {
        let global_name = smiles_core::config::DEFAULT_GLOBAL_NAME;
        Self::new(
            Arc::new(PoolRegistry::default().bind(global_name, pool)),
            smiles_core::config::DEFAULT_SCOPED_NAME,
            global_name,
        )
    }

    pub async fn resolve(&self) -> Result<DbPool, ResolveError> {
        self.resolved.get_or_try_init(|| self.lookup_with_fallback()).await.cloned()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.initialized()
    }

    pub fn scoped_name(&self) -> &str {
        &self.scoped_name
    }

    pub fn global_name(&self) -> &str {
        &self.global_name
    }

    async fn lookup_with_fallback(&self) -> Result<DbPool, ResolveError> {
        let scoped_error = match self.registry.lookup(&self.scoped_name).await {
            Ok(pool) => {
                info!(
                    event_name = "datasource.resolved",
                    logical_name = %self.scoped_name,
                    scope = "scoped",
                    "resolved data source"
                );
                return Ok(pool);
            }
            Err(error) => error,
        };
        warn!(
            event_name = "datasource.lookup_failed",
            logical_name = %self.scoped_name,
            scope = "scoped",
            error = %scoped_error,
            "scoped lookup failed, falling back to global name"
        );

        match self.registry.lookup(&self.global_name).await {
            Ok(pool) => {
                info!(
                    event_name = "datasource.resolved",
                    logical_name = %self.global_name,
                    scope = "global",
                    "resolved data source"
                );
                Ok(pool)
            }
            Err(source) => {
                warn!(
                    event_name = "datasource.lookup_failed",
                    logical_name = %self.global_name,
                    scope = "global",
                    error = %source,
                    "global lookup failed"
                );
                Err(ResolveError {
                    scoped_name: self.scoped_name.clone(),
                    global_name: self.global_name.clone(),
                    scoped_error,
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use sqlx::Row;

    use super::{
        ConfiguredRegistry, DataSourceRegistry, DataSourceResolver, LookupError, PoolRegistry,
    };
    use crate::connection::{connect_with_settings, DbPool};

    const SCOPED: &str = "java:comp/env/jdbc/CarBookingDS";
    const GLOBAL: &str = "jdbc/CarBookingDS";

    /// Records every lookup and delegates to an inner registry.
    struct RecordingRegistry {
        inner: PoolRegistry,
        calls: Mutex<Vec<String>>,
        lookups: AtomicUsize,
    }

    impl RecordingRegistry {
        fn new(inner: PoolRegistry) -> Self {
            Self { inner, calls: Mutex::new(Vec::new()), lookups: AtomicUsize::new(0) }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl DataSourceRegistry for RecordingRegistry {
        async fn lookup(&self, name: &str) -> Result<DbPool, LookupError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.calls.lock().expect("calls lock").push(name.to_string());
            self.inner.lookup(name).await
        }
    }

    async fn memory_pool() -> DbPool {
        connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect")
    }

    async fn tag(pool: &DbPool, label: &str) {
        sqlx::query("CREATE TABLE marker (label TEXT NOT NULL)")
            .execute(pool)
            .await
            .expect("create marker");
        sqlx::query("INSERT INTO marker (label) VALUES (?)")
            .bind(label)
            .execute(pool)
            .await
            .expect("insert marker");
    }

    async fn read_tag(pool: &DbPool) -> String {
        sqlx::query("SELECT label FROM marker")
            .fetch_one(pool)
            .await
            .expect("read marker")
            .get::<String, _>("label")
    }

    #[tokio::test]
    async fn prefers_scoped_name_when_bound() {
        let scoped = memory_pool().await;
        let global = memory_pool().await;
        tag(&scoped, "scoped").await;
        tag(&global, "global").await;

        let registry = Arc::new(RecordingRegistry::new(
            PoolRegistry::default().bind(SCOPED, scoped).bind(GLOBAL, global),
        ));
        let resolver = DataSourceResolver::new(registry.clone(), SCOPED, GLOBAL);

        let pool = resolver.resolve().await.expect("resolve");

        assert_eq!(read_tag(&pool).await, "scoped");
        assert_eq!(registry.calls(), vec![SCOPED.to_string()]);
    }

    #[tokio::test]
    async fn falls_back_to_global_name_when_scoped_lookup_fails() {
        let global = memory_pool().await;
        tag(&global, "global").await;

        let registry =
            Arc::new(RecordingRegistry::new(PoolRegistry::default().bind(GLOBAL, global)));
        let resolver = DataSourceResolver::new(registry.clone(), SCOPED, GLOBAL);

        let pool = resolver.resolve().await.expect("resolve via global name");

        assert_eq!(read_tag(&pool).await, "global");
        assert_eq!(registry.calls(), vec![SCOPED.to_string(), GLOBAL.to_string()]);
    }

    #[tokio::test]
    async fn fails_only_when_both_names_are_unbound() {
        let registry = Arc::new(RecordingRegistry::new(PoolRegistry::default()));
        let resolver = DataSourceResolver::new(registry, SCOPED, GLOBAL);

        let error = resolver.resolve().await.expect_err("nothing is bound");

        assert_eq!(error.scoped_name, SCOPED);
        assert_eq!(error.global_name, GLOBAL);
        assert!(matches!(error.scoped_error, LookupError::NotBound(ref name) if name == SCOPED));
        assert!(matches!(error.source, LookupError::NotBound(ref name) if name == GLOBAL));
        assert!(!resolver.is_resolved());
    }

    #[tokio::test]
    async fn caches_the_first_successful_resolution() {
        let global = memory_pool().await;
        let registry =
            Arc::new(RecordingRegistry::new(PoolRegistry::default().bind(GLOBAL, global)));
        let resolver = DataSourceResolver::new(registry.clone(), SCOPED, GLOBAL);

        resolver.resolve().await.expect("first resolve");
        resolver.resolve().await.expect("second resolve");
        resolver.resolve().await.expect("third resolve");

        assert!(resolver.is_resolved());
        assert_eq!(registry.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn configured_registry_reports_unbound_names() {
        let registry = ConfiguredRegistry::new(
            HashMap::from([(GLOBAL.to_string(), "sqlite::memory:".to_string())]),
            1,
            5,
        );

        let error = registry.lookup(SCOPED).await.expect_err("scoped name is unbound");
        assert!(matches!(error, LookupError::NotBound(_)));

        let pool = registry.lookup(GLOBAL).await.expect("global name connects");
        sqlx::query("SELECT 1").execute(&pool).await.expect("pool is usable");
    }

    #[tokio::test]
    async fn configured_registry_surfaces_connect_failures() {
        let registry = ConfiguredRegistry::new(
            HashMap::from([(GLOBAL.to_string(), "sqlite:///nonexistent-dir/x/y.db".to_string())]),
            1,
            1,
        );

        let error = registry.lookup(GLOBAL).await.expect_err("directory does not exist");
        assert!(matches!(error, LookupError::Connect { ref name, .. } if name == GLOBAL));
    }
}
