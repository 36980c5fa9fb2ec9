// src/storage/token_storage.rs
//! Storage for verifier session tokens.
//!
//! Maps a verifier-assigned session id to the opaque bearer token needed to
//! fetch that session's result. Two backends share the [`TokenStorage`]
//! capability set and one is picked at startup by [`token_storage_from_config`]:
//! - [`InMemoryTokenStorage`]: mutex-guarded map living as long as the process
//! - [`RedisTokenStorage`]: namespaced keys with a 24 hour expiry

use crate::config::{RedisConfig, StorageConfig, StorageType};
use crate::error::StoreError;
use async_trait::async_trait;
use redis::aio::{ConnectionLike, ConnectionManager};
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Maximum lifetime of a stored token.
pub const TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Session token storage. Implementations must be safe for concurrent use.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Stores the verifier token for a session.
    ///
    /// # Arguments
    /// * `session_id` - Session identifier derived from the session pointer
    /// * `token` - Opaque bearer token issued by the verifier
    ///
    /// # Behavior
    /// Overwrites any existing token for the same session
    async fn store_token(&self, session_id: &str, token: &str) -> Result<(), StoreError>;

    /// Retrieves the token for a session.
    ///
    /// # Returns
    /// - `Ok(token)` if present
    /// - `Err(StoreError::TokenNotFound)` if absent or expired
    async fn retrieve_token(&self, session_id: &str) -> Result<String, StoreError>;

    /// Removes the token for a session.
    ///
    /// # Returns
    /// - `Ok(())` if a token was removed
    /// - `Err(StoreError::TokenNotFound)` if it was already gone, so callers
    ///   can detect double consumption
    async fn remove_token(&self, session_id: &str) -> Result<(), StoreError>;
}

/// Builds the backend selected in the configuration.
///
/// # Arguments
/// * `config` - Storage section of the service configuration
///
/// # Returns
/// The selected backend behind a shared trait object, or the redis
/// connection error when the durable backend cannot be reached
pub async fn token_storage_from_config(
    config: &StorageConfig,
) -> Result<Arc<dyn TokenStorage>, StoreError> {
    match config.storage_type {
        StorageType::InMemory => {
            log::info!("using in-memory token storage");
            Ok(Arc::new(InMemoryTokenStorage::new()))
        }
        StorageType::Redis => {
            let storage = RedisTokenStorage::connect(&config.redis_config).await?;
            log::info!(
                "using redis token storage at {}:{} (namespace {:?})",
                config.redis_config.host,
                config.redis_config.port,
                config.redis_config.namespace
            );
            Ok(Arc::new(storage))
        }
    }
}

// ------------------------------------------------------------------------------

/// Mutex-guarded map living as long as the process. Entries never expire.
#[derive(Default)]
pub struct InMemoryTokenStorage {
    tokens: Mutex<HashMap<String, String>>,
}

impl InMemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStorage for InMemoryTokenStorage {
    async fn store_token(&self, session_id: &str, token: &str) -> Result<(), StoreError> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id.to_string(), token.to_string());
        Ok(())
    }

    async fn retrieve_token(&self, session_id: &str) -> Result<String, StoreError> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
            .ok_or_else(|| StoreError::TokenNotFound(session_id.to_string()))
    }

    async fn remove_token(&self, session_id: &str) -> Result<(), StoreError> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::TokenNotFound(session_id.to_string()))
    }
}

// ------------------------------------------------------------------------------

/// Redis-backed storage. Expiry is enforced by redis itself.
///
/// Generic over the connection so the command sequence can be checked
/// against a scripted connection; production code uses [`ConnectionManager`].
#[derive(Clone)]
pub struct RedisTokenStorage<C = ConnectionManager> {
    conn: C,
    namespace: String,
}

impl RedisTokenStorage<ConnectionManager> {
    /// Opens a managed (auto-reconnecting) connection to the configured server.
    ///
    /// # Arguments
    /// * `config` - Host, port, optional password and key namespace
    ///
    /// # Returns
    /// - `Ok(RedisTokenStorage)` once the first connection is established
    /// - `Err(StoreError::Backend)` if the server cannot be reached
    pub async fn connect(config: &RedisConfig) -> Result<Self, StoreError> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: RedisConnectionInfo {
                db: 0,
                password: config.password.clone().filter(|p| !p.is_empty()),
                ..Default::default()
            },
        };
        let client = redis::Client::open(info)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::with_connection(conn, config.namespace.clone()))
    }
}

impl<C> RedisTokenStorage<C> {
    /// Wraps an already established connection.
    ///
    /// # Arguments
    /// * `conn` - Any async redis connection
    /// * `namespace` - Prefix for every key, e.g. `boarding-pass`
    pub fn with_connection(conn: C, namespace: impl Into<String>) -> Self {
        RedisTokenStorage {
            conn,
            namespace: namespace.into(),
        }
    }

    fn key(&self, session_id: &str) -> String {
        token_key(&self.namespace, session_id)
    }
}

fn token_key(namespace: &str, session_id: &str) -> String {
    format!("{}:token:{}", namespace, session_id)
}

#[async_trait]
impl<C> TokenStorage for RedisTokenStorage<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    /// `SETEX` with [`TOKEN_TTL`]; an existing key is overwritten and its
    /// expiry restarted.
    async fn store_token(&self, session_id: &str, token: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(self.key(session_id), token, TOKEN_TTL.as_secs())
            .await?;
        Ok(())
    }

    async fn retrieve_token(&self, session_id: &str) -> Result<String, StoreError> {
        let mut conn = self.conn.clone();
        let token: Option<String> = conn.get(self.key(session_id)).await?;
        token.ok_or_else(|| StoreError::TokenNotFound(session_id.to_string()))
    }

    /// `DEL` reporting zero removed keys means the token was already gone.
    async fn remove_token(&self, session_id: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(self.key(session_id)).await?;
        if removed == 0 {
            return Err(StoreError::TokenNotFound(session_id.to_string()));
        }
        Ok(())
    }
}
