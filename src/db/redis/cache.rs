use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::error::AppResult;
use crate::models::SteamId;

/// Cache keys for the per-user Steam Web API lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    PlayerSummary(SteamId),
    FriendList(SteamId),
    OwnedGames(SteamId),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::PlayerSummary(id) => write!(f, "summary:{}", id),
            CacheKey::FriendList(id) => write!(f, "friends:{}", id),
            CacheKey::OwnedGames(id) => write!(f, "owned:{}", id),
        }
    }
}

/// Creates a Redis client for caching Steam API responses
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// A cache write queued for the background writer
struct PendingWrite {
    key: String,
    value: String,
    ttl: u64,
}

/// Read-through cache over Redis.
///
/// Reads are performed inline; writes go through a background task so that
/// caching never delays a response. Per-user entries can be dropped with
/// [`Cache::invalidate_user`], which the aggregation path uses when Steam
/// reports a profile as private.
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<PendingWrite>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Signals the writer task to flush pending writes and stop.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a new Cache and spawns its background write task
    pub async fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client,
            write_tx,
        };

        let handle = CacheWriterHandle { shutdown_tx };

        (cache, handle)
    }

    /// Drains queued writes into Redis until shut down, then flushes the rest.
    async fn writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<PendingWrite>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(write) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&client, write).await {
                        tracing::error!(error = %e, "Failed to write to Redis cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Cache writer shutting down, flushing remaining writes");

                    while let Ok(write) = write_rx.try_recv() {
                        if let Err(e) = Self::write_to_redis(&client, write).await {
                            tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    async fn write_to_redis(client: &Client, write: PendingWrite) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(write.key, write.value, write.ttl).await?;
        Ok(())
    }

    /// Retrieves and deserializes a cached value, `None` on a miss.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(format!("{}", key)).await?;

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Queues a value for caching without blocking the caller.
    ///
    /// Serialization failures and Redis errors are logged, not surfaced: a
    /// response must not fail because its side-channel write did.
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let write = PendingWrite {
            key: format!("{}", key),
            value: json,
            ttl,
        };

        if let Err(e) = self.write_tx.send(write) {
            tracing::error!(error = %e, "Failed to queue cache write");
        }
    }

    /// Drops every cached entry for one user.
    ///
    /// Called when Steam reports the user's profile as private, so that a
    /// retry after the user relaxes their settings is not served the stale
    /// negative payload for the remainder of its TTL.
    pub async fn invalidate_user(&self, steam_id: &SteamId) -> AppResult<()> {
        let keys: Vec<String> = [
            CacheKey::PlayerSummary(steam_id.clone()),
            CacheKey::FriendList(steam_id.clone()),
            CacheKey::OwnedGames(steam_id.clone()),
        ]
        .iter()
        .map(|k| format!("{}", k))
        .collect();

        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(keys).await?;

        tracing::info!(steam_id = %steam_id, "Invalidated cached Steam data");
        Ok(())
    }
}
