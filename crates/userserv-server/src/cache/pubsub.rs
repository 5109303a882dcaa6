//! Redis Pub/Sub for cross-instance cache invalidation.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use super::backend::CachedEntry;

/// Channel every instance publishes evicted keys on.
pub const INVALIDATION_CHANNEL: &str = "cache:invalidate";

const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Payload published for `key`: the origin instance id, a space, the key.
pub fn invalidation_message(origin: &str, key: &str) -> String {
    format!("{origin} {key}")
}

/// Splits a payload into `(origin, key)`. Instance ids never contain spaces.
pub fn parse_invalidation_message(payload: &str) -> Option<(&str, &str)> {
    payload
        .split_once(' ')
        .filter(|(origin, key)| !origin.is_empty() && !key.is_empty())
}

/// Cache invalidation listener that subscribes to Redis Pub/Sub.
///
/// ```text
/// Instance 1: cache.set("card:1", ..) or cache.invalidate("card:1")
///   ↓
/// Redis Pub/Sub: PUBLISH cache:invalidate "<instance 1 id> card:1"
///   ↓
/// Instance 2: Listener receives key → removes from L1
/// Instance 1: Listener sees its own id → keeps its L1 entry
/// ```
pub struct CacheInvalidationListener {
    pub redis_url: String,
    pub local_cache: Arc<DashMap<String, CachedEntry>>,
    pub instance_id: String,
}

impl CacheInvalidationListener {
    /// Spawns the listener. It reconnects with exponential backoff (capped at
    /// five minutes) whenever the subscription drops.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut backoff = Duration::from_secs(1);

            loop {
                let err = self.run().await;
                tracing::error!(
                    error = %err,
                    backoff_secs = backoff.as_secs(),
                    "Cache invalidation listener error, reconnecting..."
                );
                tokio::time::sleep(backoff).await;
                backoff = next_backoff(backoff);
            }
        })
    }

    /// Runs one subscription until it fails.
    async fn run(&self) -> String {
        use futures_util::StreamExt;

        let client = match redis::Client::open(self.redis_url.clone()) {
            Ok(client) => client,
            Err(e) => return format!("failed to create Redis client: {e}"),
        };
        let mut pubsub = match client.get_async_pubsub().await {
            Ok(pubsub) => pubsub,
            Err(e) => return format!("failed to get pub/sub connection: {e}"),
        };
        if let Err(e) = pubsub.subscribe(INVALIDATION_CHANNEL).await {
            return format!("failed to subscribe: {e}");
        }

        tracing::info!(channel = INVALIDATION_CHANNEL, "Subscribed to cache invalidation channel");

        let mut stream = pubsub.on_message();
        while let Some(msg) = stream.next().await {
            let payload = match msg.get_payload::<String>() {
                Ok(payload) => payload,
                Err(_) => {
                    tracing::warn!("failed to parse invalidation message payload");
                    continue;
                }
            };
            self.apply(&payload);
        }

        "pub/sub connection closed".to_string()
    }

    /// Drops the L1 entry named by a peer's message.
    fn apply(&self, payload: &str) {
        match parse_invalidation_message(payload) {
            Some((origin, _)) if origin == self.instance_id => {}
            Some((_, key)) => {
                tracing::debug!(key = %key, "received cache invalidation");
                self.local_cache.remove(key);
            }
            None => tracing::warn!(payload = %payload, "malformed invalidation message"),
        }
    }
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}
