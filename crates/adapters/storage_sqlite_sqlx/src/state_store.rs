//! `SQLite` implementation of [`StateStore`].

use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;

use lightcontrol_app::message_bus::InProcessMessageBus;
use lightcontrol_app::ports::{StateStore, Subscription};
use lightcontrol_domain::error::LightControlError;

use crate::error::StorageError;
use crate::pool::Database;

const UPSERT: &str = r"
    INSERT INTO kv_entries (key, value, expires_at, updated_at)
    VALUES (?, ?, ?, ?)
    ON CONFLICT (key) DO UPDATE
    SET value = excluded.value, expires_at = excluded.expires_at, updated_at = excluded.updated_at
";

const SELECT_LIVE: &str = r"
    SELECT value FROM kv_entries
    WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)
";

const DELETE_EXPIRED: &str =
    "DELETE FROM kv_entries WHERE expires_at IS NOT NULL AND expires_at <= ?";

/// `SQLite`-backed key/value state with in-process channels.
pub struct SqliteStateStore {
    pool: SqlitePool,
    bus: InProcessMessageBus,
}

impl SqliteStateStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            bus: InProcessMessageBus::default(),
        }
    }

    #[must_use]
    pub fn from_database(database: &Database) -> Self {
        Self::new(database.pool().clone())
    }

    /// Delete every expired key, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the delete fails.
    pub async fn purge_expired(&self) -> Result<u64, StorageError> {
        let result = sqlx::query(DELETE_EXPIRED)
            .bind(now_millis())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn upsert(
        &self,
        key: &str,
        value: &str,
        expires_at: Option<i64>,
    ) -> Result<(), StorageError> {
        sqlx::query(UPSERT)
            .bind(key)
            .bind(value)
            .bind(expires_at)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl StateStore for SqliteStateStore {
    async fn get(&self, key: &str) -> Result<Option<String>, LightControlError> {
        let row: Option<(String,)> = sqlx::query_as(SELECT_LIVE)
            .bind(key)
            .bind(now_millis())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), LightControlError> {
        self.upsert(key, value, None).await?;
        Ok(())
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), LightControlError> {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now_millis().saturating_add(ttl_millis);
        self.upsert(key, value, Some(expires_at)).await?;

        let purged = self.purge_expired().await?;
        if purged > 0 {
            tracing::trace!(purged, "expired keys removed");
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, LightControlError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), LightControlError> {
        let receivers = self.bus.publish(channel, payload);
        tracing::trace!(channel, receivers, "published");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, LightControlError> {
        Ok(self.bus.subscribe(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;

    async fn setup() -> SqliteStateStore {
        let db = Config::new("sqlite::memory:").build().await.unwrap();
        SqliteStateStore::from_database(&db)
    }

    #[tokio::test]
    async fn should_return_none_when_key_missing() {
        let store = setup().await;
        assert_eq!(store.get("lightcontrol-state-1-on").await.unwrap(), None);
        assert!(!store.exists("lightcontrol-state-1-on").await.unwrap());
    }

    #[tokio::test]
    async fn should_read_back_written_value() {
        let store = setup().await;
        store.set("lightcontrol-state-1-on", "true").await.unwrap();
        assert_eq!(
            store.get("lightcontrol-state-1-on").await.unwrap().as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn should_overwrite_value_and_clear_expiry() {
        let store = setup().await;
        store
            .set_with_expiry("k", "old", Duration::from_secs(60))
            .await
            .unwrap();
        store.set("k", "new").await.unwrap();

        let expires_at: (Option<i64>,) =
            sqlx::query_as("SELECT expires_at FROM kv_entries WHERE key = 'k'")
                .fetch_one(&store.pool)
                .await
                .unwrap();
        assert_eq!(expires_at.0, None);
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn should_hide_key_once_expired() {
        let store = setup().await;
        store
            .set_with_expiry("marker", "{}", Duration::ZERO)
            .await
            .unwrap();
        assert!(!store.exists("marker").await.unwrap());
    }

    #[tokio::test]
    async fn should_keep_key_until_ttl_elapses() {
        let store = setup().await;
        store
            .set_with_expiry("marker", "{}", Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(store.exists("marker").await.unwrap());
    }

    #[tokio::test]
    async fn should_purge_expired_rows() {
        let store = setup().await;
        store.set("keep", "1").await.unwrap();
        sqlx::query("INSERT INTO kv_entries (key, value, expires_at, updated_at) VALUES ('gone', '1', 0, '')")
            .execute(&store.pool)
            .await
            .unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(store.exists("keep").await.unwrap());
    }

    #[tokio::test]
    async fn should_deliver_published_payload_to_subscriber() {
        let store = setup().await;
        let mut sub = store
            .subscribe("lightcontrol-control-pubsub")
            .await
            .unwrap();

        store
            .publish("lightcontrol-control-pubsub", r#"{"command":"sync"}"#)
            .await
            .unwrap();

        assert_eq!(sub.recv().await.as_deref(), Some(r#"{"command":"sync"}"#));
    }
}
