//! Settings table operations
//!
//! Flat string key/value rows. A stored NULL reads back as absent.

use super::CacheStore;
use std::collections::BTreeMap;
use stockroom_common::Result;

impl CacheStore {
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value: Option<Option<String>> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value.flatten())
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upsert several settings in one transaction
    pub async fn set_settings<'a, I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut tx = self.pool.begin().await?;
        for (key, value) in entries {
            sqlx::query(
                "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Every non-null setting, sorted by key
    pub async fn all_settings(&self) -> Result<BTreeMap<String, String>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM settings WHERE value IS NOT NULL")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().collect())
    }

    pub async fn clear_settings(&self) -> Result<()> {
        sqlx::query("DELETE FROM settings").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::memory_store;

    #[tokio::test]
    async fn test_get_setting_not_exists() {
        let store = memory_store().await;
        assert_eq!(store.get_setting("api_key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_setting_upserts() {
        let store = memory_store().await;

        store.set_setting("api_key", "old").await.unwrap();
        store.set_setting("api_key", "new").await.unwrap();

        assert_eq!(store.get_setting("api_key").await.unwrap().as_deref(), Some("new"));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings WHERE key = 'api_key'")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1, "Should have exactly one entry after update");
    }

    #[tokio::test]
    async fn test_null_value_reads_as_absent() {
        let store = memory_store().await;
        sqlx::query("INSERT INTO settings (key, value) VALUES ('view_id', NULL)")
            .execute(store.pool())
            .await
            .unwrap();

        assert_eq!(store.get_setting("view_id").await.unwrap(), None);
        assert!(store.all_settings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_settings_and_clear() {
        let store = memory_store().await;
        store
            .set_settings([("api_key", "k"), ("employee_name", "Sam")])
            .await
            .unwrap();

        let all = store.all_settings().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["employee_name"], "Sam");

        store.clear_settings().await.unwrap();
        assert!(store.all_settings().await.unwrap().is_empty());
    }
}
