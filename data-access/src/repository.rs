//! Repository implementations for the persisted stores

use async_trait::async_trait;
use link_engine_core::{BlockedUrl, CacheError, MetadataEntry, PreviewImage, now_ms};
use rusqlite::Row;
use std::sync::Arc;
use tokio_rusqlite::Connection;
use tracing::debug;

/// Repository trait for the link metadata cache
#[async_trait]
pub trait MetadataRepository: Send + Sync {
    async fn get(&self, url: &str) -> Result<Option<MetadataEntry>, CacheError>;
    async fn get_all(&self) -> Result<Vec<MetadataEntry>, CacheError>;
    async fn upsert(&self, entry: &MetadataEntry) -> Result<(), CacheError>;
    async fn remove(&self, url: &str) -> Result<(), CacheError>;
    async fn remove_all(&self) -> Result<(), CacheError>;
}

/// Repository trait for the blocked-URL set
#[async_trait]
pub trait BlocklistRepository: Send + Sync {
    async fn add(&self, url: &str) -> Result<(), CacheError>;
    async fn remove(&self, url: &str) -> Result<(), CacheError>;
    async fn remove_all(&self) -> Result<(), CacheError>;
    async fn get_all(&self) -> Result<Vec<BlockedUrl>, CacheError>;
    async fn contains(&self, url: &str) -> Result<bool, CacheError>;
}

/// Helper function to map a row to MetadataEntry
fn row_to_entry(row: &Row) -> rusqlite::Result<MetadataEntry> {
    let url: String = row.get(0)?;
    let images_json: Option<String> = row.get(1)?;
    let description: Option<String> = row.get(2)?;
    let fetched_at: i64 = row.get(3)?;

    let images: Option<Vec<PreviewImage>> =
        images_json.and_then(|json| serde_json::from_str(&json).ok());

    Ok(MetadataEntry {
        url,
        images,
        description,
        fetched_at,
    })
}

/// Helper function to map a row to BlockedUrl
fn row_to_blocked(row: &Row) -> rusqlite::Result<BlockedUrl> {
    Ok(BlockedUrl {
        url: row.get(0)?,
        blocked_at: row.get(1)?,
    })
}

/// SQLite implementation of MetadataRepository
pub struct SqliteMetadataRepository {
    connection: Arc<Connection>,
}

impl SqliteMetadataRepository {
    pub fn new(connection: Arc<Connection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl MetadataRepository for SqliteMetadataRepository {
    async fn get(&self, url: &str) -> Result<Option<MetadataEntry>, CacheError> {
        let url = url.to_string();
        self.connection
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT url, images, description, fetched_at FROM link_metadata WHERE url = ?1",
                )?;
                let mut rows = stmt.query_map(rusqlite::params![url], row_to_entry)?;
                match rows.next() {
                    Some(row) => Ok(Some(row?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(|e| CacheError::Read {
                reason: format!("Failed to read metadata entry: {}", e),
            })
    }

    async fn get_all(&self) -> Result<Vec<MetadataEntry>, CacheError> {
        self.connection
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT url, images, description, fetched_at FROM link_metadata ORDER BY fetched_at DESC",
                )?;
                let rows = stmt.query_map([], row_to_entry)?;
                let mut entries = Vec::new();
                for row in rows {
                    entries.push(row?);
                }
                Ok(entries)
            })
            .await
            .map_err(|e| CacheError::Read {
                reason: format!("Failed to list metadata entries: {}", e),
            })
    }

    async fn upsert(&self, entry: &MetadataEntry) -> Result<(), CacheError> {
        let entry = entry.clone();
        self.connection
            .call(move |conn| {
                let images_json = entry
                    .images
                    .as_ref()
                    .map(|images| serde_json::to_string(images).unwrap_or_default());
                conn.execute(
                    "INSERT OR REPLACE INTO link_metadata (url, images, description, fetched_at) \
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![entry.url, images_json, entry.description, entry.fetched_at],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| CacheError::Write {
                reason: format!("Failed to upsert metadata entry: {}", e),
            })?;

        debug!("Persisted metadata entry");
        Ok(())
    }

    async fn remove(&self, url: &str) -> Result<(), CacheError> {
        let url = url.to_string();
        self.connection
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM link_metadata WHERE url = ?1",
                    rusqlite::params![url],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| CacheError::Write {
                reason: format!("Failed to remove metadata entry: {}", e),
            })
    }

    async fn remove_all(&self) -> Result<(), CacheError> {
        self.connection
            .call(|conn| {
                conn.execute("DELETE FROM link_metadata", [])?;
                Ok(())
            })
            .await
            .map_err(|e| CacheError::Write {
                reason: format!("Failed to clear metadata cache: {}", e),
            })
    }
}

/// SQLite implementation of BlocklistRepository
pub struct SqliteBlocklistRepository {
    connection: Arc<Connection>,
}

impl SqliteBlocklistRepository {
    pub fn new(connection: Arc<Connection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl BlocklistRepository for SqliteBlocklistRepository {
    async fn add(&self, url: &str) -> Result<(), CacheError> {
        let url = url.to_string();
        let blocked_at = now_ms();
        self.connection
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO blocked_urls (url, blocked_at) VALUES (?1, ?2)",
                    rusqlite::params![url, blocked_at],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| CacheError::Write {
                reason: format!("Failed to record blocked url: {}", e),
            })
    }

    async fn remove(&self, url: &str) -> Result<(), CacheError> {
        let url = url.to_string();
        self.connection
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM blocked_urls WHERE url = ?1",
                    rusqlite::params![url],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| CacheError::Write {
                reason: format!("Failed to remove blocked url: {}", e),
            })
    }

    async fn remove_all(&self) -> Result<(), CacheError> {
        self.connection
            .call(|conn| {
                conn.execute("DELETE FROM blocked_urls", [])?;
                Ok(())
            })
            .await
            .map_err(|e| CacheError::Write {
                reason: format!("Failed to clear blocklist: {}", e),
            })
    }

    async fn get_all(&self) -> Result<Vec<BlockedUrl>, CacheError> {
        self.connection
            .call(|conn| {
                let mut stmt = conn
                    .prepare("SELECT url, blocked_at FROM blocked_urls ORDER BY blocked_at DESC")?;
                let rows = stmt.query_map([], row_to_blocked)?;
                let mut blocked = Vec::new();
                for row in rows {
                    blocked.push(row?);
                }
                Ok(blocked)
            })
            .await
            .map_err(|e| CacheError::Read {
                reason: format!("Failed to list blocked urls: {}", e),
            })
    }

    async fn contains(&self, url: &str) -> Result<bool, CacheError> {
        let url = url.to_string();
        self.connection
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM blocked_urls WHERE url = ?1",
                    rusqlite::params![url],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(|e| CacheError::Read {
                reason: format!("Failed to check blocked url: {}", e),
            })
    }
}
