//! Data Access Layer for the link intelligence engine
//!
//! This module provides the persisted key-value stores backing the engine:
//! the link metadata cache and the blocked-URL set, both kept in SQLite.

pub mod schema;
pub mod repository;

pub use repository::*;

use link_engine_core::*;
use std::path::Path;
use std::sync::Arc;
use tokio_rusqlite::Connection;

/// Database manager for handling SQLite connections
pub struct DatabaseManager {
    connection: Arc<Connection>,
}

impl DatabaseManager {
    /// Create a new database manager with the specified path
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();

        let connection = Connection::open(path).await.map_err(|e| CacheError::Open {
            reason: format!("Failed to open database: {}", e),
        })?;

        let manager = Self {
            connection: Arc::new(connection),
        };

        // Initialize schema
        manager.initialize_schema().await?;

        Ok(manager)
    }

    /// Create an in-memory database (for testing)
    pub async fn in_memory() -> Result<Self> {
        let connection = Connection::open(":memory:")
            .await
            .map_err(|e| CacheError::Open {
                reason: format!("Failed to create in-memory database: {}", e),
            })?;

        let manager = Self {
            connection: Arc::new(connection),
        };

        manager.initialize_schema().await?;

        Ok(manager)
    }

    /// Initialize database schema
    async fn initialize_schema(&self) -> Result<()> {
        self.connection
            .call(|conn| {
                conn.execute_batch(schema::SCHEMA_SQL)?;
                Ok(())
            })
            .await
            .map_err(|e| CacheError::Open {
                reason: format!("Failed to initialize schema: {}", e),
            })?;

        Ok(())
    }

    /// Metadata cache repository over this database
    pub fn metadata_repository(&self) -> Arc<dyn MetadataRepository> {
        Arc::new(SqliteMetadataRepository::new(self.connection()))
    }

    /// Blocked-URL repository over this database
    pub fn blocklist_repository(&self) -> Arc<dyn BlocklistRepository> {
        Arc::new(SqliteBlocklistRepository::new(self.connection()))
    }

    /// Get the connection for repository operations
    pub fn connection(&self) -> Arc<Connection> {
        Arc::clone(&self.connection)
    }
}
