//! Database schema definitions

/// Current schema version
pub const SCHEMA_VERSION: u32 = 1;

/// SQL schema for the link metadata and blocklist stores
pub const SCHEMA_SQL: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL,
    description TEXT
);

-- Page preview metadata, keyed by URL
CREATE TABLE IF NOT EXISTS link_metadata (
    url TEXT PRIMARY KEY,
    images TEXT, -- JSON array of preview images
    description TEXT,
    fetched_at INTEGER NOT NULL
);

-- URLs the user has explicitly excluded from results
CREATE TABLE IF NOT EXISTS blocked_urls (
    url TEXT PRIMARY KEY,
    blocked_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_link_metadata_fetched_at ON link_metadata(fetched_at);
CREATE INDEX IF NOT EXISTS idx_blocked_urls_blocked_at ON blocked_urls(blocked_at);
"#;

/// Migration definitions
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// List of all migrations
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Initial schema",
    sql: SCHEMA_SQL,
}];
