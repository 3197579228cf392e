// src/db/schema.rs

//! Catalog schema definitions and migrations
//!
//! Defines the SQLite relations backing the package catalog and a migration
//! system to evolve them. Schema creation happens on first open; a failure
//! here leaves no usable catalog, so callers treat it as fatal.

use crate::error::Result;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the schema version tracking table
fn init_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version from the catalog
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    init_schema_version(conn)?;

    let version = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    Ok(version)
}

/// Set the schema version
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Apply all pending migrations to bring the catalog up to date
pub fn migrate(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    debug!("current schema version: {}", current_version);

    if current_version >= SCHEMA_VERSION {
        return Ok(());
    }

    for version in (current_version + 1)..=SCHEMA_VERSION {
        info!("applying catalog migration to version {}", version);
        apply_migration(conn, version)?;
        set_schema_version(conn, version)?;
    }

    Ok(())
}

/// Apply a specific migration version
fn apply_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        _ => panic!("Unknown migration version: {}", version),
    }
}

/// Initial schema - Version 1
///
/// Creates the five catalog relations:
/// - packages: installed packages, keyed by origin
/// - options: build/runtime option flags per package
/// - deps: dependency edges, keyed by (package_id, origin)
/// - files: installed files, keyed by path (one owner per file)
/// - conflicts: glob patterns a package must not coexist with
fn migrate_v1(conn: &Connection) -> Result<()> {
    debug!("creating schema version 1");

    conn.execute_batch(
        "
        CREATE TABLE packages (
            origin TEXT NOT NULL PRIMARY KEY,
            name TEXT,
            version TEXT,
            comment TEXT,
            desc TEXT,
            automatic INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE options (
            package_id TEXT NOT NULL,
            name TEXT NOT NULL,
            \"with\" INTEGER,
            PRIMARY KEY (package_id, name)
        );

        CREATE INDEX options_package ON options (package_id);

        CREATE TABLE deps (
            origin TEXT NOT NULL,
            name TEXT,
            version TEXT,
            package_id TEXT NOT NULL,
            PRIMARY KEY (package_id, origin)
        );

        CREATE INDEX deps_origin ON deps (origin);
        CREATE INDEX deps_package ON deps (package_id);

        CREATE TABLE files (
            path TEXT NOT NULL PRIMARY KEY,
            md5 TEXT,
            package_id TEXT NOT NULL
        );

        CREATE INDEX files_package ON files (package_id);

        CREATE TABLE conflicts (
            name TEXT NOT NULL,
            package_id TEXT NOT NULL,
            PRIMARY KEY (package_id, name)
        );

        CREATE INDEX conflicts_package ON conflicts (package_id);
        ",
    )?;

    info!("catalog schema version 1 created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_test_db() -> (NamedTempFile, Connection) {
        let temp_file = NamedTempFile::new().unwrap();
        let conn = Connection::open(temp_file.path()).unwrap();
        (temp_file, conn)
    }

    #[test]
    fn test_schema_version_tracking() {
        let (_temp, conn) = create_test_db();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, 0);

        set_schema_version(&conn, 1).unwrap();
        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_migrate_creates_all_tables() {
        let (_temp, conn) = create_test_db();

        migrate(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"packages".to_string()));
        assert!(tables.contains(&"options".to_string()));
        assert!(tables.contains(&"deps".to_string()));
        assert!(tables.contains(&"files".to_string()));
        assert!(tables.contains(&"conflicts".to_string()));
        assert!(tables.contains(&"schema_version".to_string()));
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let (_temp, conn) = create_test_db();

        migrate(&conn).unwrap();
        let version1 = get_schema_version(&conn).unwrap();

        migrate(&conn).unwrap();
        let version2 = get_schema_version(&conn).unwrap();

        assert_eq!(version1, version2);
        assert_eq!(version1, SCHEMA_VERSION);
    }

    #[test]
    fn test_duplicate_origin_rejected() {
        let (_temp, conn) = create_test_db();
        migrate(&conn).unwrap();

        conn.execute(
            "INSERT INTO packages (origin, name, version) VALUES (?1, ?2, ?3)",
            ["shells/zsh", "zsh", "4.3.10"],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO packages (origin, name, version) VALUES (?1, ?2, ?3)",
            ["shells/zsh", "zsh", "5.0"],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_dep_edge_rejected() {
        let (_temp, conn) = create_test_db();
        migrate(&conn).unwrap();

        conn.execute(
            "INSERT INTO deps (origin, name, version, package_id) VALUES (?1, ?2, ?3, ?4)",
            ["devel/gettext", "gettext", "0.17", "shells/zsh"],
        )
        .unwrap();

        // Same (package_id, origin) pair must fail, not overwrite
        let result = conn.execute(
            "INSERT INTO deps (origin, name, version, package_id) VALUES (?1, ?2, ?3, ?4)",
            ["devel/gettext", "gettext", "0.18", "shells/zsh"],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_file_path_is_catalog_wide_key() {
        let (_temp, conn) = create_test_db();
        migrate(&conn).unwrap();

        conn.execute(
            "INSERT INTO files (path, md5, package_id) VALUES (?1, ?2, ?3)",
            ["/usr/local/bin/zsh", "d41d8cd98f", "shells/zsh"],
        )
        .unwrap();

        // One file belongs to at most one package at a time
        let result = conn.execute(
            "INSERT INTO files (path, md5, package_id) VALUES (?1, ?2, ?3)",
            ["/usr/local/bin/zsh", "aabbccddee", "shells/bash"],
        );
        assert!(result.is_err());
    }
}
