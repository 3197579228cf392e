// src/db/mod.rs

//! Catalog layer for Stowage
//!
//! This module owns all SQLite operations on the package catalog:
//! - Catalog location resolution and connection management
//! - Schema creation on first open
//! - Registering the package rows produced by manifest parsing
//! - Query APIs: package search, file-owner resolution, dependency and
//!   reverse-dependency traversal, conflicts, files, options
//!
//! Every fallible operation returns a `Result`; nothing is reported through
//! shared error state on the handle.

pub mod functions;
pub mod models;
pub mod schema;

use crate::error::{Error, Result};
use crate::manifest::Manifest;
use models::{ConflictEntry, FileEntry, OptionEntry, Package};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment override for the catalog directory.
pub const DBDIR_ENV: &str = "PKG_DBDIR";

/// Default catalog directory.
pub const DEFAULT_DBDIR: &str = "/var/db/pkg";

/// Catalog file name within the catalog directory.
pub const CATALOG_FILE: &str = "pkg.db";

const PKG_COLUMNS: &str = "origin, name, version, comment, desc, automatic";
const PKG_COLUMNS_P: &str = "p.origin, p.name, p.version, p.comment, p.desc, p.automatic";

/// Resolve the catalog directory: `$PKG_DBDIR` if set, the fixed default
/// otherwise.
pub fn catalog_dir() -> PathBuf {
    std::env::var_os(DBDIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DBDIR))
}

/// Path of the catalog file inside the catalog directory.
pub fn catalog_path() -> PathBuf {
    catalog_dir().join(CATALOG_FILE)
}

/// Pattern-matching discipline for package searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Every package; any supplied pattern is ignored.
    All,
    /// Literal name equality.
    Exact,
    /// Shell glob over the name.
    Glob,
    /// POSIX basic regular expression over the name.
    Regex,
    /// POSIX extended regular expression over the name.
    ERegex,
}

/// Owning cursor over the rows decoded from one query execution.
///
/// The backing statement is finalized before the cursor is returned; dropping
/// the cursor releases everything it holds. Re-invoking the operation that
/// produced it restarts iteration from the first row.
pub struct Cursor<T> {
    rows: std::vec::IntoIter<T>,
}

impl<T> Cursor<T> {
    fn new(rows: Vec<T>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl<T> Iterator for Cursor<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.rows.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl<T> ExactSizeIterator for Cursor<T> {}

/// An open package catalog.
///
/// Owns the storage connection; not safe for concurrent use from multiple
/// threads without external synchronization.
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Open a catalog, creating it (directory, file, and schema) if the
    /// backing file does not exist yet.
    ///
    /// A schema-creation failure leaves no usable catalog; callers treat it
    /// as fatal.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("opening catalog at {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Init(format!("failed to create catalog directory: {e}")))?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            ",
        )?;

        schema::migrate(&conn)?;
        functions::register(&conn)?;

        Ok(Self { conn })
    }

    /// Open the catalog at its resolved default location.
    pub fn open_default() -> Result<Self> {
        Self::open(catalog_path())
    }

    /// Close the catalog explicitly, surfacing any engine error.
    ///
    /// Dropping a `Catalog` also releases the connection; this exists for
    /// callers that want the error.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| Error::Database(e))
    }

    /// Record a parsed manifest in the catalog: the package row plus its
    /// dependency and conflict rows, in one transaction.
    ///
    /// Plain inserts throughout: a duplicate origin, or a duplicate
    /// `(package, origin)` dependency edge, fails the whole registration and
    /// leaves the catalog untouched.
    pub fn add_package(&mut self, manifest: &Manifest, automatic: bool) -> Result<()> {
        let origin = manifest
            .origin
            .as_deref()
            .filter(|o| !o.is_empty())
            .ok_or_else(|| Error::Argument("manifest has no origin".to_string()))?;

        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO packages (origin, name, version, comment, desc, automatic)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                origin,
                &manifest.name,
                &manifest.version,
                &manifest.comment,
                &manifest.desc,
                automatic as i64,
            ],
        )?;

        {
            let mut dep_stmt = tx.prepare(
                "INSERT INTO deps (origin, name, version, package_id)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for dep in &manifest.deps {
                dep_stmt.execute(params![&dep.origin, &dep.name, &dep.version, origin])?;
            }

            let mut conflict_stmt =
                tx.prepare("INSERT INTO conflicts (name, package_id) VALUES (?1, ?2)")?;
            for conflict in &manifest.conflicts {
                conflict_stmt.execute(params![&conflict.glob, origin])?;
            }
        }

        tx.commit()?;

        info!(
            "registered {} {}",
            origin,
            manifest.version.as_deref().unwrap_or("")
        );
        Ok(())
    }

    /// Record an installed file for a package. `path` is a catalog-wide key:
    /// a second owner for the same path is rejected by the engine.
    pub fn add_file(&self, origin: &str, path: &str, md5: Option<&str>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO files (path, md5, package_id) VALUES (?1, ?2, ?3)",
            params![path, md5, origin],
        )?;
        Ok(())
    }

    /// Record an option flag for a package.
    pub fn add_option(&self, origin: &str, name: &str, with: bool) -> Result<()> {
        self.conn.execute(
            "INSERT INTO options (package_id, name, \"with\") VALUES (?1, ?2, ?3)",
            params![origin, name, with as i64],
        )?;
        Ok(())
    }

    /// Search installed packages by name.
    ///
    /// Non-`All` modes require a non-empty pattern and fail before touching
    /// storage otherwise; regex modes also validate the pattern up front.
    /// Rows come back in catalog storage order — stable within one query,
    /// otherwise unspecified.
    pub fn query(&self, pattern: Option<&str>, mode: MatchMode) -> Result<Cursor<Package>> {
        let pattern = match mode {
            MatchMode::All => None,
            _ => {
                let p = pattern
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| Error::Argument("missing pattern".to_string()))?;

                let flavor = match mode {
                    MatchMode::Regex => Some(functions::Flavor::Basic),
                    MatchMode::ERegex => Some(functions::Flavor::Extended),
                    _ => None,
                };
                if let Some(flavor) = flavor {
                    functions::compile(flavor, p).map_err(|e| Error::Pattern(e.to_string()))?;
                }

                Some(p)
            }
        };

        let clause = match mode {
            MatchMode::All => "",
            MatchMode::Exact => " WHERE name = ?1",
            MatchMode::Glob => " WHERE name GLOB ?1",
            MatchMode::Regex => " WHERE name REGEXP ?1",
            MatchMode::ERegex => " WHERE eregexp(?1, name)",
        };

        let sql = format!("SELECT {PKG_COLUMNS} FROM packages{clause}");
        debug!("package query: {} ({:?})", sql, mode);
        let mut stmt = self.conn.prepare(&sql)?;

        let packages = match pattern {
            Some(p) => stmt
                .query_map([p], Package::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt
                .query_map([], Package::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        };

        Ok(Cursor::new(packages))
    }

    /// Resolve the package owning the installed file at `path`.
    pub fn which(&self, path: &str) -> Result<Package> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PKG_COLUMNS_P} FROM packages AS p, files AS f
             WHERE p.origin = f.package_id AND f.path = ?1"
        ))?;

        stmt.query_row([path], Package::from_row)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("no package owns {path}")))
    }

    /// Iterate the packages `pkg` depends on, as full package snapshots.
    pub fn deps(&self, pkg: &Package) -> Result<Cursor<Package>> {
        self.package_edges(
            &format!(
                "SELECT {PKG_COLUMNS_P} FROM packages AS p, deps AS d
                 WHERE p.origin = d.origin AND d.package_id = ?1"
            ),
            &pkg.origin,
        )
    }

    /// Iterate the packages that depend on `pkg` (reverse dependencies).
    pub fn rdeps(&self, pkg: &Package) -> Result<Cursor<Package>> {
        self.package_edges(
            &format!(
                "SELECT {PKG_COLUMNS_P} FROM packages AS p, deps AS d
                 WHERE p.origin = d.package_id AND d.origin = ?1"
            ),
            &pkg.origin,
        )
    }

    fn package_edges(&self, sql: &str, origin: &str) -> Result<Cursor<Package>> {
        let mut stmt = self.conn.prepare(sql)?;
        let packages = stmt
            .query_map([origin], Package::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Cursor::new(packages))
    }

    /// Iterate the stored conflict patterns of `pkg`.
    pub fn conflicts(&self, pkg: &Package) -> Result<Cursor<ConflictEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM conflicts WHERE package_id = ?1")?;
        let rows = stmt
            .query_map([&pkg.origin], ConflictEntry::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Cursor::new(rows))
    }

    /// Iterate the installed files of `pkg`.
    pub fn files(&self, pkg: &Package) -> Result<Cursor<FileEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT path, md5 FROM files WHERE package_id = ?1")?;
        let rows = stmt
            .query_map([&pkg.origin], FileEntry::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Cursor::new(rows))
    }

    /// Iterate the option flags of `pkg`.
    pub fn options(&self, pkg: &Package) -> Result<Cursor<OptionEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, \"with\" FROM options WHERE package_id = ?1")?;
        let rows = stmt
            .query_map([&pkg.origin], OptionEntry::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Cursor::new(rows))
    }
}
