// src/db/models.rs

//! Data models for catalog entities
//!
//! These structs are detached snapshots of catalog rows: they own copies of
//! their string fields and stay valid after the query that produced them
//! has been torn down.

use rusqlite::Row;

/// An installed package.
///
/// `origin` (`<category>/<name>`) is the catalog-wide primary key and the
/// unit of install/removal. `automatic` marks packages pulled in as a
/// dependency rather than installed explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub origin: String,
    pub name: Option<String>,
    pub version: Option<String>,
    pub comment: Option<String>,
    pub desc: Option<String>,
    pub automatic: bool,
}

impl Package {
    /// Convert a catalog row to a Package
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            origin: row.get(0)?,
            name: row.get(1)?,
            version: row.get(2)?,
            comment: row.get(3)?,
            desc: row.get(4)?,
            automatic: row.get::<_, i64>(5)? != 0,
        })
    }
}

/// A file owned by an installed package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub md5: Option<String>,
}

impl FileEntry {
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            path: row.get(0)?,
            md5: row.get(1)?,
        })
    }
}

/// A stored conflict pattern: a glob over package names the owning package
/// must not coexist with. Not resolved against the live catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictEntry {
    pub name: String,
}

impl ConflictEntry {
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self { name: row.get(0)? })
    }
}

/// A build/runtime option flag recorded for a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionEntry {
    pub name: String,
    pub with: bool,
}

impl OptionEntry {
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            with: row.get::<_, i64>(1)? != 0,
        })
    }
}
