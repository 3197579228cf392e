// src/manifest/mod.rs

//! Package manifest parsing
//!
//! A manifest is a line-oriented text file describing one package. The first
//! line must begin with the `@pkg_format_version` marker; every following
//! line is dispatched to a directive handler by prefix match against a fixed
//! directive table. Lines that match no directive are ignored, so manifests
//! written by newer tools keep parsing.

use crate::error::{Error, Result};
use tracing::debug;

/// Mandatory first-line format marker.
pub const FORMAT_KEY: &str = "@pkg_format_version";

/// Resolution state of a dependency against the installed catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DepState {
    /// Recorded in the manifest, not yet matched to an installed package.
    #[default]
    NotFound,
    /// Matched to an installed package.
    Installed,
}

/// A dependency declared by a manifest.
///
/// The manifest field order is `name origin version` — the reverse of the
/// origin-first order used everywhere else. This is the on-disk format and
/// is preserved as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dep {
    pub name: Option<String>,
    pub origin: Option<String>,
    pub version: Option<String>,
    pub state: DepState,
}

/// A conflict declared by a manifest: a glob pattern over package names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conflict {
    pub glob: String,
}

/// A parsed package manifest.
///
/// `desc` has no directive of its own; the long description lives outside
/// the manifest and may be filled in by the caller before registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub name: Option<String>,
    pub origin: Option<String>,
    pub version: Option<String>,
    pub comment: Option<String>,
    pub desc: Option<String>,
    pub deps: Vec<Dep>,
    pub conflicts: Vec<Conflict>,
}

type Handler = fn(&mut Manifest, &str);

// First match wins; no key may be a prefix of another.
const DIRECTIVES: &[(&str, Handler)] = &[
    ("@name", parse_name),
    ("@origin", parse_origin),
    ("@version", parse_version),
    ("@arch", parse_reserved),
    ("@osrelease", parse_reserved),
    ("@osversion", parse_reserved),
    ("@build_time", parse_reserved),
    ("@www", parse_reserved),
    ("@comment", parse_comment),
    ("@license", parse_reserved),
    ("@option", parse_reserved),
    ("@dep", parse_dep),
    ("@conflict", parse_conflict),
];

/// Parse a complete manifest.
///
/// Fails only when the format marker is missing; any other malformed line is
/// skipped. Repeated `@name`/`@origin`/`@version`/`@comment` directives
/// append to the field rather than replacing it.
pub fn parse(input: &str) -> Result<Manifest> {
    let mut lines = input.split('\n');

    if !lines.next().unwrap_or("").starts_with(FORMAT_KEY) {
        return Err(Error::NotAManifest);
    }

    let mut manifest = Manifest::default();
    for line in lines {
        for (key, handler) in DIRECTIVES {
            if line.starts_with(key) {
                handler(&mut manifest, &line[key.len()..]);
                break;
            }
        }
    }

    debug!(
        "parsed manifest for {} ({} deps, {} conflicts)",
        manifest.origin.as_deref().unwrap_or("<no origin>"),
        manifest.deps.len(),
        manifest.conflicts.len()
    );

    Ok(manifest)
}

/// Append `value` to a field, trimming only leading whitespace.
fn append(field: &mut Option<String>, value: &str) {
    field
        .get_or_insert_with(String::new)
        .push_str(value.trim_start());
}

fn parse_name(m: &mut Manifest, buf: &str) {
    append(&mut m.name, buf);
}

fn parse_origin(m: &mut Manifest, buf: &str) {
    append(&mut m.origin, buf);
}

fn parse_version(m: &mut Manifest, buf: &str) {
    append(&mut m.version, buf);
}

fn parse_comment(m: &mut Manifest, buf: &str) {
    append(&mut m.comment, buf);
}

/// Recognized directive with no stored attribute yet.
fn parse_reserved(_: &mut Manifest, _: &str) {}

fn parse_dep(m: &mut Manifest, buf: &str) {
    // Positional fields split on single spaces: adjacent spaces yield empty
    // fields, anything past the third field is ignored.
    let mut fields = buf.trim_start().split(' ');

    m.deps.push(Dep {
        name: fields.next().map(str::to_owned),
        origin: fields.next().map(str::to_owned),
        version: fields.next().map(str::to_owned),
        state: DepState::NotFound,
    });
}

fn parse_conflict(m: &mut Manifest, buf: &str) {
    m.conflicts.push(Conflict {
        glob: buf.trim_start().to_owned(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "@pkg_format_version 0.9\n\
@name zsh\n\
@origin shells/zsh\n\
@version 4.3.10\n\
@comment The Z shell\n\
@arch amd64\n\
@www http://www.zsh.org/\n\
@dep libiconv converters/libiconv 1.13.1\n\
@dep gettext devel/gettext 0.17_1\n\
@conflict zsh-static-*\n";

    #[test]
    fn parses_recognized_directives() {
        let m = parse(SAMPLE).unwrap();
        assert_eq!(m.name.as_deref(), Some("zsh"));
        assert_eq!(m.origin.as_deref(), Some("shells/zsh"));
        assert_eq!(m.version.as_deref(), Some("4.3.10"));
        assert_eq!(m.comment.as_deref(), Some("The Z shell"));
        assert_eq!(m.deps.len(), 2);
        assert_eq!(m.conflicts.len(), 1);
        assert_eq!(m.conflicts[0].glob, "zsh-static-*");
    }

    #[test]
    fn missing_format_marker_is_fatal() {
        let result = parse("@name zsh\n@origin shells/zsh\n");
        assert!(matches!(result, Err(Error::NotAManifest)));
    }

    #[test]
    fn empty_input_is_not_a_manifest() {
        assert!(matches!(parse(""), Err(Error::NotAManifest)));
    }

    #[test]
    fn dep_fields_are_name_origin_version() {
        let m = parse("@pkg_format_version 0.9\n@dep foo bar 1.0\n").unwrap();
        assert_eq!(m.deps.len(), 1);
        assert_eq!(m.deps[0].name.as_deref(), Some("foo"));
        assert_eq!(m.deps[0].origin.as_deref(), Some("bar"));
        assert_eq!(m.deps[0].version.as_deref(), Some("1.0"));
        assert_eq!(m.deps[0].state, DepState::NotFound);
    }

    #[test]
    fn dep_version_may_be_absent() {
        let m = parse("@pkg_format_version 0.9\n@dep foo bar\n").unwrap();
        assert_eq!(m.deps[0].name.as_deref(), Some("foo"));
        assert_eq!(m.deps[0].origin.as_deref(), Some("bar"));
        assert_eq!(m.deps[0].version, None);
    }

    #[test]
    fn dep_adjacent_spaces_yield_empty_fields() {
        let m = parse("@pkg_format_version 0.9\n@dep foo  bar\n").unwrap();
        assert_eq!(m.deps[0].name.as_deref(), Some("foo"));
        assert_eq!(m.deps[0].origin.as_deref(), Some(""));
        assert_eq!(m.deps[0].version.as_deref(), Some("bar"));
    }

    #[test]
    fn dep_extra_fields_are_ignored() {
        let m = parse("@pkg_format_version 0.9\n@dep foo bar 1.0 extra\n").unwrap();
        assert_eq!(m.deps[0].version.as_deref(), Some("1.0"));
    }

    #[test]
    fn unknown_directives_are_ignored() {
        let m = parse("@pkg_format_version 0.9\n@frobnicate yes\n@name zsh\n").unwrap();
        assert_eq!(m.name.as_deref(), Some("zsh"));
    }

    #[test]
    fn reserved_directives_do_not_corrupt_following_lines() {
        let m = parse(
            "@pkg_format_version 0.9\n\
@arch amd64\n\
@osrelease 8.0\n\
@osversion 800107\n\
@build_time 1270455880\n\
@license BSD\n\
@option DOCS true\n\
@name zsh\n",
        )
        .unwrap();
        assert_eq!(m.name.as_deref(), Some("zsh"));
    }

    // Repeated directives accumulate into one field. Whether real manifests
    // ever repeat them is unclear; this pins the current behavior.
    #[test]
    fn repeated_directives_append() {
        let m = parse("@pkg_format_version 0.9\n@name zsh\n@name -static\n").unwrap();
        assert_eq!(m.name.as_deref(), Some("zsh-static"));
    }

    #[test]
    fn leading_whitespace_is_trimmed_trailing_kept() {
        let m = parse("@pkg_format_version 0.9\n@comment \t  spaced out  \n").unwrap();
        assert_eq!(m.comment.as_deref(), Some("spaced out  "));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let m = parse("@pkg_format_version 0.9\n\n\n@name zsh\n\n").unwrap();
        assert_eq!(m.name.as_deref(), Some("zsh"));
    }
}
