// src/db/functions.rs

//! Pattern-matching predicates registered into the catalog engine
//!
//! Two scalar functions back the regex search modes: `regexp(pattern,
//! subject)` for POSIX basic syntax and `eregexp(pattern, subject)` for
//! extended syntax. Both are case-sensitive, match anywhere in the subject,
//! and report only match/no-match. The compiled pattern is cached on the
//! pattern argument for the lifetime of one query invocation via SQLite's
//! auxdata slot, so a table scan compiles once.

use regex::Regex;
use rusqlite::Connection;
use rusqlite::functions::{Context, FunctionFlags};
use std::sync::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Regular-expression syntax flavor.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Flavor {
    /// POSIX basic syntax: `+ ? | ( ) { }` are literals, `\( \)` group.
    Basic,
    /// POSIX extended syntax.
    Extended,
}

/// Register `regexp` and `eregexp` on a catalog connection.
pub(crate) fn register(conn: &Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_scalar_function("regexp", 2, flags, |ctx| regex_match(ctx, Flavor::Basic))?;
    conn.create_scalar_function("eregexp", 2, flags, |ctx| regex_match(ctx, Flavor::Extended))?;

    Ok(())
}

/// Compile a pattern in the given flavor.
pub(crate) fn compile(flavor: Flavor, pattern: &str) -> Result<Regex, regex::Error> {
    match flavor {
        Flavor::Extended => Regex::new(pattern),
        Flavor::Basic => Regex::new(&basic_to_extended(pattern)),
    }
}

fn regex_match(ctx: &Context<'_>, flavor: Flavor) -> rusqlite::Result<bool> {
    let re: Arc<Regex> = ctx.get_or_create_aux(0, |value| -> Result<Regex, BoxError> {
        let pattern = value.as_str()?;
        compile(flavor, pattern).map_err(|e| format!("invalid pattern: {e}").into())
    })?;

    let subject = ctx
        .get_raw(1)
        .as_str()
        .map_err(|e| rusqlite::Error::UserFunctionError(e.into()))?;

    Ok(re.is_match(subject))
}

/// Rewrite a POSIX basic regular expression into extended syntax.
///
/// In a basic RE the characters `+ ? | ( ) { }` match themselves and the
/// operators are spelled `\( \) \{ \}`; flip both directions and leave the
/// shared operators (`. * [ ] ^ $`) untouched.
fn basic_to_extended(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 4);
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(op @ ('(' | ')' | '{' | '}')) => out.push(op),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                // Trailing backslash; kept so compilation reports it
                None => out.push('\\'),
            },
            '+' | '?' | '|' | '(' | ')' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    out
}
