//! Forward-only state schema migrations
//!
//! A migration rewrites the in-memory document from one declared version to
//! the next. The chain is a totally ordered sequence fixed at build time;
//! `migrate` walks it until the document sits at [`CURRENT_VERSION`].
//! Documents claiming a newer version than this binary supports are refused
//! rather than downgraded.

use std::cmp::Ordering;

use crate::error::{CoreError, Result};
use crate::schema::State;

/// The state schema version this binary reads and writes.
pub const CURRENT_VERSION: &str = "1.0";

/// Documents written before the version marker existed.
const LEGACY_VERSION: &str = "0.9";

type MigrationFn = fn(&mut State) -> Result<()>;

struct Migration {
    from: &'static str,
    to: &'static str,
    apply: MigrationFn,
}

const MIGRATIONS: &[Migration] = &[Migration {
    from: "0.9",
    to: "1.0",
    apply: migrate_v09_to_v10,
}];

/// Upgrade `state` in place to [`CURRENT_VERSION`].
///
/// A document already at the current version is untouched. Unknown versions
/// lower than current enter the chain at the first registered step at or
/// above them; anything newer than current is an error.
pub fn migrate(state: &mut State) -> Result<()> {
    let mut version = if state.version.trim().is_empty() {
        LEGACY_VERSION.to_string()
    } else {
        state.version.trim().to_string()
    };

    while version != CURRENT_VERSION {
        let step = MIGRATIONS
            .iter()
            .find(|m| m.from == version)
            .or_else(|| match compare_versions(&version, CURRENT_VERSION) {
                Some(Ordering::Less) => MIGRATIONS
                    .iter()
                    .find(|m| compare_versions(&version, m.to) == Some(Ordering::Less)),
                _ => None,
            })
            .ok_or_else(|| CoreError::UnsupportedVersion(version.clone()))?;

        tracing::debug!(from = step.from, to = step.to, "migrating state document");
        (step.apply)(state)?;
        state.version = step.to.to_string();
        version = state.version.clone();
    }

    state.version = CURRENT_VERSION.to_string();
    Ok(())
}

/// Compare two `major.minor` version strings numerically.
fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    Some(parse_version(a)?.cmp(&parse_version(b)?))
}

fn parse_version(version: &str) -> Option<(u32, u32)> {
    let (major, minor) = version.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

/// 0.9 documents carry the same entity shapes as 1.0; only the version
/// marker advances. Absent maps already deserialize as empty.
fn migrate_v09_to_v10(_state: &mut State) -> Result<()> {
    Ok(())
}
