//! Strongly-typed migration identity.
//!
//! An identity has the form `YYYYMMDDHHMMSS_<label>`. The 14-digit prefix is a
//! calendar timestamp and the label is free-form (non-empty). Identities are
//! the graph node keys, the sort keys and the keys of stored records.

use crate::error::{CoreError, CoreResult};
use chrono::{Duration, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::str::FromStr;

/// Length of the `YYYYMMDDHHMMSS` prefix.
pub const TIMESTAMP_LEN: usize = 14;

/// `chrono` format of the timestamp prefix.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Identity of a migration unit.
///
/// Ordering is by timestamp, then by the full identity. Because the
/// timestamp prefix is fixed-width, that is the same as plain string order,
/// which keeps `Borrow<str>` lookups consistent with `Ord`/`Hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MigrationId {
    raw: String,
    timestamp: NaiveDateTime,
}

impl MigrationId {
    /// Parse an identity, validating the timestamp prefix and the label.
    pub fn parse(value: &str) -> CoreResult<Self> {
        let invalid = |reason: &str| CoreError::InvalidMigrationId {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        if value.len() < TIMESTAMP_LEN + 2 || !value.is_char_boundary(TIMESTAMP_LEN) {
            return Err(invalid("expected YYYYMMDDHHMMSS_<label>"));
        }
        let (prefix, rest) = value.split_at(TIMESTAMP_LEN);
        if !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("timestamp prefix must be 14 digits"));
        }
        let Some(label) = rest.strip_prefix('_') else {
            return Err(invalid("expected '_' after the timestamp"));
        };
        if label.trim().is_empty() {
            return Err(invalid("label must not be empty"));
        }
        let timestamp = NaiveDateTime::parse_from_str(prefix, TIMESTAMP_FORMAT)
            .map_err(|e| invalid(&format!("timestamp is not a valid date-time ({e})")))?;

        Ok(Self {
            raw: value.to_string(),
            timestamp,
        })
    }

    /// Build an identity from a timestamp and a label.
    pub fn from_parts(timestamp: NaiveDateTime, label: &str) -> CoreResult<Self> {
        Self::parse(&format!("{}_{}", timestamp.format(TIMESTAMP_FORMAT), label))
    }

    /// Resolve a dependency reference to an identity.
    ///
    /// Accepts a bare identity or a path form such as
    /// `accounts/migrations/20240101000000_roles` (optionally ending in
    /// `.yml`/`.yaml`); the last path segment is the identity.
    pub fn from_reference(reference: &str) -> CoreResult<Self> {
        let last = reference
            .trim()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        let stem = last
            .strip_suffix(".yml")
            .or_else(|| last.strip_suffix(".yaml"))
            .unwrap_or(last);
        Self::parse(stem)
    }

    /// The parsed timestamp prefix.
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// The label after the timestamp prefix.
    pub fn label(&self) -> &str {
        &self.raw[TIMESTAMP_LEN + 1..]
    }

    /// Return the underlying identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Consume the wrapper and return the inner `String`.
    pub fn into_inner(self) -> String {
        self.raw
    }
}

/// Generate a fresh identity for `label`.
///
/// The timestamp is `now` truncated to whole seconds. If an existing identity
/// already uses that second or a later one, the latest existing timestamp
/// plus one second is used instead so the new identity sorts last.
pub fn next_migration_id<'a>(
    now: NaiveDateTime,
    label: &str,
    existing: impl IntoIterator<Item = &'a MigrationId>,
) -> CoreResult<MigrationId> {
    validate_label(label)?;
    let now = now.with_nanosecond(0).unwrap_or(now);
    let latest = existing.into_iter().map(MigrationId::timestamp).max();
    let timestamp = match latest {
        Some(latest) if latest >= now => latest + Duration::seconds(1),
        _ => now,
    };
    MigrationId::from_parts(timestamp, label)
}

/// Labels for generated units: ASCII letters, digits and underscores.
pub fn validate_label(label: &str) -> CoreResult<()> {
    if !label.is_empty() && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        Ok(())
    } else {
        Err(CoreError::InvalidMigrationId {
            value: label.to_string(),
            reason: "label may only contain letters, digits and '_'".to_string(),
        })
    }
}

impl PartialEq for MigrationId {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for MigrationId {}

impl Hash for MigrationId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl PartialOrd for MigrationId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MigrationId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl AsRef<str> for MigrationId {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl Deref for MigrationId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.raw
    }
}

impl Borrow<str> for MigrationId {
    fn borrow(&self) -> &str {
        &self.raw
    }
}

impl FromStr for MigrationId {
    type Err = CoreError;
    fn from_str(s: &str) -> CoreResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MigrationId {
    type Error = CoreError;
    fn try_from(s: String) -> CoreResult<Self> {
        Self::parse(&s)
    }
}

impl TryFrom<&str> for MigrationId {
    type Error = CoreError;
    fn try_from(s: &str) -> CoreResult<Self> {
        Self::parse(s)
    }
}

impl From<MigrationId> for String {
    fn from(id: MigrationId) -> Self {
        id.raw
    }
}

impl PartialEq<str> for MigrationId {
    fn eq(&self, other: &str) -> bool {
        self.raw == other
    }
}

impl PartialEq<&str> for MigrationId {
    fn eq(&self, other: &&str) -> bool {
        self.raw == *other
    }
}

impl PartialEq<String> for MigrationId {
    fn eq(&self, other: &String) -> bool {
        self.raw == *other
    }
}

#[cfg(test)]
#[path = "migration_id_test.rs"]
mod tests;
