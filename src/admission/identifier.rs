//! Process identifiers written to the queue file.
//!
//! Generated identifiers look like `<created_unix_millis>-<pid>-<uuid>`.
//! Everything reading the queue treats entries as opaque strings; the
//! embedded creation time is only consulted for stale-entry expiry, and an
//! entry that does not carry one is never considered stale.

use crate::error::{Result, TvModeError};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier of one process invocation's queue entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TicketId(String);

impl TicketId {
    /// Generate a fresh identifier for the current process.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    /// Generate an identifier stamped with the given creation time.
    pub fn generate_at(created_at: DateTime<Utc>) -> Self {
        Self(format!(
            "{}-{}-{}",
            created_at.timestamp_millis(),
            std::process::id(),
            Uuid::new_v4().simple()
        ))
    }

    /// Wrap an externally supplied identifier.
    ///
    /// Identifiers are stored one per line, so they must be non-empty and
    /// free of whitespace.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(TvModeError::UserError(
                "queue identifier must not be empty".to_string(),
            ));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(TvModeError::UserError(format!(
                "queue identifier '{}' must not contain whitespace",
                raw.escape_debug()
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TicketId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Creation time embedded in a raw queue entry.
pub fn created_at(entry: &str) -> Option<DateTime<Utc>> {
    let (millis, rest) = entry.split_once('-')?;
    // Require the pid segment so arbitrary "123-foo" entries stay opaque.
    let (pid, _) = rest.split_once('-')?;
    pid.parse::<u32>().ok()?;
    let millis = millis.parse::<i64>().ok()?;
    DateTime::from_timestamp_millis(millis)
}

/// Whether a raw entry is older than `stale_after` at `now`.
pub fn is_stale(entry: &str, stale_after: Duration, now: DateTime<Utc>) -> bool {
    let Some(created) = created_at(entry) else {
        return false;
    };
    let Ok(limit) = ChronoDuration::from_std(stale_after) else {
        return false;
    };
    now.signed_duration_since(created) > limit
}

/// Format an entry's age as a human-readable string.
pub fn age_string(entry: &str, now: DateTime<Utc>) -> Option<String> {
    let age = now.signed_duration_since(created_at(entry)?);
    let seconds = age.num_seconds().max(0);
    let minutes = age.num_minutes().max(0);
    let hours = age.num_hours().max(0);

    Some(if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique_and_parseable() {
        let a = TicketId::generate();
        let b = TicketId::generate();
        assert_ne!(a, b);
        assert!(TicketId::parse(a.as_str()).is_ok());
        assert!(!a.as_str().contains(char::is_whitespace));
    }

    #[test]
    fn test_generated_id_carries_creation_time() {
        let now = Utc::now();
        let id = TicketId::generate_at(now);
        let created = created_at(id.as_str()).unwrap();
        assert_eq!(created.timestamp_millis(), now.timestamp_millis());
        assert!(id.as_str().contains(&format!("-{}-", std::process::id())));
    }

    #[test]
    fn test_parse_rejects_empty_and_whitespace() {
        assert!(TicketId::parse("").is_err());
        assert!(TicketId::parse("a b").is_err());
        assert!(TicketId::parse("a\nb").is_err());
        assert_eq!(TicketId::parse("A").unwrap().as_str(), "A");
    }

    #[test]
    fn test_opaque_entries_have_no_creation_time() {
        assert_eq!(created_at("A"), None);
        assert_eq!(created_at("123-foo"), None);
        assert_eq!(created_at("abc-1-def"), None);
        assert!(created_at("1760781600000-42-deadbeef").is_some());
    }

    #[test]
    fn test_is_stale() {
        let now = Utc::now();
        let old = TicketId::generate_at(now - ChronoDuration::minutes(10));
        let fresh = TicketId::generate_at(now - ChronoDuration::seconds(5));
        let window = Duration::from_secs(300);

        assert!(is_stale(old.as_str(), window, now));
        assert!(!is_stale(fresh.as_str(), window, now));
        assert!(!is_stale("opaque-entry", window, now));
    }

    #[test]
    fn test_age_string() {
        let now = Utc::now();
        let id = TicketId::generate_at(now - ChronoDuration::seconds(42));
        assert_eq!(age_string(id.as_str(), now).unwrap(), "42s");

        let id = TicketId::generate_at(now - ChronoDuration::seconds(125));
        assert_eq!(age_string(id.as_str(), now).unwrap(), "2m 5s");

        let id = TicketId::generate_at(now - ChronoDuration::minutes(150));
        assert_eq!(age_string(id.as_str(), now).unwrap(), "2h 30m");

        assert_eq!(age_string("B", now), None);
    }
}
