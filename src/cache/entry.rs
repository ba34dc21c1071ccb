//! Cache entry envelope with expiry metadata

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached value together with the time it was written and when it expires
///
/// Stores enforce TTLs themselves; the envelope repeats the expiry so an
/// entry read back from any store can be checked independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry<T> {
    /// The cached value
    pub value: T,

    /// When the entry was created
    pub created_at: DateTime<Utc>,

    /// When the entry expires
    pub expires_at: DateTime<Utc>,
}

impl<T> StoredEntry<T> {
    /// Create a new entry expiring `ttl` from now
    pub fn new(value: T, ttl: Duration) -> Self {
        let now = Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            value,
            created_at: now,
            expires_at,
        }
    }

    /// Create a new entry with custom expiration time
    pub fn with_expiration(value: T, expires_at: DateTime<Utc>) -> Self {
        Self {
            value,
            created_at: Utc::now(),
            expires_at,
        }
    }

    /// Check if the entry has expired; an entry expires at `expires_at` itself
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Get time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now();
        if now >= self.expires_at {
            None
        } else {
            (self.expires_at - now).to_std().ok()
        }
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        (Utc::now() - self.created_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }

    /// Unwrap the value, or `None` if expired
    pub fn into_live(self) -> Option<T> {
        if self.is_expired() {
            None
        } else {
            Some(self.value)
        }
    }
}

impl<T: Serialize> StoredEntry<T> {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<T: DeserializeOwned> StoredEntry<T> {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use std::thread::sleep;

    #[test]
    fn test_entry_creation() {
        let entry = StoredEntry::new("value".to_string(), Duration::from_secs(3600));

        assert_eq!(entry.value, "value");
        assert!(!entry.is_expired());
        assert!(entry.time_until_expiration().unwrap() <= Duration::from_secs(3600));
    }

    #[test]
    fn test_zero_ttl_is_expired() {
        let entry = StoredEntry::new(1u32, Duration::ZERO);
        assert!(entry.is_expired());
        assert!(entry.time_until_expiration().is_none());
        assert_eq!(entry.into_live(), None);
    }

    #[test]
    fn test_past_expiration() {
        let entry = StoredEntry::with_expiration(1u32, Utc::now() - chrono::Duration::seconds(5));
        assert!(entry.is_expired());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = StoredEntry::new("v", Duration::from_millis(50));
        assert!(!entry.is_expired());
        sleep(Duration::from_millis(80));
        assert!(entry.is_expired());
    }

    #[test]
    fn test_age() {
        let entry = StoredEntry::new("v", Duration::from_secs(60));
        sleep(Duration::from_millis(10));
        assert!(entry.age() >= Duration::from_millis(10));
    }

    #[test]
    fn test_json_envelope() {
        let entry = StoredEntry::new(vec![1, 2, 3], Duration::from_secs(60));
        let json = entry.to_json().unwrap();
        assert!(json.contains("\"expires_at\""));

        let parsed: StoredEntry<Vec<i32>> = StoredEntry::from_json(&json).unwrap();
        assert_eq!(parsed, entry);

        let err = StoredEntry::<Vec<i32>>::from_json("[]").unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
