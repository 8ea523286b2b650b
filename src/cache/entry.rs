//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL, access
//! tracking and invalidation tags.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Longest TTL an entry may carry: 100 years.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

// == Cache Entry ==
/// Represents a single cache entry with value and lifecycle metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Insertion instant, never mutated
    pub created_at: Instant,
    /// `created_at + ttl`
    pub expires_at: Instant,
    /// Instant of the last successful read (insertion counts as an access)
    pub last_access_at: Instant,
    /// Number of successful reads
    pub access_count: u64,
    /// Invalidation labels, fixed at insertion
    pub tags: HashSet<String>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl` from now.
    ///
    /// Callers must pass a non-zero TTL so that `expires_at > created_at`.
    /// TTLs above [`MAX_TTL`] are clamped to it.
    pub fn new(value: V, ttl: Duration, tags: HashSet<String>) -> Self {
        let now = Instant::now();

        Self {
            value,
            created_at: now,
            expires_at: now + ttl.min(MAX_TTL),
            last_access_at: now,
            access_count: 0,
            tags,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired strictly after `expires_at`.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Expiry check against a caller-supplied instant, so a sweep can use one
    /// clock reading for the whole pass.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now > self.expires_at
    }

    // == Age ==
    /// Time elapsed since insertion.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    // == Time To Live ==
    /// Remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    // == Touch ==
    /// Records a successful read.
    pub fn touch(&mut self) {
        self.last_access_at = Instant::now();
        self.access_count += 1;
    }

    /// Returns true if any of `tags` is attached to this entry.
    pub fn has_any_tag(&self, tags: &HashSet<String>) -> bool {
        !self.tags.is_disjoint(tags)
    }

    /// Metadata snapshot without the value.
    pub fn info(&self) -> EntryInfo {
        let mut tags: Vec<String> = self.tags.iter().cloned().collect();
        tags.sort();

        EntryInfo {
            age_ms: self.age().as_millis() as u64,
            ttl_remaining_ms: self.ttl_remaining().as_millis() as u64,
            idle_ms: self.last_access_at.elapsed().as_millis() as u64,
            access_count: self.access_count,
            tags,
        }
    }
}

// == Entry Info ==
/// Serializable view of an entry's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub age_ms: u64,
    pub ttl_remaining_ms: u64,
    /// Time since the last successful read
    pub idle_ms: u64,
    pub access_count: u64,
    /// Sorted tag list
    pub tags: Vec<String>,
}

// == Entry Options ==
/// Per-insert options: TTL override and tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryOptions {
    /// TTL override; the store default applies when `None`
    pub ttl: Option<Duration>,
    pub tags: Vec<String>,
}

impl EntryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TTL override.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Adds tags to the entry.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}
