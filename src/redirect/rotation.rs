//! Per-domain round-robin cursors.
//!
//! [`RotationState`] maps each domain to an atomic cursor. Selecting a
//! target reads the cursor, returns the target at that index and stores
//! `(cursor + 1) % len` in a single compare-and-swap, so concurrent
//! requests for one domain never reuse or skip an index. Different
//! domains only share the map's shard locks while a cursor is looked up.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct RotationState {
    cursors: DashMap<String, AtomicUsize>,
}

impl RotationState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the next target for `domain` and advance its cursor.
    ///
    /// The first call for a domain returns `targets[0]`. A cursor left out
    /// of range by a reload that shrank the target list is wrapped back
    /// into range before use. Returns `None` when `targets` is empty.
    pub fn next<'a>(&self, domain: &str, targets: &'a [String]) -> Option<&'a str> {
        let len = targets.len();
        if len == 0 {
            return None;
        }

        let advance = |cursor: &AtomicUsize| {
            cursor
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c % len + 1) % len))
                .map_or(0, |prev| prev % len)
        };

        // Fast path avoids allocating the key once the domain has a cursor.
        let index = match self.cursors.get(domain) {
            Some(cursor) => advance(cursor.value()),
            None => advance(self.cursors.entry(domain.to_owned()).or_default().value()),
        };

        targets.get(index).map(String::as_str)
    }

    /// Index the next call for `domain` would start from, without advancing.
    #[must_use]
    pub fn cursor(&self, domain: &str) -> usize {
        self.cursors
            .get(domain)
            .map_or(0, |c| c.load(Ordering::Acquire))
    }

    /// Number of domains that have been rotated at least once.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }
}
