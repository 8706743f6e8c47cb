//! Ordered pool of independent API credentials with a shared rotation cursor.
//!
//! The cursor is process-wide state: a dispatch starts on whichever credential
//! the previous dispatch left current. Advancing is a compare-and-swap from the
//! index the caller observed, so two concurrent failures on the same credential
//! move the cursor once, not twice.
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

pub struct CredentialPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
    rotations: AtomicU64,
}

impl std::fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPool")
            .field("len", &self.keys.len())
            .field("cursor", &self.cursor())
            .finish()
    }
}

impl CredentialPool {
    /// Build a pool from distinct, non-empty keys; order is preserved.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut distinct: Vec<String> = Vec::new();
        for key in keys {
            let key = key.into().trim().to_string();
            if !key.is_empty() && !distinct.contains(&key) {
                distinct.push(key);
            }
        }
        Self {
            keys: distinct,
            cursor: AtomicUsize::new(0),
            rotations: AtomicU64::new(0),
        }
    }

    /// Parse a comma-separated list such as `GROQ_API_KEYS=k1,k2,k3`.
    pub fn from_comma_separated(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Index of the credential the next attempt should use.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    /// How many times the cursor has moved since the pool was built.
    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::SeqCst)
    }

    /// The current credential and its index, or `None` for an empty pool.
    pub fn current(&self) -> Option<(usize, &str)> {
        if self.keys.is_empty() {
            return None;
        }
        let index = self.cursor() % self.keys.len();
        Some((index, self.keys[index].as_str()))
    }

    /// Move past the credential at `observed` (wrapping) and return the index
    /// that is current afterwards. A no-op if someone else already moved it.
    pub fn advance_from(&self, observed: usize) -> usize {
        if self.keys.is_empty() {
            return 0;
        }
        let next = (observed + 1) % self.keys.len();
        match self
            .cursor
            .compare_exchange(observed, next, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => {
                self.rotations.fetch_add(1, Ordering::SeqCst);
                next
            }
            Err(actual) => actual,
        }
    }
}
