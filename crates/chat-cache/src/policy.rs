//! Cache retention policies
//!
//! A policy decides whether an incoming value is worth keeping. Policies
//! compose with `or`/`and` so callers can build e.g. "bots or voice-connected
//! members" without writing a new closure.

use std::fmt;
use std::sync::Arc;

/// Predicate deciding whether to retain an incoming cache value
pub struct CachePolicy<T>(Arc<dyn Fn(&T) -> bool + Send + Sync>);

impl<T> CachePolicy<T> {
    /// Create a policy from a predicate
    pub fn new(predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    /// Retain everything
    #[must_use]
    pub fn all() -> Self {
        Self::new(|_| true)
    }

    /// Retain nothing
    #[must_use]
    pub fn none() -> Self {
        Self::new(|_| false)
    }

    /// Retain values passing either policy
    #[must_use]
    pub fn or(self, other: Self) -> Self
    where
        T: 'static,
    {
        Self::new(move |value| self.test(value) || other.test(value))
    }

    /// Retain values passing both policies
    #[must_use]
    pub fn and(self, other: Self) -> Self
    where
        T: 'static,
    {
        Self::new(move |value| self.test(value) && other.test(value))
    }

    /// Evaluate the policy for a value
    #[inline]
    #[must_use]
    pub fn test(&self, value: &T) -> bool {
        (self.0)(value)
    }
}

impl<T> Clone for CachePolicy<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Default for CachePolicy<T> {
    fn default() -> Self {
        Self::all()
    }
}

impl<T> fmt::Debug for CachePolicy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CachePolicy")
    }
}
