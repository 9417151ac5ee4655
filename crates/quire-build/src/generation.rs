//! Latest-wins commits for concurrent page renders.

use std::collections::HashMap;
use std::sync::Mutex;

/// Claim to commit output for one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderToken {
    route: String,
    generation: u64,
}

impl RenderToken {
    /// Route the token was issued for.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Generation number; later tokens have larger numbers.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Default)]
struct Generations {
    next: u64,
    latest: HashMap<String, u64>,
}

/// Tracks the newest render issued per route.
///
/// Issuing a token for a route supersedes every earlier token for it. The
/// final step of a commit runs under the tracker's lock, so a superseded
/// render can never overwrite the result of a newer one. Renders stage their
/// output beforehand and only rename it into place inside [`commit`].
///
/// [`commit`]: GenerationTracker::commit
#[derive(Debug, Default)]
pub struct GenerationTracker {
    inner: Mutex<Generations>,
}

impl GenerationTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for `route`, superseding any earlier one.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn issue(&self, route: &str) -> RenderToken {
        let mut inner = self.inner.lock().unwrap();
        inner.next += 1;
        let generation = inner.next;
        inner.latest.insert(route.to_owned(), generation);
        RenderToken {
            route: route.to_owned(),
            generation,
        }
    }

    /// Check whether `token` is still the newest for its route.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn is_current(&self, token: &RenderToken) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.latest.get(&token.route) == Some(&token.generation)
    }

    /// Run `commit` if `token` is still current, holding the lock throughout.
    ///
    /// Returns `None` without calling `commit` when the token is superseded.
    /// Every route's commits wait on the same lock, so `commit` should be a
    /// rename rather than a full write.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn commit<T>(&self, token: &RenderToken, commit: impl FnOnce() -> T) -> Option<T> {
        let inner = self.inner.lock().unwrap();
        if inner.latest.get(&token.route) != Some(&token.generation) {
            tracing::debug!(
                route = %token.route,
                generation = token.generation,
                "Discarding superseded render"
            );
            return None;
        }
        Some(commit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_newer_token_supersedes_older() {
        let tracker = GenerationTracker::new();
        let first = tracker.issue("/cli/");
        let second = tracker.issue("/cli/");

        assert!(second.generation() > first.generation());
        assert!(!tracker.is_current(&first));
        assert_eq!(tracker.commit(&first, || "stale"), None);
        assert_eq!(tracker.commit(&second, || "fresh"), Some("fresh"));
    }

    #[test]
    fn test_routes_are_independent() {
        let tracker = GenerationTracker::new();
        let cli = tracker.issue("/cli/");
        let _maven = tracker.issue("/maven/");

        assert!(tracker.is_current(&cli));
        assert_eq!(cli.route(), "/cli/");
    }

    #[test]
    fn test_only_latest_commits_under_contention() {
        let tracker = Arc::new(GenerationTracker::new());
        let tokens: Vec<_> = (0..8).map(|_| tracker.issue("/")).collect();
        let committed = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = tokens
            .into_iter()
            .map(|token| {
                let tracker = Arc::clone(&tracker);
                let committed = Arc::clone(&committed);
                thread::spawn(move || {
                    tracker.commit(&token, || committed.lock().unwrap().push(token.generation()));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*committed.lock().unwrap(), vec![8]);
    }
}
