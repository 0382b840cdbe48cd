//! Fixed-window rate limiting behind an injectable store.
//!
//! Windows are keyed by (action, client key) and roll on elapsed wall
//! time, not on the calendar. The in-memory store is the single-process
//! default; the trait is the seam for a shared store when several
//! instances sit behind one load balancer.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Limits applied to one rate-limited action.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    pub window: Duration,
    pub max_requests: u32,
    /// Cap on distinct keys tracked for the action. When full, the key
    /// whose window started earliest is evicted to make room.
    pub max_keys: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { count: u32, remaining: u32 },
    Rejected { retry_after: Duration },
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit store error: {0}")]
    Store(String),
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one request for `key` under `action` and decide against the
    /// current window. A rejected request does not advance the counter.
    async fn hit(
        &self,
        action: &str,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, RateLimitError>;
}

#[derive(Debug)]
struct Window {
    count: u32,
    started: Instant,
}

/// Single-process fixed-window counter store.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    windows: Mutex<HashMap<(String, String), Window>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn hit(
        &self,
        action: &str,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, RateLimitError> {
        let mut windows = self
            .windows
            .lock()
            .map_err(|e| RateLimitError::Store(e.to_string()))?;
        let now = Instant::now();

        if let Some(window) = windows.get_mut(&(action.to_string(), key.to_string())) {
            let elapsed = now.duration_since(window.started);
            if elapsed >= policy.window {
                // Window expired: restart it with this request
                window.count = 1;
                window.started = now;
                return Ok(allowed(1, policy));
            }
            if window.count >= policy.max_requests {
                return Ok(RateLimitDecision::Rejected {
                    retry_after: policy.window - elapsed,
                });
            }
            window.count += 1;
            return Ok(allowed(window.count, policy));
        }

        // New key: stay within the tracking cap for this action
        let tracked = windows.keys().filter(|(a, _)| a == action).count();
        if tracked >= policy.max_keys {
            let oldest = windows
                .iter()
                .filter(|((a, _), _)| a == action)
                .min_by_key(|(_, window)| window.started)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                windows.remove(&oldest);
            }
        }

        windows.insert(
            (action.to_string(), key.to_string()),
            Window {
                count: 1,
                started: now,
            },
        );
        Ok(allowed(1, policy))
    }
}

fn allowed(count: u32, policy: &RateLimitPolicy) -> RateLimitDecision {
    RateLimitDecision::Allowed {
        count,
        remaining: policy.max_requests.saturating_sub(count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(window: Duration, max_requests: u32, max_keys: usize) -> RateLimitPolicy {
        RateLimitPolicy {
            window,
            max_requests,
            max_keys,
        }
    }

    async fn count_of(store: &MemoryRateLimitStore, action: &str, key: &str, p: &RateLimitPolicy) -> u32 {
        match store.hit(action, key, p).await.unwrap() {
            RateLimitDecision::Allowed { count, .. } => count,
            RateLimitDecision::Rejected { .. } => panic!("expected allowed"),
        }
    }

    #[tokio::test]
    async fn test_allows_up_to_limit_then_rejects() {
        let store = MemoryRateLimitStore::new();
        let p = policy(Duration::from_secs(60), 3, 500);

        for expected in 1..=3 {
            match store.hit("login", "1.2.3.4", &p).await.unwrap() {
                RateLimitDecision::Allowed { count, remaining } => {
                    assert_eq!(count, expected);
                    assert_eq!(remaining, 3 - expected);
                }
                RateLimitDecision::Rejected { .. } => panic!("should be allowed"),
            }
        }

        match store.hit("login", "1.2.3.4", &p).await.unwrap() {
            RateLimitDecision::Rejected { retry_after } => {
                assert!(retry_after > Duration::ZERO);
                assert!(retry_after <= Duration::from_secs(60));
            }
            RateLimitDecision::Allowed { .. } => panic!("should be rejected"),
        }
    }

    #[tokio::test]
    async fn test_rejection_does_not_advance_count() {
        let store = MemoryRateLimitStore::new();
        let p = policy(Duration::from_millis(100), 2, 500);

        store.hit("login", "k", &p).await.unwrap();
        store.hit("login", "k", &p).await.unwrap();
        for _ in 0..5 {
            assert!(matches!(
                store.hit("login", "k", &p).await.unwrap(),
                RateLimitDecision::Rejected { .. }
            ));
        }

        // After the window rolls the counter restarts at 1
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(count_of(&store, "login", "k", &p).await, 1);
        assert_eq!(count_of(&store, "login", "k", &p).await, 2);
        assert!(matches!(
            store.hit("login", "k", &p).await.unwrap(),
            RateLimitDecision::Rejected { .. }
        ));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = MemoryRateLimitStore::new();
        let p = policy(Duration::from_secs(60), 1, 500);

        store.hit("login", "1.1.1.1", &p).await.unwrap();
        assert!(matches!(
            store.hit("login", "1.1.1.1", &p).await.unwrap(),
            RateLimitDecision::Rejected { .. }
        ));
        assert!(matches!(
            store.hit("login", "2.2.2.2", &p).await.unwrap(),
            RateLimitDecision::Allowed { count: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_actions_are_independent() {
        let store = MemoryRateLimitStore::new();
        let p = policy(Duration::from_secs(60), 1, 500);

        store.hit("login", "1.1.1.1", &p).await.unwrap();
        assert!(matches!(
            store.hit("signup", "1.1.1.1", &p).await.unwrap(),
            RateLimitDecision::Allowed { count: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_eviction_drops_oldest_window_at_capacity() {
        let store = MemoryRateLimitStore::new();
        let p = policy(Duration::from_secs(60), 10, 3);

        store.hit("login", "a", &p).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.hit("login", "b", &p).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.hit("login", "c", &p).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        // Fourth key evicts "a", which has the oldest window start
        store.hit("login", "d", &p).await.unwrap();

        // "b" and "c" kept their counters
        assert_eq!(count_of(&store, "login", "b", &p).await, 2);
        assert_eq!(count_of(&store, "login", "c", &p).await, 2);
        // "a" starts over (and evicts the current oldest to fit)
        assert_eq!(count_of(&store, "login", "a", &p).await, 1);
    }

    #[tokio::test]
    async fn test_capacity_is_per_action() {
        let store = MemoryRateLimitStore::new();
        let p = policy(Duration::from_secs(60), 10, 1);

        store.hit("login", "a", &p).await.unwrap();
        // Different action, same cap: must not evict login's only key
        store.hit("signup", "b", &p).await.unwrap();
        assert_eq!(count_of(&store, "login", "a", &p).await, 2);
    }
}
