// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sliding-window request counters.
//!
//! Each key holds the instants of its recent hits. A hit is admitted when
//! fewer than `max` hits fall inside the trailing window. Counters live in a
//! `DashMap`, so hits on the same key are serialized by the shard lock and
//! hits on different keys do not contend.

use crate::error::AppError;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Ceiling and window for one class of requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub name: &'static str,
    pub max: usize,
    pub window: Duration,
    /// Shown to the client on rejection.
    pub message: &'static str,
    /// Hand back the hit when the response is a success.
    pub skip_successful: bool,
}

const MINUTE: Duration = Duration::from_secs(60);

impl RateLimitPolicy {
    pub const API: Self = Self {
        name: "api",
        max: 100,
        window: Duration::from_secs(15 * 60),
        message: "Too many requests, please try again later.",
        skip_successful: false,
    };

    pub const LOGIN: Self = Self {
        name: "login",
        max: 5,
        window: Duration::from_secs(15 * 60),
        message: "Too many login attempts, please try again in 15 minutes.",
        skip_successful: true,
    };

    pub const REGISTER: Self = Self {
        name: "register",
        max: 3,
        window: Duration::from_secs(60 * 60),
        message: "Too many accounts created, please try again in an hour.",
        skip_successful: false,
    };

    pub const PASSWORD_RESET: Self = Self {
        name: "password_reset",
        max: 3,
        window: Duration::from_secs(60 * 60),
        message: "Too many password reset requests, please try again in an hour.",
        skip_successful: false,
    };

    pub const DONATION: Self = Self {
        name: "donation",
        max: 30,
        window: Duration::from_secs(60 * 60),
        message: "Too many donations posted, please try again later.",
        skip_successful: false,
    };

    pub const UPLOAD: Self = Self {
        name: "upload",
        max: 20,
        window: Duration::from_secs(15 * 60),
        message: "Too many uploads, please try again later.",
        skip_successful: false,
    };

    pub const SEARCH: Self = Self {
        name: "search",
        max: 30,
        window: MINUTE,
        message: "Too many search requests, please try again later.",
        skip_successful: false,
    };
}

/// Who a request is counted against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientKey {
    User(String),
    Ip(String),
}

impl std::fmt::Display for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientKey::User(id) => write!(f, "user:{}", id),
            ClientKey::Ip(addr) => write!(f, "ip:{}", addr),
        }
    }
}

/// Receipt for an admitted hit, used to give it back.
#[derive(Debug, Clone)]
pub struct Hit {
    key: String,
    at: Instant,
}

struct Window {
    length: Duration,
    hits: VecDeque<Instant>,
}

impl Window {
    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.hits.front() {
            if now.saturating_duration_since(oldest) >= self.length {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }
}

#[derive(Default)]
pub struct RateLimiter {
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a request against `client` under `policy`.
    pub fn hit(&self, policy: &RateLimitPolicy, client: &ClientKey) -> Result<Hit, AppError> {
        self.hit_at(policy, client, Instant::now())
    }

    /// As [`hit`](Self::hit), at an explicit instant.
    pub fn hit_at(
        &self,
        policy: &RateLimitPolicy,
        client: &ClientKey,
        now: Instant,
    ) -> Result<Hit, AppError> {
        let key = format!("{}:{}", policy.name, client);
        let mut window = self.windows.entry(key.clone()).or_insert_with(|| Window {
            length: policy.window,
            hits: VecDeque::new(),
        });
        window.prune(now);

        if window.hits.len() >= policy.max {
            let retry_after = window
                .hits
                .front()
                .map(|&oldest| policy.window.saturating_sub(now.saturating_duration_since(oldest)))
                .unwrap_or(policy.window);
            // Round up so clients never retry a moment too early.
            let retry_after_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            tracing::warn!(
                policy = policy.name,
                client = %client,
                retry_after_secs,
                "Rate limit exceeded"
            );
            return Err(AppError::RateLimited {
                message: policy.message.to_string(),
                retry_after_secs: retry_after_secs.max(1),
            });
        }

        window.hits.push_back(now);
        Ok(Hit { key, at: now })
    }

    /// Give back a previously admitted hit.
    pub fn undo(&self, hit: &Hit) {
        if let Some(mut window) = self.windows.get_mut(&hit.key) {
            if let Some(pos) = window.hits.iter().rposition(|&t| t == hit.at) {
                window.hits.remove(pos);
            }
        }
    }

    /// Hits currently counted for `client` under `policy`.
    pub fn count(&self, policy: &RateLimitPolicy, client: &ClientKey) -> usize {
        let key = format!("{}:{}", policy.name, client);
        self.windows.get(&key).map(|w| w.hits.len()).unwrap_or(0)
    }

    /// Drop expired hits and forget idle keys. Returns the number of keys removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| {
            window.prune(now);
            !window.hits.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(addr: &str) -> ClientKey {
        ClientKey::Ip(addr.to_string())
    }

    #[test]
    fn test_limit_enforced_within_window() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::REGISTER;
        let now = Instant::now();

        for _ in 0..3 {
            limiter.hit_at(&policy, &ip("1.2.3.4"), now).unwrap();
        }
        let err = limiter.hit_at(&policy, &ip("1.2.3.4"), now).unwrap_err();
        match err {
            AppError::RateLimited {
                retry_after_secs, ..
            } => assert_eq!(retry_after_secs, 3600),
            other => panic!("unexpected error: {other:?}"),
        }

        // Other clients and other policies are independent
        limiter.hit_at(&policy, &ip("5.6.7.8"), now).unwrap();
        limiter
            .hit_at(&RateLimitPolicy::LOGIN, &ip("1.2.3.4"), now)
            .unwrap();
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::SEARCH;
        let start = Instant::now();

        for i in 0..30 {
            limiter
                .hit_at(&policy, &ip("a"), start + Duration::from_secs(i))
                .unwrap();
        }
        assert!(limiter
            .hit_at(&policy, &ip("a"), start + Duration::from_secs(59))
            .is_err());

        // The first hit leaves the window after 60s; exactly one slot frees up
        let later = start + Duration::from_secs(60);
        limiter.hit_at(&policy, &ip("a"), later).unwrap();
        assert!(limiter.hit_at(&policy, &ip("a"), later).is_err());
    }

    #[test]
    fn test_undo_returns_slot() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::LOGIN;
        let key = ClientKey::User("u1".to_string());

        for _ in 0..10 {
            let hit = limiter.hit(&policy, &key).unwrap();
            limiter.undo(&hit);
        }
        assert_eq!(limiter.count(&policy, &key), 0);
    }

    #[test]
    fn test_purge_drops_idle_keys() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        limiter.hit_at(&RateLimitPolicy::SEARCH, &ip("a"), now).unwrap();
        limiter.hit_at(&RateLimitPolicy::API, &ip("a"), now).unwrap();
        assert_eq!(limiter.len(), 2);

        // Search window (1 min) has passed, API window (15 min) has not
        let removed = limiter.purge_expired_at(now + Duration::from_secs(120));
        assert_eq!(removed, 1);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_key_format() {
        assert_eq!(ClientKey::User("42".into()).to_string(), "user:42");
        assert_eq!(ip("10.0.0.1").to_string(), "ip:10.0.0.1");
    }
}
