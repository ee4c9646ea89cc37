//! Per-domain request pacing for the scraper
//!
//! Each domain keeps the time of its last admitted request and a count of
//! requests in the current window. The window restarts once more than the
//! window length has passed since the last admitted request, so this is a
//! fixed window with refresh rather than a sliding one. Refused requests are
//! not queued.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use super::ScraperConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainWindow {
    pub last_request: Instant,
    pub count: u32,
}

/// Process-wide admission table, owned by whoever constructs the scraper
#[derive(Debug)]
pub struct DomainRateLimiter {
    min_interval: Duration,
    max_requests: u32,
    window: Duration,
    domains: Mutex<HashMap<String, DomainWindow>>,
}

impl DomainRateLimiter {
    pub fn new(min_interval: Duration, max_requests: u32, window: Duration) -> Self {
        Self {
            min_interval,
            max_requests,
            window,
            domains: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(
            config.min_interval,
            config.max_requests_per_window,
            config.window,
        )
    }

    /// Admit or refuse a request to `domain` now
    pub fn check(&self, domain: &str) -> bool {
        self.check_at(domain, Instant::now())
    }

    /// Admit or refuse a request to `domain` at `now`
    pub fn check_at(&self, domain: &str, now: Instant) -> bool {
        let mut domains = match self.domains.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let Some(state) = domains.get_mut(domain) else {
            domains.insert(
                domain.to_string(),
                DomainWindow {
                    last_request: now,
                    count: 1,
                },
            );
            return true;
        };

        let elapsed = now.saturating_duration_since(state.last_request);
        if elapsed > self.window {
            *state = DomainWindow {
                last_request: now,
                count: 1,
            };
            return true;
        }
        if state.count >= self.max_requests {
            return false;
        }
        if elapsed < self.min_interval {
            return false;
        }

        state.count += 1;
        state.last_request = now;
        true
    }

    /// Current state for `domain`, if it has been seen
    pub fn window(&self, domain: &str) -> Option<DomainWindow> {
        match self.domains.lock() {
            Ok(guard) => guard.get(domain).copied(),
            Err(poisoned) => poisoned.into_inner().get(domain).copied(),
        }
    }

    /// Forget every domain
    pub fn reset(&self) {
        match self.domains.lock() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl Default for DomainRateLimiter {
    fn default() -> Self {
        Self::from_config(&ScraperConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_min_interval() {
        let limiter = DomainRateLimiter::default();
        let start = Instant::now();

        assert!(limiter.check_at("example.com", start));
        assert!(!limiter.check_at("example.com", start + Duration::from_millis(500)));
        assert!(limiter.check_at("example.com", start + secs(3)));
        assert_eq!(limiter.window("example.com").map(|w| w.count), Some(2));
    }

    #[test]
    fn test_domains_are_independent() {
        let limiter = DomainRateLimiter::default();
        let start = Instant::now();

        assert!(limiter.check_at("a.com", start));
        assert!(limiter.check_at("b.com", start));
    }

    #[test]
    fn test_six_rapid_requests_refuse_at_least_one() {
        let limiter = DomainRateLimiter::default();
        let start = Instant::now();

        let admitted = (0..6)
            .filter(|i| limiter.check_at("example.com", start + Duration::from_millis(*i * 100)))
            .count();
        assert!(admitted < 6);
    }

    #[test]
    fn test_window_budget_and_refresh() {
        let limiter = DomainRateLimiter::default();
        let start = Instant::now();

        // Five admitted requests spaced 3s apart use up the window budget
        for i in 0..5 {
            assert!(limiter.check_at("example.com", start + secs(i * 3)));
        }
        assert!(!limiter.check_at("example.com", start + secs(15)));
        assert!(!limiter.check_at("example.com", start + secs(60)));

        // More than 60s after the last admitted request the window restarts
        assert!(limiter.check_at("example.com", start + secs(12 + 61)));
        assert_eq!(limiter.window("example.com").map(|w| w.count), Some(1));
    }

    #[test]
    fn test_reset() {
        let limiter = DomainRateLimiter::default();
        let start = Instant::now();
        assert!(limiter.check_at("example.com", start));
        limiter.reset();
        assert!(limiter.window("example.com").is_none());
        assert!(limiter.check_at("example.com", start));
    }
}
