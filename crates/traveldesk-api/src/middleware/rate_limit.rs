//! Login throttling per client address

use std::net::IpAddr;
use std::num::NonZeroU32;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::warn;

/// Address when known, otherwise the submitted account name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LoginKey {
    Address(IpAddr),
    Account(String),
}

pub struct LoginRateLimiter {
    limiter: DefaultKeyedRateLimiter<LoginKey>,
}

impl LoginRateLimiter {
    pub fn new(per_minute: u32) -> Self {
        let burst = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::keyed(Quota::per_minute(burst)),
        }
    }

    /// Requests without a known address are throttled per account name
    /// instead of sharing one bucket.
    pub fn check(&self, ip: Option<IpAddr>, username: &str) -> bool {
        let key = match ip {
            Some(ip) => LoginKey::Address(ip),
            None => LoginKey::Account(username.trim().to_lowercase()),
        };
        let allowed = self.limiter.check_key(&key).is_ok();
        if !allowed {
            warn!("Login rate limit hit for {:?}", key);
        }
        allowed
    }

    /// Drops buckets that are back to full capacity. Returns how many went.
    pub fn retain_recent(&self) -> usize {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        before.saturating_sub(self.limiter.len())
    }

    pub fn tracked(&self) -> usize {
        self.limiter.len()
    }
}
