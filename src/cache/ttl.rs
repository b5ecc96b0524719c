//! TTL policy engine.
//!
//! Picks a base TTL bucket from a popularity score, then applies
//! volatility flags as a downward-only clamp. Volatility never extends
//! a lifetime.

use std::time::Duration;

use crate::domain::product::VolatilityFlags;

const DEFAULT_POPULARITY: u8 = 50;

#[derive(Debug, Clone)]
pub struct TtlPolicy {
    /// Bucket for popularity > 80.
    pub short: Duration,
    /// Bucket for popularity 50–80.
    pub medium: Duration,
    /// Bucket for popularity 20–50.
    pub long: Duration,
    /// Bucket for popularity < 20.
    pub longest: Duration,
    pub cap_new: Duration,
    pub cap_on_sale: Duration,
    pub cap_limited_stock: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(30 * 60),
            medium: Duration::from_secs(60 * 60),
            long: Duration::from_secs(3 * 60 * 60),
            longest: Duration::from_secs(6 * 60 * 60),
            cap_new: Duration::from_secs(30 * 60),
            cap_on_sale: Duration::from_secs(20 * 60),
            cap_limited_stock: Duration::from_secs(15 * 60),
        }
    }
}

impl TtlPolicy {
    /// Compute the cache lifetime for an entity.
    ///
    /// `popularity` is a 0–100 score; unknown entities get 50.
    pub fn ttl_for(&self, popularity: Option<u8>, flags: VolatilityFlags) -> Duration {
        let popularity = popularity.unwrap_or(DEFAULT_POPULARITY).min(100);

        let mut ttl = if popularity > 80 {
            self.short
        } else if popularity >= 50 {
            self.medium
        } else if popularity >= 20 {
            self.long
        } else {
            self.longest
        };

        if flags.is_new {
            ttl = ttl.min(self.cap_new);
        }
        if flags.is_on_sale {
            ttl = ttl.min(self.cap_on_sale);
        }
        if flags.limited_stock {
            ttl = ttl.min(self.cap_limited_stock);
        }

        ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(is_new: bool, is_on_sale: bool, limited_stock: bool) -> VolatilityFlags {
        VolatilityFlags {
            is_new,
            is_on_sale,
            limited_stock,
        }
    }

    #[test]
    fn popularity_buckets() {
        let policy = TtlPolicy::default();
        let none = VolatilityFlags::default();
        assert_eq!(policy.ttl_for(Some(90), none), policy.short);
        assert_eq!(policy.ttl_for(Some(80), none), policy.medium);
        assert_eq!(policy.ttl_for(Some(50), none), policy.medium);
        assert_eq!(policy.ttl_for(Some(30), none), policy.long);
        assert_eq!(policy.ttl_for(Some(5), none), policy.longest);
        assert_eq!(policy.ttl_for(None, none), policy.medium);
    }

    #[test]
    fn ttl_is_monotonic_in_popularity() {
        let policy = TtlPolicy::default();
        let none = VolatilityFlags::default();
        assert!(policy.ttl_for(Some(90), none) <= policy.ttl_for(Some(30), none));
        assert!(policy.ttl_for(Some(30), none) <= policy.ttl_for(Some(5), none));
    }

    #[test]
    fn volatility_only_shortens() {
        let policy = TtlPolicy::default();
        for popularity in [5u8, 30, 60, 90] {
            let base = policy.ttl_for(Some(popularity), VolatilityFlags::default());
            let sale = policy.ttl_for(Some(popularity), flags(false, true, false));
            assert!(sale <= base);
        }
    }

    #[test]
    fn combined_flags_take_the_minimum_cap() {
        let policy = TtlPolicy::default();
        let ttl = policy.ttl_for(Some(10), flags(true, true, true));
        assert_eq!(ttl, policy.cap_limited_stock);
    }

    #[test]
    fn caps_do_not_extend_short_ttls() {
        let policy = TtlPolicy {
            short: Duration::from_secs(5 * 60),
            ..Default::default()
        };
        // Base bucket already below every cap; flags must not raise it.
        let ttl = policy.ttl_for(Some(90), flags(true, false, false));
        assert_eq!(ttl, Duration::from_secs(5 * 60));
    }
}
