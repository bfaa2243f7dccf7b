//! Cache lifecycle policy: staleness window, ceilings and popularity limit.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tunable cache policy.
///
/// Loaded as the `cache` table of [`AppConfig`](crate::config::AppConfig),
/// e.g. `BIBLIOCACHE_CACHE__HARD_CEILING=20000`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// Age in days after which a cached book is expired.
    #[serde(default = "default_staleness_days")]
    pub staleness_days: u32,

    /// Row count above which cleanup is recommended.
    #[serde(default = "default_soft_ceiling")]
    pub soft_ceiling: u64,

    /// Row count at or above which the cache is unhealthy, and the size
    /// cleanup trims back to.
    #[serde(default = "default_hard_ceiling")]
    pub hard_ceiling: u64,

    /// Popular-search count used when the caller gives none or an unusable one.
    #[serde(default = "default_popular_limit")]
    pub default_popular_limit: u32,
}

fn default_staleness_days() -> u32 {
    7
}

fn default_soft_ceiling() -> u64 {
    8_000
}

fn default_hard_ceiling() -> u64 {
    10_000
}

fn default_popular_limit() -> u32 {
    10
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            staleness_days: default_staleness_days(),
            soft_ceiling: default_soft_ceiling(),
            hard_ceiling: default_hard_ceiling(),
            default_popular_limit: default_popular_limit(),
        }
    }
}

impl CachePolicy {
    /// Staleness window as a duration.
    pub fn staleness(&self) -> Duration {
        Duration::days(i64::from(self.staleness_days))
    }

    /// Rows cached strictly before this instant are expired at `now`.
    pub fn expiry_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.staleness()
    }

    /// `total_books < hard_ceiling`.
    pub fn is_healthy(&self, total_books: u64) -> bool {
        total_books < self.hard_ceiling
    }

    /// `total_books > soft_ceiling`.
    pub fn needs_cleanup(&self, total_books: u64) -> bool {
        total_books > self.soft_ceiling
    }

    /// Resolve a caller-supplied popularity limit.
    ///
    /// Absent and non-positive values fall back to `default_popular_limit`.
    pub fn popular_limit(&self, requested: Option<i64>) -> u32 {
        match requested {
            Some(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
            _ => self.default_popular_limit,
        }
    }

    /// Resolve a raw query-string popularity limit.
    ///
    /// Anything that is not an integer is treated like an absent value.
    pub fn parse_popular_limit(&self, raw: Option<&str>) -> u32 {
        self.popular_limit(raw.and_then(|s| s.trim().parse::<i64>().ok()))
    }
}
