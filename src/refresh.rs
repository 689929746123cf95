use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::RefreshConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrbitStatus {
    Fresh,
    Cached,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub status: OrbitStatus,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// User-facing message for a degraded-data episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: Severity,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub status: OrbitStatus,
    pub retry_after: Duration,
    pub notice: Option<Notice>,
}

/// Bookkeeping for periodic element-set refreshes.
///
/// Owned by the caller; performs no I/O. The caller reports each fetch
/// attempt and gets back the status to show and when to try again.
#[derive(Debug, Clone)]
pub struct TleRefreshPolicy {
    interval: Duration,
    retry_schedule: Vec<Duration>,
    max_staleness: Duration,
    retry_index: usize,
    in_flight: bool,
    warned_this_episode: bool,
    retry_not_before: Option<DateTime<Utc>>,
    status: OrbitStatus,
    updated_at: Option<DateTime<Utc>>,
}

impl Default for TleRefreshPolicy {
    fn default() -> Self {
        Self::new(&RefreshConfig::default())
    }
}

impl TleRefreshPolicy {
    pub fn new(config: &RefreshConfig) -> Self {
        Self {
            interval: config.interval,
            retry_schedule: config.retry_schedule.clone(),
            max_staleness: config.max_staleness,
            retry_index: 0,
            in_flight: false,
            warned_this_episode: false,
            retry_not_before: None,
            status: OrbitStatus::Fresh,
            updated_at: None,
        }
    }

    /// Seed `updated_at` from a previously cached element set
    pub fn with_cached(mut self, cached_at: Option<DateTime<Utc>>) -> Self {
        self.updated_at = cached_at;
        self
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            status: self.status,
            updated_at: self.updated_at,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// When the next fetch should start: the back-off deadline after a
    /// failure, otherwise one interval after the last update. `None` means
    /// nothing has been fetched yet.
    pub fn next_refresh_at(&self) -> Option<DateTime<Utc>> {
        self.retry_not_before
            .or_else(|| self.updated_at.map(|at| at + self.interval))
    }

    pub fn refresh_due(&self, now: DateTime<Utc>) -> bool {
        !self.in_flight && self.next_refresh_at().map_or(true, |at| now >= at)
    }

    /// Claim the next fetch. Refused while one is running or backing off.
    pub fn begin_attempt(&mut self, now: DateTime<Utc>) -> bool {
        if self.in_flight {
            return false;
        }
        if let Some(not_before) = self.retry_not_before {
            if now < not_before {
                return false;
            }
        }
        self.in_flight = true;
        true
    }

    pub fn record_success(&mut self, fetched_at: DateTime<Utc>) -> StatusReport {
        self.in_flight = false;
        self.retry_index = 0;
        self.retry_not_before = None;
        self.warned_this_episode = false;
        self.status = OrbitStatus::Fresh;
        self.updated_at = Some(fetched_at);
        log::info!("Element set refreshed at {}", fetched_at);
        self.status()
    }

    /// `cached_at` is when the element set still in use was fetched, if any
    pub fn record_failure(
        &mut self,
        cached_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> RefreshOutcome {
        self.in_flight = false;

        let (status, notice) = match cached_at {
            Some(cached_at) if now - cached_at > self.max_staleness => (
                OrbitStatus::Stale,
                Notice {
                    severity: Severity::Warning,
                    message: "Orbital updates unavailable. Showing last known orbit (refreshing in background).",
                },
            ),
            Some(_) => (
                OrbitStatus::Cached,
                Notice {
                    severity: Severity::Info,
                    message: "Using cached orbital data while updates retry in the background.",
                },
            ),
            None => (
                OrbitStatus::Stale,
                Notice {
                    severity: Severity::Error,
                    message: "No orbital data available. Retrying.",
                },
            ),
        };

        let first_in_episode = !self.warned_this_episode;
        if first_in_episode {
            match (status, cached_at) {
                (OrbitStatus::Stale, Some(_)) => {
                    log::warn!("Cached element set is stale; using last known values")
                }
                (_, Some(_)) => log::warn!("Using cached element set while updates retry"),
                (_, None) => log::error!("No cached element set available after fetch failure"),
            }
            self.warned_this_episode = true;
        }

        self.status = status;
        self.updated_at = cached_at;

        let retry_after = self.next_retry_delay();
        self.retry_not_before = Some(now + retry_after);

        RefreshOutcome {
            status,
            retry_after,
            notice: first_in_episode.then_some(notice),
        }
    }

    fn next_retry_delay(&mut self) -> Duration {
        let Some(last) = self.retry_schedule.len().checked_sub(1) else {
            return Duration::zero();
        };
        let delay = self.retry_schedule[self.retry_index.min(last)];
        if self.retry_index < last {
            self.retry_index += 1;
        }
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 12, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_single_attempt_in_flight() {
        let mut policy = TleRefreshPolicy::default();
        assert!(policy.begin_attempt(now()));
        assert!(policy.in_flight());
        assert!(!policy.begin_attempt(now()));

        policy.record_success(now());
        assert!(!policy.in_flight());
        assert!(policy.begin_attempt(now()));
    }

    #[test]
    fn test_retry_schedule_saturates() {
        let mut policy = TleRefreshPolicy::default();
        let delays: Vec<i64> = (0..8)
            .map(|_| {
                policy.begin_attempt(now() + Duration::days(1));
                policy.record_failure(None, now()).retry_after.num_seconds()
            })
            .collect();
        assert_eq!(delays, vec![2, 5, 15, 60, 180, 600, 600, 600]);
    }

    #[test]
    fn test_backoff_blocks_early_retry() {
        let mut policy = TleRefreshPolicy::default();
        assert!(policy.begin_attempt(now()));
        let outcome = policy.record_failure(None, now());
        assert_eq!(outcome.retry_after, Duration::seconds(2));
        assert!(!policy.begin_attempt(now() + Duration::seconds(1)));
        assert!(policy.begin_attempt(now() + Duration::seconds(2)));
    }

    #[test]
    fn test_failure_with_recent_cache_is_cached() {
        let mut policy = TleRefreshPolicy::default();
        let cached_at = now() - Duration::hours(1);
        let outcome = policy.record_failure(Some(cached_at), now());
        assert_eq!(outcome.status, OrbitStatus::Cached);
        assert_eq!(outcome.notice.unwrap().severity, Severity::Info);
        assert_eq!(policy.status().updated_at, Some(cached_at));
    }

    #[test]
    fn test_failure_with_old_cache_is_stale() {
        let mut policy = TleRefreshPolicy::default();
        let outcome = policy.record_failure(Some(now() - Duration::hours(7)), now());
        assert_eq!(outcome.status, OrbitStatus::Stale);
        assert_eq!(outcome.notice.unwrap().severity, Severity::Warning);
    }

    #[test]
    fn test_failure_without_cache() {
        let mut policy = TleRefreshPolicy::default().with_cached(Some(now()));
        let outcome = policy.record_failure(None, now());
        assert_eq!(outcome.status, OrbitStatus::Stale);
        assert_eq!(outcome.notice.unwrap().severity, Severity::Error);
        assert_eq!(policy.status().updated_at, None);
    }

    #[test]
    fn test_notice_once_per_episode() {
        let mut policy = TleRefreshPolicy::default();
        assert!(policy.record_failure(None, now()).notice.is_some());
        assert!(policy.record_failure(None, now()).notice.is_none());

        let report = policy.record_success(now());
        assert_eq!(report.status, OrbitStatus::Fresh);
        assert!(policy.record_failure(None, now()).notice.is_some());
    }

    #[test]
    fn test_next_refresh_follows_interval() {
        let mut policy = TleRefreshPolicy::default();
        assert_eq!(policy.next_refresh_at(), None);
        assert!(policy.refresh_due(now()));

        assert!(policy.begin_attempt(now()));
        assert!(!policy.refresh_due(now()));
        policy.record_success(now());
        assert_eq!(policy.next_refresh_at(), Some(now() + Duration::hours(1)));
        assert!(!policy.refresh_due(now() + Duration::minutes(59)));
        assert!(policy.refresh_due(now() + Duration::hours(1)));
    }

    #[test]
    fn test_next_refresh_after_failure_uses_backoff() {
        let config = RefreshConfig {
            interval: Duration::hours(2),
            ..RefreshConfig::default()
        };
        let mut policy = TleRefreshPolicy::new(&config).with_cached(Some(now()));
        assert_eq!(policy.next_refresh_at(), Some(now() + Duration::hours(2)));

        let later = now() + Duration::hours(2);
        policy.record_failure(Some(now()), later);
        assert_eq!(policy.next_refresh_at(), Some(later + Duration::seconds(2)));

        policy.record_success(later + Duration::seconds(2));
        assert_eq!(
            policy.next_refresh_at(),
            Some(later + Duration::seconds(2) + Duration::hours(2))
        );
    }

    #[test]
    fn test_success_resets_backoff() {
        let mut policy = TleRefreshPolicy::default();
        policy.record_failure(None, now());
        policy.record_failure(None, now());
        policy.record_success(now());
        let outcome = policy.record_failure(None, now());
        assert_eq!(outcome.retry_after, Duration::seconds(2));
    }
}
