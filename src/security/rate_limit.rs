//! Fixed-window rate limiting per client key.
//!
//! Each quota class (contact form, admin writes, general reads) owns one
//! [`RateLimiter`] with its own key space. A window opens on the first
//! request from a key and admits up to `max_requests` until it expires.
//! Requests straddling a window boundary can therefore see up to twice the
//! quota in a short burst.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{header::RETRY_AFTER, HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::MethodRouter,
    Json,
};
use dashmap::DashMap;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::{QuotaConfig, RateLimitConfig};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Key used when a request carries no address information.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Wall-clock source in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync + 'static {
    fn now_ms(&self) -> u64;
}

/// The system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Window expiry in milliseconds since the Unix epoch.
    pub reset_at_ms: u64,
}

impl RateLimitDecision {
    /// Window expiry in whole epoch seconds, rounded up.
    pub fn reset_secs(&self) -> u64 {
        self.reset_at_ms.div_ceil(1000)
    }

    /// Seconds a rejected caller should wait, rounded up.
    pub fn retry_after_secs(&self, now_ms: u64) -> u64 {
        self.reset_at_ms.saturating_sub(now_ms).div_ceil(1000)
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    count: u32,
    reset_at_ms: u64,
}

struct Inner {
    name: String,
    window_ms: u64,
    max_requests: u32,
    entries: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
}

impl Inner {
    /// Read-check-increment under the entry's shard lock.
    fn admit(&self, entry: &mut Entry, now: u64) -> RateLimitDecision {
        if now >= entry.reset_at_ms {
            *entry = Entry {
                count: 1,
                reset_at_ms: now.saturating_add(self.window_ms),
            };
            return RateLimitDecision {
                allowed: true,
                remaining: self.max_requests.saturating_sub(1),
                reset_at_ms: entry.reset_at_ms,
            };
        }

        if entry.count < self.max_requests {
            entry.count += 1;
            RateLimitDecision {
                allowed: true,
                remaining: self.max_requests - entry.count,
                reset_at_ms: entry.reset_at_ms,
            }
        } else {
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at_ms: entry.reset_at_ms,
            }
        }
    }

    fn sweep(&self) -> usize {
        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.reset_at_ms);
        let live = self.entries.len();
        metrics::record_rate_limit_entries(&self.name, live);
        before.saturating_sub(live)
    }
}

/// In-memory fixed-window rate limiter for one quota class.
///
/// Cloning is cheap and clones share the same counters.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

impl RateLimiter {
    pub fn new(name: impl Into<String>, quota: QuotaConfig) -> Self {
        Self::with_clock(name, quota, Arc::new(SystemClock))
    }

    pub fn with_clock(name: impl Into<String>, quota: QuotaConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                window_ms: quota.window_ms,
                max_requests: quota.max_requests,
                entries: DashMap::new(),
                clock,
            }),
        }
    }

    /// Quota class label.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Requests admitted per window.
    pub fn limit(&self) -> u32 {
        self.inner.max_requests
    }

    pub fn now_ms(&self) -> u64 {
        self.inner.clock.now_ms()
    }

    /// Number of tracked keys, expired or not.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Count a request from `key` against the current window.
    ///
    /// Rejections do not consume quota.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        let now = self.inner.clock.now_ms();

        if let Some(mut entry) = self.inner.entries.get_mut(key) {
            return self.inner.admit(&mut entry, now);
        }

        let mut entry = self.inner.entries.entry(key.to_owned()).or_insert(Entry {
            count: 0,
            reset_at_ms: now,
        });
        self.inner.admit(&mut entry, now)
    }

    /// Drop every entry whose window has expired. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.inner.sweep()
    }

    /// Start the periodic sweep.
    ///
    /// The task stops when `shutdown` fires, when the returned handle is
    /// dropped, or once every clone of this limiter is gone.
    pub fn spawn_sweeper(
        &self,
        every: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> SweeperHandle {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let name = self.inner.name.clone();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(every);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(inner) = weak.upgrade() else {
                            break;
                        };
                        let removed = inner.sweep();
                        if removed > 0 {
                            tracing::debug!(class = %name, removed, "Swept expired rate limit entries");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!(class = %name, "Rate limit sweeper stopping");
                        break;
                    }
                }
            }
        });

        SweeperHandle { task: Some(task) }
    }
}

/// Owner of a running sweep task. Dropping it cancels the task.
#[derive(Debug)]
pub struct SweeperHandle {
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Wait for the task to exit after shutdown has been triggered.
    pub async fn stopped(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// The configured quota classes.
#[derive(Clone)]
pub struct RateLimiters {
    pub contact: RateLimiter,
    pub admin: RateLimiter,
    pub general: RateLimiter,
    enabled: bool,
    sweep_interval: Duration,
}

impl RateLimiters {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            contact: RateLimiter::with_clock("contact", config.contact, clock.clone()),
            admin: RateLimiter::with_clock("admin", config.admin, clock.clone()),
            general: RateLimiter::with_clock("general", config.general, clock),
            enabled: config.enabled,
            sweep_interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Start one sweeper per class, all bound to `shutdown`.
    pub fn spawn_sweepers(&self, shutdown: &Shutdown) -> Vec<SweeperHandle> {
        if !self.enabled {
            return Vec::new();
        }
        [&self.contact, &self.admin, &self.general]
            .into_iter()
            .map(|limiter| limiter.spawn_sweeper(self.sweep_interval, shutdown.subscribe()))
            .collect()
    }

    /// Guard `route` with `limiter` unless rate limiting is disabled.
    pub fn guard<S>(&self, route: MethodRouter<S>, limiter: &RateLimiter) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        if self.enabled {
            with_rate_limit(route, limiter.clone())
        } else {
            route
        }
    }
}

/// Derive the rate limiting key from proxy headers.
///
/// Prefers the first `X-Forwarded-For` hop, then `X-Real-IP`.
pub fn client_key(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

/// Wrap a route so that `limiter` is consulted before the handler runs.
pub fn with_rate_limit<S>(route: MethodRouter<S>, limiter: RateLimiter) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
}

fn apply_quota_headers(headers: &mut HeaderMap, limit: u32, decision: &RateLimitDecision) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(decision.reset_secs()));
}

/// Middleware function for fixed-window rate limiting.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(request.headers());
    let decision = limiter.check(&key);

    if !decision.allowed {
        tracing::warn!(
            class = limiter.name(),
            client = %key,
            reset_at_ms = decision.reset_at_ms,
            "Rate limit exceeded"
        );
        metrics::record_rate_limited(limiter.name());

        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Too many requests. Please try again later.",
                "resetTime": decision.reset_at_ms,
            })),
        )
            .into_response();
        let headers = response.headers_mut();
        apply_quota_headers(headers, limiter.limit(), &decision);
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from(decision.retry_after_secs(limiter.now_ms())),
        );
        return response;
    }

    let mut response = next.run(request).await;
    apply_quota_headers(response.headers_mut(), limiter.limit(), &decision);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_MS: u64 = 1_700_000_000_000;

    fn limiter(max: u32, window_ms: u64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(START_MS));
        let limiter = RateLimiter::with_clock(
            "test",
            QuotaConfig {
                window_ms,
                max_requests: max,
            },
            clock.clone(),
        );
        (limiter, clock)
    }

    #[test]
    fn test_quota_then_reject_then_reset() {
        let (limiter, clock) = limiter(5, 60_000);
        let key = "203.0.113.7";

        let remaining: Vec<u32> = (0..5)
            .map(|_| {
                let d = limiter.check(key);
                assert!(d.allowed);
                d.remaining
            })
            .collect();
        assert_eq!(remaining, vec![4, 3, 2, 1, 0]);

        let sixth = limiter.check(key);
        assert!(!sixth.allowed);
        assert_eq!(sixth.remaining, 0);
        assert_eq!(sixth.reset_at_ms, START_MS + 60_000);

        clock.advance(Duration::from_millis(60_001));
        let seventh = limiter.check(key);
        assert!(seventh.allowed);
        assert_eq!(seventh.remaining, 4);
        assert_eq!(seventh.reset_at_ms, START_MS + 60_001 + 60_000);
    }

    #[test]
    fn test_window_expires_exactly_at_reset() {
        let (limiter, clock) = limiter(1, 1_000);
        assert!(limiter.check("k").allowed);
        assert!(!limiter.check("k").allowed);

        clock.advance(Duration::from_millis(1_000));
        assert!(limiter.check("k").allowed);
    }

    #[test]
    fn test_boundary_burst_admits_twice_the_quota() {
        let (limiter, clock) = limiter(5, 60_000);
        assert!(limiter.check("k").allowed);

        clock.advance(Duration::from_millis(59_999));
        let late = (0..5).filter(|_| limiter.check("k").allowed).count();
        assert_eq!(late, 4);

        clock.advance(Duration::from_millis(1));
        let early = (0..5).filter(|_| limiter.check("k").allowed).count();
        assert_eq!(early, 5);

        // Nine admitted within a millisecond of each other.
        assert_eq!(late + early, 9);
    }

    #[test]
    fn test_huge_window_saturates() {
        let (limiter, _) = limiter(2, u64::MAX);
        let first = limiter.check("k");
        assert!(first.allowed);
        assert_eq!(first.reset_at_ms, u64::MAX);
        assert!(limiter.check("k").allowed);
        assert!(!limiter.check("k").allowed);
    }

    #[test]
    fn test_rejection_does_not_extend_window() {
        let (limiter, clock) = limiter(1, 1_000);
        let first = limiter.check("k");
        clock.advance(Duration::from_millis(500));
        let rejected = limiter.check("k");
        assert!(!rejected.allowed);
        assert_eq!(rejected.reset_at_ms, first.reset_at_ms);
    }

    #[test]
    fn test_keys_are_isolated() {
        let (limiter, _) = limiter(2, 60_000);
        assert!(limiter.check("a").allowed);
        assert!(limiter.check("a").allowed);
        assert!(!limiter.check("a").allowed);

        let other = limiter.check("b");
        assert!(other.allowed);
        assert_eq!(other.remaining, 1);
    }

    #[test]
    fn test_instances_are_isolated() {
        let clock = Arc::new(ManualClock::new(START_MS));
        let contact = RateLimiter::with_clock("contact", QuotaConfig::per_minute(1), clock.clone());
        let admin = RateLimiter::with_clock("admin", QuotaConfig::per_minute(30), clock);

        assert!(contact.check("10.0.0.1").allowed);
        assert!(!contact.check("10.0.0.1").allowed);

        let d = admin.check("10.0.0.1");
        assert!(d.allowed);
        assert_eq!(d.remaining, 29);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let (limiter, clock) = limiter(5, 1_000);
        limiter.check("old");
        clock.advance(Duration::from_millis(600));
        limiter.check("fresh");
        clock.advance(Duration::from_millis(500));

        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.len(), 1);

        // Swept keys start a new window.
        assert_eq!(limiter.check("old").remaining, 4);
    }

    #[test]
    fn test_decision_header_values() {
        let d = RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_at_ms: 10_001,
        };
        assert_eq!(d.reset_secs(), 11);
        assert_eq!(d.retry_after_secs(9_000), 2);
        assert_eq!(d.retry_after_secs(20_000), 0);
    }

    #[test]
    fn test_concurrent_checks_never_overshoot() {
        let (limiter, _) = limiter(50, 60_000);
        let admitted = Arc::new(AtomicU64::new(0));

        std::thread::scope(|s| {
            for _ in 0..8 {
                let limiter = limiter.clone();
                let admitted = admitted.clone();
                s.spawn(move || {
                    for _ in 0..20 {
                        if limiter.check("shared").allowed {
                            admitted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(admitted.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn test_client_key_precedence() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_key(&headers), UNKNOWN_CLIENT);

        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_key(&headers), "198.51.100.2");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"),
        );
        assert_eq!(client_key(&headers), "203.0.113.7");

        headers.insert("x-forwarded-for", HeaderValue::from_static(" , 10.0.0.1"));
        assert_eq!(client_key(&headers), "198.51.100.2");
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let (limiter, _) = limiter(5, 1_000);
        let shutdown = Shutdown::new();
        let handle = limiter.spawn_sweeper(Duration::from_millis(10), shutdown.subscribe());

        shutdown.trigger();
        time::timeout(Duration::from_secs(1), handle.stopped())
            .await
            .expect("sweeper did not stop");
    }

    #[tokio::test]
    async fn test_sweeper_exits_when_limiter_dropped() {
        let (limiter, clock) = limiter(5, 1_000);
        let shutdown = Shutdown::new();
        limiter.check("k");
        clock.advance(Duration::from_secs(2));

        let handle = limiter.spawn_sweeper(Duration::from_millis(5), shutdown.subscribe());
        time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.is_empty());

        drop(limiter);
        time::timeout(Duration::from_secs(1), handle.stopped())
            .await
            .expect("sweeper outlived its limiter");
    }
}
