//! Rate-limit engine
//!
//! Buckets are discovered from response headers: a route's first request is
//! speculative (one inflight per unknown route), and the `X-RateLimit-Bucket`
//! hash in the response keys the bucket from then on, partitioned by the
//! route's major parameter. Waiters queue FIFO per bucket; a 429 with the
//! global flag pauses the whole process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use chat_common::{ClientError, ClientResult};

use crate::routes::Route;

/// Rate-limit response headers
pub const HEADER_BUCKET: &str = "X-RateLimit-Bucket";
pub const HEADER_LIMIT: &str = "X-RateLimit-Limit";
pub const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
pub const HEADER_RESET_AFTER: &str = "X-RateLimit-Reset-After";
pub const HEADER_GLOBAL: &str = "X-RateLimit-Global";
pub const HEADER_RETRY_AFTER: &str = "Retry-After";

/// Parsed rate-limit headers from one response
#[derive(Debug, Clone, Default)]
pub struct RateLimitHeaders {
    pub bucket: Option<String>,
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    /// Relative reset, preferred over absolute timestamps to dodge clock skew
    pub reset_after: Option<f64>,
    pub global: bool,
    pub retry_after: Option<f64>,
}

impl RateLimitHeaders {
    /// Read the rate-limit headers out of a response header map
    #[must_use]
    pub fn parse(headers: &reqwest::header::HeaderMap) -> Self {
        fn get<T: std::str::FromStr>(headers: &reqwest::header::HeaderMap, name: &str) -> Option<T> {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse().ok())
        }

        Self {
            bucket: get(headers, HEADER_BUCKET),
            limit: get(headers, HEADER_LIMIT),
            remaining: get(headers, HEADER_REMAINING),
            reset_after: get(headers, HEADER_RESET_AFTER),
            global: get::<String>(headers, HEADER_GLOBAL)
                .is_some_and(|value| value.eq_ignore_ascii_case("true")),
            retry_after: get(headers, HEADER_RETRY_AFTER),
        }
    }
}

#[derive(Debug, Default)]
struct BucketState {
    /// False until the first response reveals the bucket's limits
    known: bool,
    limit: u32,
    remaining: u32,
    reset_at: Option<Instant>,
}

/// One rate-limit bucket with a FIFO waiter queue
#[derive(Debug)]
struct Bucket {
    /// Fair mutex: waiters acquire in arrival order
    queue: Arc<Mutex<()>>,
    state: StdMutex<BucketState>,
}

impl Bucket {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            queue: Arc::new(Mutex::new(())),
            state: StdMutex::new(BucketState::default()),
        })
    }
}

/// Proof that a request may be sent
///
/// For a route with an unknown bucket the permit holds the queue guard so
/// followers wait for the discovery response; drop the permit (or call
/// `release`) once headers are processed.
pub struct RateLimitPermit {
    route_key: String,
    bucket: Arc<Bucket>,
    /// Held only while the bucket is undiscovered
    discovery_guard: Option<OwnedMutexGuard<()>>,
}

impl std::fmt::Debug for RateLimitPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitPermit")
            .field("route_key", &self.route_key)
            .field("discovery", &self.discovery_guard.is_some())
            .finish()
    }
}

/// Per-route and global rate limiting for REST requests
#[derive(Debug)]
pub struct RateLimiter {
    /// route key -> server bucket hash
    hashes: StdMutex<HashMap<String, String>>,
    /// `{hash}:{major}` (or provisional `{route key}`) -> bucket
    buckets: StdMutex<HashMap<String, Arc<Bucket>>>,
    /// Process-wide lockout deadline
    global_until: StdMutex<Option<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            hashes: StdMutex::new(HashMap::new()),
            buckets: StdMutex::new(HashMap::new()),
            global_until: StdMutex::new(None),
        }
    }

    /// Block until it is safe to send a request on this route
    pub async fn acquire(
        &self,
        route: &Route,
        cancel: &CancellationToken,
    ) -> ClientResult<RateLimitPermit> {
        let route_key = route.key();
        let bucket = self.bucket_for(&route_key);

        // Join the FIFO queue for this bucket.
        let queue = Arc::clone(&bucket.queue);
        let guard = tokio::select! {
            () = cancel.cancelled() => return Err(ClientError::Cancelled),
            guard = queue.lock_owned() => guard,
        };

        self.wait_global(cancel).await?;

        let discovery_guard = loop {
            let wait = {
                let mut state = bucket.state.lock().expect("bucket state poisoned");
                if !state.known {
                    // Speculative request: keep the guard until headers land.
                    break Some(guard);
                }

                let now = Instant::now();
                if state.reset_at.map_or(true, |reset| now >= reset) {
                    state.remaining = state.limit;
                }
                if state.remaining > 0 {
                    state.remaining -= 1;
                    break None;
                }
                state
                    .reset_at
                    .map_or(Duration::ZERO, |reset| reset.saturating_duration_since(now))
            };

            tokio::select! {
                () = cancel.cancelled() => return Err(ClientError::Cancelled),
                () = tokio::time::sleep(wait) => {}
            }
            self.wait_global(cancel).await?;
        };

        Ok(RateLimitPermit {
            route_key,
            bucket,
            discovery_guard,
        })
    }

    /// Feed a response's headers back into the engine
    ///
    /// Records the route-to-hash mapping, refreshes the bucket window, and
    /// arms the global lockout on a global 429. Call with whatever the
    /// server returned; for 5xx or transport errors just drop the permit
    /// instead (no bucket mutation).
    pub fn release(&self, permit: RateLimitPermit, headers: &RateLimitHeaders, status: u16) {
        let RateLimitPermit {
            route_key,
            bucket,
            discovery_guard,
        } = permit;

        if status == 429 && headers.global {
            let retry_after = headers.retry_after.or(headers.reset_after).unwrap_or(1.0);
            let until = Instant::now() + Duration::from_secs_f64(retry_after.max(0.0));
            *self.global_until.lock().expect("global lock poisoned") = Some(until);
            tracing::warn!(retry_after, "Global rate limit hit; pausing all requests");
            drop(discovery_guard);
            return;
        }

        let bucket = match &headers.bucket {
            Some(hash) => self.rekey_bucket(&route_key, hash, bucket),
            None => bucket,
        };

        {
            let mut state = bucket.state.lock().expect("bucket state poisoned");
            if let Some(limit) = headers.limit {
                state.limit = limit;
                state.known = true;
            }
            if let Some(remaining) = headers.remaining {
                state.remaining = remaining;
                state.known = true;
            }
            if let Some(reset_after) = headers.reset_after {
                state.reset_at = Some(Instant::now() + Duration::from_secs_f64(reset_after.max(0.0)));
            }

            if status == 429 {
                // Non-global 429: exhaust the offending bucket until Retry-After.
                let retry_after = headers.retry_after.or(headers.reset_after).unwrap_or(1.0);
                state.known = true;
                state.remaining = 0;
                state.reset_at = Some(Instant::now() + Duration::from_secs_f64(retry_after.max(0.0)));
                tracing::warn!(route = %route_key, retry_after, "Bucket rate limit hit");
            }
        }

        drop(discovery_guard);
    }

    /// Look up or create the bucket queue for a route
    fn bucket_for(&self, route_key: &str) -> Arc<Bucket> {
        let bucket_key = match self.hashes.lock().expect("hash map poisoned").get(route_key) {
            Some(hash) => hash_key(hash, route_key),
            None => route_key.to_string(),
        };

        let mut buckets = self.buckets.lock().expect("bucket map poisoned");
        Arc::clone(buckets.entry(bucket_key).or_insert_with(Bucket::new))
    }

    /// Move a provisional route-keyed bucket under its server hash
    ///
    /// Routes sharing a hash (per major value) converge on one bucket; the
    /// first route to discover the hash donates its bucket object.
    fn rekey_bucket(&self, route_key: &str, hash: &str, bucket: Arc<Bucket>) -> Arc<Bucket> {
        let known_hash = {
            let mut hashes = self.hashes.lock().expect("hash map poisoned");
            hashes.insert(route_key.to_string(), hash.to_string())
        };

        let bucket_key = hash_key(hash, route_key);
        let mut buckets = self.buckets.lock().expect("bucket map poisoned");

        if known_hash.as_deref() != Some(hash) {
            buckets.remove(route_key);
        }
        Arc::clone(buckets.entry(bucket_key).or_insert(bucket))
    }

    /// Sleep while the global lockout is armed
    async fn wait_global(&self, cancel: &CancellationToken) -> ClientResult<()> {
        loop {
            let wait = {
                let until = self.global_until.lock().expect("global lock poisoned");
                until.and_then(|deadline| {
                    let now = Instant::now();
                    (deadline > now).then(|| deadline - now)
                })
            };

            let Some(wait) = wait else {
                return Ok(());
            };
            tokio::select! {
                () = cancel.cancelled() => return Err(ClientError::Cancelled),
                () = tokio::time::sleep(wait) => {}
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Bucket storage key: server hash plus the route's major parameter
///
/// The major value is the trailing `:`-segment of the route key.
fn hash_key(hash: &str, route_key: &str) -> String {
    let major = route_key.rsplit(':').next().unwrap_or("-");
    format!("{hash}:{major}")
}
