//! Identify rate buckets
//!
//! The server limits concurrent identifies: shards in the same bucket
//! (`shard_id % max_concurrency`) must identify sequentially with spacing,
//! while different buckets may identify in parallel.

use std::time::Duration;

/// Required spacing between identifies within one bucket
pub const IDENTIFY_SPACING: Duration = Duration::from_secs(5);

/// Partition shard ids into identify buckets
///
/// Bucket `k` holds every shard with `shard_id % max_concurrency == k`, in
/// ascending order. Empty buckets are omitted.
#[must_use]
pub fn identify_buckets(shard_ids: &[u32], max_concurrency: u32) -> Vec<Vec<u32>> {
    let max_concurrency = max_concurrency.max(1);

    let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); max_concurrency as usize];
    let mut sorted = shard_ids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    for shard_id in sorted {
        buckets[(shard_id % max_concurrency) as usize].push(shard_id);
    }

    buckets.retain(|bucket| !bucket.is_empty());
    buckets
}
