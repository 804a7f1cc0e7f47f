//! Response assembly: snapshot to wire-level discovery response.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use meshplane_core::{PlaneError, Result};
use meshplane_store::ResourceSnapshot;
use meshplane_types::envoy::service::discovery::v3::DiscoveryResponse;

use crate::session::Subscription;

/// Global counter for generating unique nonces.
static NONCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a process-unique nonce.
///
/// Nonces correlate a response with the request that acknowledges or rejects
/// it. The format is `{timestamp_hex}-{counter_hex}`: the timestamp keeps
/// nonces distinguishable across restarts, the atomic counter keeps them
/// unique under concurrency within one process.
pub fn generate_nonce() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;

    let count = NONCE_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{timestamp:x}-{count:x}")
}

/// Renders a [`ResourceSnapshot`] into a wire-level [`DiscoveryResponse`].
///
/// Pure apart from nonce allocation: the same snapshot and subscription
/// always produce the same resource set and version, under a fresh nonce.
#[derive(Debug, Default)]
pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Create a response builder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build the response for a snapshot, honoring the subscription filter.
    ///
    /// Resources outside the subscribed name set are dropped; a wildcard
    /// subscription carries the full snapshot. An encoding failure aborts
    /// this push only.
    pub fn build(
        &self,
        snapshot: &ResourceSnapshot,
        subscription: &Subscription,
    ) -> Result<DiscoveryResponse> {
        let kind = snapshot.kind();
        let resources = snapshot
            .resources()
            .iter()
            .filter(|r| subscription.matches(r.name()))
            .map(|r| {
                r.encode().map_err(|e| PlaneError::Encoding {
                    type_url: kind.type_url().to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DiscoveryResponse {
            version_info: snapshot.version_info(),
            resources,
            type_url: kind.type_url().to_string(),
            nonce: generate_nonce(),
            ..Default::default()
        })
    }
}
