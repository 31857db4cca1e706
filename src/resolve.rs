//! Identity resolution.
//!
//! Probes each platform in order with the Bungie name search and stops at
//! the first platform that returns at least one card. Only the first card
//! of that response is used; platform order is the sole tie-break.
//!
//! A probe that fails (network, HTTP status, service error, unexpected
//! shape) counts as a miss for that platform and the search moves on.

use crate::api::BungieApi;
use crate::error::HarvestError;
use crate::models::{MembershipType, PlayerHandle, ResolvedIdentity};
use crate::progress::{ProgressEvent, ProgressReporter};

/// Resolve `handle` to a membership by probing `platforms` in order.
///
/// # Errors
///
/// [`HarvestError::NotFound`] when no platform yields a hit.
pub async fn resolve(
    api: &dyn BungieApi,
    handle: &PlayerHandle,
    platforms: &[MembershipType],
    progress: &dyn ProgressReporter,
) -> Result<ResolvedIdentity, HarvestError> {
    for &platform in platforms {
        progress.report(ProgressEvent::Probing { platform });

        let cards = match api.search_by_bungie_name(platform, handle).await {
            Ok(cards) => cards,
            Err(e) => {
                tracing::warn!(platform = platform.0, error = %e, "search failed; trying next platform");
                continue;
            }
        };

        if let Some(card) = cards.into_iter().next() {
            let identity = ResolvedIdentity::from(card);
            progress.report(ProgressEvent::Found {
                identity: identity.clone(),
            });
            return Ok(identity);
        }

        tracing::debug!(platform = platform.0, "no match on platform");
    }

    Err(HarvestError::NotFound(handle.clone()))
}
