//! Resale chain resolver
//!
//! Walks forward from a request through winning offer → spawned resale
//! request links until it reaches the offer that actually carries the cargo.
//! The walk is iterative with a hop ceiling and a visited set, so corrupted
//! history (a cycle, or a RESOLD offer with no resale request) surfaces as
//! [`MarketError::ChainCorrupted`] instead of looping.

use super::storage::{MarketReader, StorageResult};
use super::traits::MarketError;
use shared::models::{Offer, OfferStatus};
use std::collections::HashSet;

/// Default hop ceiling
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 64;

/// What the resolver needs to know about the market
pub trait ChainSource {
    /// The request's single offer outside PENDING/REJECTED, if any
    fn winning_offer(&self, request_id: i64) -> StorageResult<Option<Offer>>;

    /// The request spawned by reselling `offer_id` that settled it
    fn resale_request_id(&self, offer_id: i64) -> StorageResult<Option<i64>>;
}

impl<R: MarketReader + ?Sized> ChainSource for R {
    fn winning_offer(&self, request_id: i64) -> StorageResult<Option<Offer>> {
        let mut winners = self
            .offers_for_request(request_id)?
            .into_iter()
            .filter(|o| o.status.is_winning());
        let winner = winners.next();
        if let Some(extra) = winners.next() {
            tracing::error!(
                request_id,
                offer_id = extra.id,
                "Request has more than one winning offer"
            );
        }
        Ok(winner)
    }

    fn resale_request_id(&self, offer_id: i64) -> StorageResult<Option<i64>> {
        Ok(self.resale_ids_for_source(offer_id)?.last().copied())
    }
}

/// Find the offer currently carrying the cargo of `request_id`
///
/// Returns `None` while some hop of the chain is still bidding.
pub fn find_final_offer<S: ChainSource + ?Sized>(
    source: &S,
    request_id: i64,
    max_depth: usize,
) -> Result<Option<Offer>, MarketError> {
    let mut current = request_id;
    let mut visited = HashSet::new();

    for depth in 0..=max_depth {
        if !visited.insert(current) {
            tracing::error!(request_id, revisited = current, depth, "Resale chain contains a cycle");
            return Err(MarketError::ChainCorrupted { request_id, depth });
        }

        let Some(winner) = source.winning_offer(current)? else {
            return Ok(None);
        };
        if winner.status != OfferStatus::Resold {
            return Ok(Some(winner));
        }

        match source.resale_request_id(winner.id)? {
            Some(next) => current = next,
            None => {
                tracing::error!(
                    request_id,
                    offer_id = winner.id,
                    depth,
                    "RESOLD offer has no resale request"
                );
                return Err(MarketError::ChainCorrupted { request_id, depth });
            }
        }
    }

    tracing::error!(request_id, max_depth, "Resale chain exceeded depth ceiling");
    Err(MarketError::ChainCorrupted {
        request_id,
        depth: max_depth,
    })
}

/// Request IDs from `request_id` back to the original request, walking
/// `source_offer_id` links upward (the reverse of [`find_final_offer`])
pub fn upstream_requests<R: MarketReader + ?Sized>(
    reader: &R,
    request_id: i64,
    max_depth: usize,
) -> Result<Vec<i64>, MarketError> {
    let mut chain = Vec::new();
    let mut current = Some(request_id);

    while let Some(id) = current {
        if chain.len() > max_depth || chain.contains(&id) {
            tracing::error!(request_id, depth = chain.len(), "Upstream resale chain does not terminate");
            return Err(MarketError::ChainCorrupted {
                request_id,
                depth: chain.len(),
            });
        }
        let Some(request) = reader.get_request(id)? else {
            break;
        };
        chain.push(id);
        current = match request.source_offer_id {
            Some(offer_id) => reader.get_offer(offer_id)?.map(|o| o.request_id),
            None => None,
        };
    }

    Ok(chain)
}
