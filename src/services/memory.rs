//! In-memory exchange store implementation

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;
use crate::core::filters::is_reciprocal_match;
use crate::models::{
    canonical_pair, ExchangeMatch, ExchangeRequest, ExchangeRequestStatus, MatchDecision, MatchSide,
    MatchStatus,
};
use crate::services::store::{DecisionOutcome, ExchangeStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct MemoryState {
    // Vectors keep insertion order for listings
    requests: Vec<ExchangeRequest>,
    matches: Vec<ExchangeMatch>,
    pairs: HashMap<(Uuid, Uuid), Uuid>,
}

/// In-memory exchange store for testing and development
///
/// A single lock guards all collections, so every call is atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored matches
    pub async fn match_count(&self) -> usize {
        self.state.read().await.matches.len()
    }
}

#[async_trait]
impl ExchangeStore for InMemoryStore {
    async fn create_request(&self, request: &ExchangeRequest) -> StoreResult<Uuid> {
        let mut state = self.state.write().await;
        state.requests.push(request.clone());
        Ok(request.id)
    }

    async fn get_request(&self, id: Uuid) -> StoreResult<Option<ExchangeRequest>> {
        let state = self.state.read().await;
        Ok(state.requests.iter().find(|r| r.id == id).cloned())
    }

    async fn list_requests(
        &self,
        user_id: &str,
        status: Option<ExchangeRequestStatus>,
    ) -> StoreResult<Vec<ExchangeRequest>> {
        let state = self.state.read().await;
        Ok(state
            .requests
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect())
    }

    async fn update_request(&self, request: &ExchangeRequest) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let stored = state
            .requests
            .iter_mut()
            .find(|r| r.id == request.id)
            .ok_or_else(|| StoreError::NotFound(format!("exchange request {}", request.id)))?;
        stored.status = request.status;
        Ok(())
    }

    async fn delete_request(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let before = state.requests.len();
        state.requests.retain(|r| r.id != id);
        if state.requests.len() == before {
            return Err(StoreError::NotFound(format!("exchange request {}", id)));
        }
        Ok(())
    }

    async fn list_active_reciprocal_candidates(
        &self,
        request: &ExchangeRequest,
    ) -> StoreResult<Vec<ExchangeRequest>> {
        let state = self.state.read().await;
        Ok(state
            .requests
            .iter()
            .filter(|candidate| is_reciprocal_match(request, candidate))
            .cloned()
            .collect())
    }

    async fn create_match(&self, exchange_match: &ExchangeMatch) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let key = exchange_match.pair_key();
        if state.pairs.contains_key(&key) {
            return Err(StoreError::DuplicateMatch(key.0, key.1));
        }
        state.pairs.insert(key, exchange_match.id);
        state.matches.push(exchange_match.clone());
        Ok(())
    }

    async fn get_match(&self, id: Uuid) -> StoreResult<Option<ExchangeMatch>> {
        let state = self.state.read().await;
        Ok(state.matches.iter().find(|m| m.id == id).cloned())
    }

    async fn get_match_for_pair(&self, a: Uuid, b: Uuid) -> StoreResult<Option<ExchangeMatch>> {
        let state = self.state.read().await;
        let Some(id) = state.pairs.get(&canonical_pair(a, b)).copied() else {
            return Ok(None);
        };
        Ok(state.matches.iter().find(|m| m.id == id).cloned())
    }

    async fn apply_match_decision(
        &self,
        match_id: Uuid,
        side: MatchSide,
        decision: MatchDecision,
    ) -> StoreResult<Option<DecisionOutcome>> {
        let mut state = self.state.write().await;
        let Some(index) = state.matches.iter().position(|m| m.id == match_id) else {
            return Ok(None);
        };

        let current = state.matches[index].clone();
        if current.status.is_terminal() {
            return Ok(Some(DecisionOutcome::Finalized(current)));
        }

        let sides = [current.exchange_request_id, current.matched_exchange_request_id];
        if decision == MatchDecision::Accepted {
            let inactive = sides
                .into_iter()
                .find(|id| !state.requests.iter().any(|r| r.id == *id && r.is_active()));
            if let Some(request_id) = inactive {
                return Ok(Some(DecisionOutcome::RequestInactive {
                    exchange_match: current,
                    request_id,
                }));
            }
        }

        let stored = &mut state.matches[index];
        stored.apply_decision(side, decision);
        let updated = stored.clone();

        if updated.status == MatchStatus::Accepted {
            for request in state.requests.iter_mut().filter(|r| sides.contains(&r.id)) {
                request.status = ExchangeRequestStatus::Completed;
            }
        }

        Ok(Some(DecisionOutcome::Applied(updated)))
    }

    async fn list_matches_for_request(&self, request_id: Uuid) -> StoreResult<Vec<ExchangeMatch>> {
        let state = self.state.read().await;
        Ok(state
            .matches
            .iter()
            .filter(|m| m.involves(request_id))
            .cloned()
            .collect())
    }

    async fn delete_matches_for_request(&self, request_id: Uuid) -> StoreResult<u64> {
        let mut state = self.state.write().await;
        let before = state.matches.len();
        state.matches.retain(|m| !m.involves(request_id));
        state.pairs.retain(|(a, b), _| *a != request_id && *b != request_id);
        Ok((before - state.matches.len()) as u64)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
