use std::sync::Arc;
use uuid::Uuid;
use crate::core::distance::{haversine_distance, RadiusUnit};
use crate::core::error::{ExchangeError, ExchangeResult};
use crate::core::filters::within_distance;
use crate::models::{
    ExchangeMatch, ExchangeRequest, MatchDecision, MatchStatus, ValidationError,
};
use crate::services::{DecisionOutcome, ExchangeStore, StoreError};

/// Creates matches and drives the bilateral accept/decline protocol
///
/// # States
/// `Pending -> Accepted | Declined`, both terminal. A decline by either
/// side ends the match at once; both sides must accept to finalize it,
/// which marks both requests completed. Only Active requests may accept.
#[derive(Clone)]
pub struct MatchLifecycle {
    store: Arc<dyn ExchangeStore>,
    unit: RadiusUnit,
}

impl MatchLifecycle {
    pub fn new(store: Arc<dyn ExchangeStore>, unit: RadiusUnit) -> Self {
        Self { store, unit }
    }

    /// Create a pending match for the pair, or return the existing one
    ///
    /// An existing match is returned untouched whatever its status. A
    /// concurrent insert of the same pair is resolved by re-reading the
    /// winner's row.
    pub async fn create_match(
        &self,
        request: &ExchangeRequest,
        other: &ExchangeRequest,
    ) -> ExchangeResult<ExchangeMatch> {
        if request.id == other.id {
            return Err(ValidationError::SameRequest(request.id).into());
        }

        if let Some(existing) = self.store.get_match_for_pair(request.id, other.id).await? {
            tracing::debug!("Match {} already exists for {} and {}", existing.id, request.id, other.id);
            return Ok(existing);
        }

        let distance = haversine_distance(request.coordinate(), other.coordinate(), self.unit);
        let exchange_match = ExchangeMatch::new(request.id, other.id, distance);

        match self.store.create_match(&exchange_match).await {
            Ok(()) => {
                tracing::info!(
                    "Created match {} between {} and {} ({:.2} {:?})",
                    exchange_match.id,
                    request.id,
                    other.id,
                    distance,
                    self.unit
                );
                Ok(exchange_match)
            }
            Err(StoreError::DuplicateMatch(_, _)) => {
                tracing::debug!("Lost match insert race for {} and {}", request.id, other.id);
                self.store
                    .get_match_for_pair(request.id, other.id)
                    .await?
                    .ok_or_else(|| {
                        ExchangeError::NotFound(format!("match for {} and {}", request.id, other.id))
                    })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn accept_match(&self, match_id: Uuid, request_id: Uuid) -> ExchangeResult<ExchangeMatch> {
        self.decide(match_id, request_id, MatchDecision::Accepted).await
    }

    pub async fn decline_match(&self, match_id: Uuid, request_id: Uuid) -> ExchangeResult<ExchangeMatch> {
        self.decide(match_id, request_id, MatchDecision::Declined).await
    }

    async fn decide(
        &self,
        match_id: Uuid,
        request_id: Uuid,
        decision: MatchDecision,
    ) -> ExchangeResult<ExchangeMatch> {
        let exchange_match = self.get_match(match_id).await?;

        // A request on neither side has no say in this match
        let side = exchange_match.side_of(request_id).ok_or_else(|| {
            ExchangeError::NotFound(format!("request {} in exchange match {}", request_id, match_id))
        })?;

        let outcome = self
            .store
            .apply_match_decision(match_id, side, decision)
            .await?
            .ok_or_else(|| ExchangeError::match_not_found(match_id))?;

        let updated = match outcome {
            DecisionOutcome::Applied(updated) => updated,
            DecisionOutcome::Finalized(current) => {
                tracing::warn!(
                    "Ignoring {:?} from {} on match {}: already {:?}",
                    decision,
                    request_id,
                    match_id,
                    current.status
                );
                return Err(ExchangeError::Conflict(format!(
                    "match already finalized as {:?}",
                    current.status
                )));
            }
            DecisionOutcome::RequestInactive { request_id: inactive, .. } => {
                tracing::warn!(
                    "Refusing accept from {} on match {}: request {} is no longer active",
                    request_id,
                    match_id,
                    inactive
                );
                return Err(ExchangeError::Conflict(format!(
                    "exchange request {} is no longer active",
                    inactive
                )));
            }
        };

        tracing::info!(
            "Request {} {:?} match {} (status {:?})",
            request_id,
            decision,
            match_id,
            updated.status
        );

        if updated.status == MatchStatus::Accepted {
            tracing::info!(
                "Finalized match {}: requests {} and {} completed",
                updated.id,
                updated.exchange_request_id,
                updated.matched_exchange_request_id
            );
        }

        Ok(updated)
    }

    pub async fn get_match(&self, match_id: Uuid) -> ExchangeResult<ExchangeMatch> {
        self.store
            .get_match(match_id)
            .await?
            .ok_or_else(|| ExchangeError::match_not_found(match_id))
    }

    pub async fn get_matches(&self, request_id: Uuid) -> ExchangeResult<Vec<ExchangeMatch>> {
        Ok(self.store.list_matches_for_request(request_id).await?)
    }

    /// Matches of a request no farther than `threshold`, insertion order
    pub async fn get_matches_distance_filtered(
        &self,
        request_id: Uuid,
        threshold: f64,
    ) -> ExchangeResult<Vec<ExchangeMatch>> {
        let matches = self.store.list_matches_for_request(request_id).await?;
        Ok(within_distance(matches, threshold))
    }

    /// The request on the other side of the match from `request_id`
    pub async fn matched_request(
        &self,
        exchange_match: &ExchangeMatch,
        request_id: Uuid,
    ) -> ExchangeResult<ExchangeRequest> {
        let counterpart = exchange_match.counterpart_id(request_id).ok_or_else(|| {
            ExchangeError::NotFound(format!(
                "request {} in exchange match {}",
                request_id, exchange_match.id
            ))
        })?;

        self.store
            .get_request(counterpart)
            .await?
            .ok_or_else(|| ExchangeError::request_not_found(counterpart))
    }
}
