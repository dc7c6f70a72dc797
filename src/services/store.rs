//! Storage contract for exchange requests and matches

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;
use crate::models::{ExchangeMatch, ExchangeRequest, ExchangeRequestStatus, MatchDecision, MatchSide};

/// Errors that can occur when talking to a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Match already exists for requests {0} and {1}")]
    DuplicateMatch(Uuid, Uuid),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Outcome of an atomic decision update
#[derive(Debug, Clone)]
pub enum DecisionOutcome {
    /// The decision was recorded; if the match became Accepted both of
    /// its requests were completed in the same step
    Applied(ExchangeMatch),
    /// The match was already Accepted or Declined; nothing changed
    Finalized(ExchangeMatch),
    /// An accept was refused because this request is missing or no
    /// longer active; nothing changed
    RequestInactive {
        exchange_match: ExchangeMatch,
        request_id: Uuid,
    },
}

/// ExchangeStore trait - durable storage for requests, offered books and matches
///
/// Implementations must keep at most one match per unordered request pair
/// and apply decisions as a single read-modify-write per call.
#[async_trait]
pub trait ExchangeStore: Send + Sync {
    /// Persist a request together with its offered books
    async fn create_request(&self, request: &ExchangeRequest) -> StoreResult<Uuid>;

    async fn get_request(&self, id: Uuid) -> StoreResult<Option<ExchangeRequest>>;

    /// A user's requests, oldest first, optionally limited to one status
    async fn list_requests(
        &self,
        user_id: &str,
        status: Option<ExchangeRequestStatus>,
    ) -> StoreResult<Vec<ExchangeRequest>>;

    /// Persist the mutable fields of a request (its status)
    ///
    /// Match finalization does not go through here; see
    /// [`ExchangeStore::apply_match_decision`].
    async fn update_request(&self, request: &ExchangeRequest) -> StoreResult<()>;

    /// Delete a request and its offered books
    async fn delete_request(&self, id: Uuid) -> StoreResult<()>;

    /// Active requests that reciprocally match `request`
    ///
    /// Must agree with [`crate::core::filters::is_reciprocal_match`].
    async fn list_active_reciprocal_candidates(
        &self,
        request: &ExchangeRequest,
    ) -> StoreResult<Vec<ExchangeRequest>>;

    /// Insert a match, failing with [`StoreError::DuplicateMatch`] if the
    /// unordered pair already has one
    async fn create_match(&self, exchange_match: &ExchangeMatch) -> StoreResult<()>;

    async fn get_match(&self, id: Uuid) -> StoreResult<Option<ExchangeMatch>>;

    /// The match for an unordered pair of request ids, if any
    async fn get_match_for_pair(&self, a: Uuid, b: Uuid) -> StoreResult<Option<ExchangeMatch>>;

    /// Record one side's decision and re-derive the status atomically
    ///
    /// In one step: refuse terminal matches, refuse an accept while either
    /// request is not Active, record the decision and, when the match
    /// becomes Accepted, mark both requests Completed. Returns `None` if
    /// the match does not exist.
    async fn apply_match_decision(
        &self,
        match_id: Uuid,
        side: MatchSide,
        decision: MatchDecision,
    ) -> StoreResult<Option<DecisionOutcome>>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> StoreResult<()>;

    /// Every match referencing the request, insertion order
    async fn list_matches_for_request(&self, request_id: Uuid) -> StoreResult<Vec<ExchangeMatch>>;

    /// Remove every match referencing the request, returning how many went
    async fn delete_matches_for_request(&self, request_id: Uuid) -> StoreResult<u64>;
}
