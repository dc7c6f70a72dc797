use std::sync::Arc;
use uuid::Uuid;
use crate::core::distance::RadiusUnit;
use crate::core::error::ExchangeResult;
use crate::core::lifecycle::MatchLifecycle;
use crate::core::matcher::MatchFinder;
use crate::core::requests::RequestLifecycle;
use crate::models::{ExchangeMatch, ExchangeRequest, ExchangeRequestStatus};
use crate::services::ExchangeStore;

/// Entry point for callers: the three components over one shared store
#[derive(Clone)]
pub struct ExchangeEngine {
    store: Arc<dyn ExchangeStore>,
    requests: RequestLifecycle,
    finder: MatchFinder,
    lifecycle: MatchLifecycle,
}

impl ExchangeEngine {
    pub fn new(store: Arc<dyn ExchangeStore>, unit: RadiusUnit) -> Self {
        let lifecycle = MatchLifecycle::new(store.clone(), unit);
        Self {
            requests: RequestLifecycle::new(store.clone()),
            finder: MatchFinder::new(store.clone(), lifecycle.clone()),
            lifecycle,
            store,
        }
    }

    /// Whether the storage backend answers
    pub async fn health_check(&self) -> bool {
        match self.store.health_check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Store health check failed: {}", e);
                false
            }
        }
    }

    pub async fn create_exchange_request(
        &self,
        user_id: &str,
        user_email: &str,
        desired_book_id: &str,
        offered_book_ids: &[String],
        latitude: f64,
        longitude: f64,
    ) -> ExchangeResult<ExchangeRequest> {
        self.requests
            .create(user_id, user_email, desired_book_id, offered_book_ids, latitude, longitude)
            .await
    }

    pub async fn get_exchange_request(&self, id: Uuid, user_id: &str) -> ExchangeResult<ExchangeRequest> {
        self.requests.get(id, user_id).await
    }

    pub async fn list_exchange_requests(
        &self,
        user_id: &str,
        status: Option<ExchangeRequestStatus>,
    ) -> ExchangeResult<Vec<ExchangeRequest>> {
        self.requests.list(user_id, status).await
    }

    pub async fn delete_exchange_request(&self, id: Uuid) -> ExchangeResult<()> {
        self.requests.delete(id).await
    }

    pub async fn find_matching_requests(
        &self,
        request_id: Uuid,
        user_id: &str,
    ) -> ExchangeResult<Vec<ExchangeRequest>> {
        self.finder.find_matching_requests(request_id, user_id).await
    }

    pub async fn create_match(
        &self,
        request: &ExchangeRequest,
        other: &ExchangeRequest,
    ) -> ExchangeResult<ExchangeMatch> {
        self.lifecycle.create_match(request, other).await
    }

    pub async fn accept_match(&self, match_id: Uuid, request_id: Uuid) -> ExchangeResult<ExchangeMatch> {
        self.lifecycle.accept_match(match_id, request_id).await
    }

    pub async fn decline_match(&self, match_id: Uuid, request_id: Uuid) -> ExchangeResult<ExchangeMatch> {
        self.lifecycle.decline_match(match_id, request_id).await
    }

    pub async fn get_match(&self, match_id: Uuid) -> ExchangeResult<ExchangeMatch> {
        self.lifecycle.get_match(match_id).await
    }

    pub async fn get_matches(&self, request_id: Uuid) -> ExchangeResult<Vec<ExchangeMatch>> {
        self.lifecycle.get_matches(request_id).await
    }

    pub async fn get_matches_distance_filtered(
        &self,
        request_id: Uuid,
        threshold: f64,
    ) -> ExchangeResult<Vec<ExchangeMatch>> {
        self.lifecycle.get_matches_distance_filtered(request_id, threshold).await
    }

    pub async fn matched_request(
        &self,
        exchange_match: &ExchangeMatch,
        request_id: Uuid,
    ) -> ExchangeResult<ExchangeRequest> {
        self.lifecycle.matched_request(exchange_match, request_id).await
    }
}
