use std::sync::Arc;
use uuid::Uuid;
use crate::core::error::{ExchangeError, ExchangeResult};
use crate::core::lifecycle::MatchLifecycle;
use crate::models::ExchangeRequest;
use crate::services::ExchangeStore;

/// Discovers reciprocal candidates for a request and records them as matches
///
/// # Pipeline Stages
/// 1. Load the caller's request
/// 2. Ask the store for active reciprocal candidates
/// 3. Create (or re-find) a pending match per candidate
#[derive(Clone)]
pub struct MatchFinder {
    store: Arc<dyn ExchangeStore>,
    lifecycle: MatchLifecycle,
}

impl MatchFinder {
    pub fn new(store: Arc<dyn ExchangeStore>, lifecycle: MatchLifecycle) -> Self {
        Self { store, lifecycle }
    }

    /// Find the active requests that reciprocally satisfy `request_id`
    ///
    /// Candidates are returned whether or not their match already existed.
    /// A request that is no longer active gets its candidates listed but
    /// no new matches.
    pub async fn find_matching_requests(
        &self,
        request_id: Uuid,
        user_id: &str,
    ) -> ExchangeResult<Vec<ExchangeRequest>> {
        let request = match self.store.get_request(request_id).await? {
            Some(request) if request.user_id == user_id => request,
            _ => return Err(ExchangeError::request_not_found(request_id)),
        };

        let candidates = self.store.list_active_reciprocal_candidates(&request).await?;

        tracing::debug!(
            "Found {} reciprocal candidates for request {}",
            candidates.len(),
            request_id
        );

        if !request.is_active() {
            return Ok(candidates);
        }

        for candidate in &candidates {
            self.lifecycle.create_match(&request, candidate).await?;
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::distance::RadiusUnit;
    use crate::models::{ExchangeRequestStatus, MatchStatus};
    use crate::services::InMemoryStore;

    fn create_request(user: &str, desired: &str, offered: &[&str], lat: f64, lon: f64) -> ExchangeRequest {
        let offered: Vec<String> = offered.iter().map(|s| s.to_string()).collect();
        ExchangeRequest::new(user, format!("{}@example.com", user), desired, &offered, lat, lon)
    }

    async fn setup(requests: &[&ExchangeRequest]) -> (Arc<InMemoryStore>, MatchFinder) {
        let store = Arc::new(InMemoryStore::new());
        for request in requests {
            store.create_request(request).await.unwrap();
        }
        let lifecycle = MatchLifecycle::new(store.clone(), RadiusUnit::Kilometers);
        let finder = MatchFinder::new(store.clone(), lifecycle);
        (store, finder)
    }

    #[tokio::test]
    async fn test_finds_reciprocal_and_creates_match() {
        let x = create_request("u1", "A", &["B"], 52.2297, 21.0122); // Warsaw
        let y = create_request("u2", "B", &["A"], 50.0647, 19.9450); // Krakow
        let (store, finder) = setup(&[&x, &y]).await;

        let found = finder.find_matching_requests(x.id, "u1").await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, y.id);

        let m = store.get_match_for_pair(x.id, y.id).await.unwrap().unwrap();
        assert_eq!(m.exchange_request_id, x.id);
        assert_eq!(m.status, MatchStatus::Pending);
        assert!(m.distance > 200.0 && m.distance < 300.0, "Expected ~250km, got {}", m.distance);
    }

    #[tokio::test]
    async fn test_skips_non_reciprocal_and_own_requests() {
        let x = create_request("u1", "A", &["B"], 0.0, 0.0);
        let own = create_request("u1", "B", &["A"], 0.0, 0.0);
        let one_sided = create_request("u3", "B", &["C"], 0.0, 0.0);
        let (store, finder) = setup(&[&x, &own, &one_sided]).await;

        let found = finder.find_matching_requests(x.id, "u1").await.unwrap();

        assert!(found.is_empty());
        assert_eq!(store.match_count().await, 0);
    }

    #[tokio::test]
    async fn test_foreign_request_is_not_found() {
        let x = create_request("u1", "A", &["B"], 0.0, 0.0);
        let (_, finder) = setup(&[&x]).await;

        let err = finder.find_matching_requests(x.id, "intruder").await.unwrap_err();
        assert!(matches!(err, ExchangeError::NotFound(_)));

        let err = finder.find_matching_requests(Uuid::new_v4(), "u1").await.unwrap_err();
        assert!(matches!(err, ExchangeError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_completed_request_lists_without_matching() {
        let mut x = create_request("u1", "A", &["B"], 0.0, 0.0);
        x.status = ExchangeRequestStatus::Completed;
        let y = create_request("u2", "B", &["A"], 0.0, 0.0);
        let (store, finder) = setup(&[&x, &y]).await;

        let found = finder.find_matching_requests(x.id, "u1").await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(store.match_count().await, 0);
    }

    #[tokio::test]
    async fn test_repeat_find_is_idempotent() {
        let x = create_request("u1", "A", &["B"], 0.0, 0.0);
        let y = create_request("u2", "B", &["A"], 0.0, 0.0);
        let z = create_request("u3", "B", &["A", "C"], 1.0, 1.0);
        let (store, finder) = setup(&[&x, &y, &z]).await;

        assert_eq!(finder.find_matching_requests(x.id, "u1").await.unwrap().len(), 2);
        assert_eq!(finder.find_matching_requests(x.id, "u1").await.unwrap().len(), 2);
        // From the other end the pair is already matched
        assert_eq!(finder.find_matching_requests(y.id, "u2").await.unwrap().len(), 1);

        assert_eq!(store.match_count().await, 2);
    }
}
