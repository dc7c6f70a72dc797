use std::sync::Arc;
use uuid::Uuid;
use crate::core::error::{ExchangeError, ExchangeResult};
use crate::models::{ExchangeRequest, ExchangeRequestStatus};
use crate::services::ExchangeStore;

/// Validates, creates, reads and deletes exchange requests
#[derive(Clone)]
pub struct RequestLifecycle {
    store: Arc<dyn ExchangeStore>,
}

impl RequestLifecycle {
    pub fn new(store: Arc<dyn ExchangeStore>) -> Self {
        Self { store }
    }

    /// Validate and persist a new active request
    ///
    /// Returns the request as re-read from the store.
    pub async fn create(
        &self,
        user_id: &str,
        user_email: &str,
        desired_book_id: &str,
        offered_book_ids: &[String],
        latitude: f64,
        longitude: f64,
    ) -> ExchangeResult<ExchangeRequest> {
        let request = ExchangeRequest::new(
            user_id,
            user_email,
            desired_book_id,
            offered_book_ids,
            latitude,
            longitude,
        );
        request.validate()?;

        let id = self.store.create_request(&request).await?;

        tracing::info!(
            "Created exchange request {} for user {} (wants {}, offers {} books)",
            id,
            user_id,
            desired_book_id,
            offered_book_ids.len()
        );

        self.store
            .get_request(id)
            .await?
            .ok_or_else(|| ExchangeError::request_not_found(id))
    }

    /// A request owned by `user_id`; foreign requests read as not found
    pub async fn get(&self, id: Uuid, user_id: &str) -> ExchangeResult<ExchangeRequest> {
        match self.store.get_request(id).await? {
            Some(request) if request.user_id == user_id => Ok(request),
            _ => Err(ExchangeError::request_not_found(id)),
        }
    }

    pub async fn list(
        &self,
        user_id: &str,
        status: Option<ExchangeRequestStatus>,
    ) -> ExchangeResult<Vec<ExchangeRequest>> {
        Ok(self.store.list_requests(user_id, status).await?)
    }

    /// Delete a request, its offered books and every match referencing it
    ///
    /// Completed requests are kept as history. Match cleanup only runs
    /// once the request delete itself has succeeded.
    pub async fn delete(&self, id: Uuid) -> ExchangeResult<()> {
        let request = self
            .store
            .get_request(id)
            .await?
            .ok_or_else(|| ExchangeError::request_not_found(id))?;

        if request.status == ExchangeRequestStatus::Completed {
            return Err(ExchangeError::Conflict("exchange already completed".to_string()));
        }

        self.store.delete_request(id).await?;
        let removed = self.store.delete_matches_for_request(id).await?;

        tracing::info!("Deleted exchange request {} and {} matches", id, removed);

        Ok(())
    }
}
