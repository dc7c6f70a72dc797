use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Request to create an exchange request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateExchangeRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    #[serde(alias = "user_email", rename = "userEmail")]
    pub user_email: String,
    #[serde(default)]
    #[serde(alias = "desired_book_id", rename = "desiredBookId")]
    pub desired_book_id: String,
    #[serde(default)]
    #[serde(alias = "offered_book_ids", rename = "offeredBookIds")]
    pub offered_book_ids: Vec<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Request to run reciprocal matching for one of the caller's requests
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FindMatchesRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
}

/// Accept or decline a match on behalf of one of its requests
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MatchDecisionRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[serde(alias = "request_id", rename = "requestId")]
    pub request_id: Uuid,
}

/// Query identifying the calling user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UserQuery {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Query for listing matches of a request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchesQuery {
    #[serde(default)]
    #[serde(alias = "max_distance", rename = "maxDistance")]
    pub max_distance: Option<f64>,
}

/// Query naming the side a counterpart is requested for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterpartQuery {
    #[serde(alias = "request_id", rename = "requestId")]
    pub request_id: Uuid,
}
