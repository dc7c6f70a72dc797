use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Invariant violations detected when building an exchange request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("No offered books provided")]
    NoOfferedBooks,

    #[error("No desired book provided")]
    NoDesiredBook,

    #[error("Latitude out of range [-90, 90]: {0}")]
    LatitudeOutOfRange(f64),

    #[error("Longitude out of range [-180, 180]: {0}")]
    LongitudeOutOfRange(f64),

    #[error("A request cannot be matched with itself: {0}")]
    SameRequest(Uuid),
}

/// Plain latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Lifecycle state of an exchange request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "exchange_request_status", rename_all = "lowercase")]
pub enum ExchangeRequestStatus {
    Active,
    Completed,
    Declined,
}

impl ExchangeRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeRequestStatus::Active => "active",
            ExchangeRequestStatus::Completed => "completed",
            ExchangeRequestStatus::Declined => "declined",
        }
    }
}

impl fmt::Display for ExchangeRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ExchangeRequestStatus::Active),
            "completed" => Ok(ExchangeRequestStatus::Completed),
            "declined" | "cancelled" => Ok(ExchangeRequestStatus::Declined),
            other => Err(format!("unknown exchange request status: {}", other)),
        }
    }
}

/// A book offered in return, owned by exactly one exchange request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferedBook {
    pub id: Uuid,
    #[serde(rename = "exchangeRequestId")]
    pub exchange_request_id: Uuid,
    #[serde(rename = "bookId")]
    pub book_id: String,
}

/// A user's listing of one desired book and the books offered for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRequest {
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userEmail")]
    pub user_email: String,
    #[serde(rename = "desiredBookId")]
    pub desired_book_id: String,
    #[serde(rename = "offeredBooks")]
    pub offered_books: Vec<OfferedBook>,
    pub latitude: f64,
    pub longitude: f64,
    pub status: ExchangeRequestStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl ExchangeRequest {
    /// Build an active request with fresh identities. Does not validate.
    pub fn new(
        user_id: impl Into<String>,
        user_email: impl Into<String>,
        desired_book_id: impl Into<String>,
        offered_book_ids: &[String],
        latitude: f64,
        longitude: f64,
    ) -> Self {
        let id = Uuid::new_v4();
        let offered_books = offered_book_ids
            .iter()
            .map(|book_id| OfferedBook {
                id: Uuid::new_v4(),
                exchange_request_id: id,
                book_id: book_id.clone(),
            })
            .collect();

        Self {
            id,
            user_id: user_id.into(),
            user_email: user_email.into(),
            desired_book_id: desired_book_id.into(),
            offered_books,
            latitude,
            longitude,
            status: ExchangeRequestStatus::Active,
            created_at: Utc::now(),
        }
    }

    /// Check the request invariants, reporting the first one violated.
    ///
    /// Order: offered books, desired book, latitude, longitude.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.offered_books.is_empty() {
            return Err(ValidationError::NoOfferedBooks);
        }
        if self.desired_book_id.trim().is_empty() {
            return Err(ValidationError::NoDesiredBook);
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::LatitudeOutOfRange(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::LongitudeOutOfRange(self.longitude));
        }
        Ok(())
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn offered_book_ids(&self) -> Vec<String> {
        self.offered_books.iter().map(|b| b.book_id.clone()).collect()
    }

    pub fn offers(&self, book_id: &str) -> bool {
        self.offered_books.iter().any(|b| b.book_id == book_id)
    }

    pub fn is_active(&self) -> bool {
        self.status == ExchangeRequestStatus::Active
    }
}

/// Aggregate state of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "match_status", rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Accepted,
    Declined,
}

impl MatchStatus {
    /// Derive the aggregate status from both sides' decisions.
    ///
    /// A decline on either side wins; both sides must accept for the
    /// match to be accepted.
    pub fn derive(initiator: MatchDecision, responder: MatchDecision) -> Self {
        match (initiator, responder) {
            (MatchDecision::Declined, _) | (_, MatchDecision::Declined) => MatchStatus::Declined,
            (MatchDecision::Accepted, MatchDecision::Accepted) => MatchStatus::Accepted,
            _ => MatchStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, MatchStatus::Pending)
    }
}

/// One side's answer to a proposed match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "match_decision", rename_all = "lowercase")]
pub enum MatchDecision {
    Pending,
    Accepted,
    Declined,
}

/// Which side of a match a request occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSide {
    /// The request the match was discovered for
    Initiator,
    /// The reciprocal candidate that was found
    Responder,
}

/// A proposed two-party trade between two exchange requests
///
/// Holds the request ids only; the requests themselves are looked up
/// through the store when needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeMatch {
    pub id: Uuid,
    #[serde(rename = "exchangeRequestId")]
    pub exchange_request_id: Uuid,
    #[serde(rename = "matchedExchangeRequestId")]
    pub matched_exchange_request_id: Uuid,
    #[serde(rename = "initiatorDecision")]
    pub initiator_decision: MatchDecision,
    #[serde(rename = "responderDecision")]
    pub responder_decision: MatchDecision,
    pub status: MatchStatus,
    pub distance: f64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl ExchangeMatch {
    /// New pending match between two requests
    pub fn new(exchange_request_id: Uuid, matched_exchange_request_id: Uuid, distance: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            exchange_request_id,
            matched_exchange_request_id,
            initiator_decision: MatchDecision::Pending,
            responder_decision: MatchDecision::Pending,
            status: MatchStatus::Pending,
            distance,
            created_at: Utc::now(),
        }
    }

    /// The unordered pair as (min, max); unique across all matches.
    pub fn pair_key(&self) -> (Uuid, Uuid) {
        canonical_pair(self.exchange_request_id, self.matched_exchange_request_id)
    }

    pub fn side_of(&self, request_id: Uuid) -> Option<MatchSide> {
        if request_id == self.exchange_request_id {
            Some(MatchSide::Initiator)
        } else if request_id == self.matched_exchange_request_id {
            Some(MatchSide::Responder)
        } else {
            None
        }
    }

    pub fn involves(&self, request_id: Uuid) -> bool {
        self.side_of(request_id).is_some()
    }

    /// Id of the request on the other side from `request_id`
    pub fn counterpart_id(&self, request_id: Uuid) -> Option<Uuid> {
        match self.side_of(request_id)? {
            MatchSide::Initiator => Some(self.matched_exchange_request_id),
            MatchSide::Responder => Some(self.exchange_request_id),
        }
    }

    pub fn decision_of(&self, request_id: Uuid) -> Option<MatchDecision> {
        match self.side_of(request_id)? {
            MatchSide::Initiator => Some(self.initiator_decision),
            MatchSide::Responder => Some(self.responder_decision),
        }
    }

    /// Record a side's decision and re-derive the aggregate status.
    ///
    /// Returns `false` and leaves the match untouched once it is terminal.
    pub fn apply_decision(&mut self, side: MatchSide, decision: MatchDecision) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        match side {
            MatchSide::Initiator => self.initiator_decision = decision,
            MatchSide::Responder => self.responder_decision = decision,
        }
        self.status = MatchStatus::derive(self.initiator_decision, self.responder_decision);
        true
    }
}

/// Order two request ids so an unordered pair has one representation
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
