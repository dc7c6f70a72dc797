// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    canonical_pair, Coordinate, ExchangeMatch, ExchangeRequest, ExchangeRequestStatus, MatchDecision,
    MatchSide, MatchStatus, OfferedBook, ValidationError,
};
pub use requests::{
    CounterpartQuery, CreateExchangeRequest, FindMatchesRequest, MatchDecisionRequest, MatchesQuery, UserQuery,
};
pub use responses::{ErrorResponse, FindMatchesResponse, HealthResponse, MatchesResponse};
