//! Book Exchange - reciprocal matching engine for book trades
//!
//! Users list one book they want and the books they would give for it.
//! The engine finds other users whose wants and offers complement theirs,
//! scores each pair by distance, and runs the two-party accept/decline
//! protocol that completes or cancels the trade.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use self::core::{haversine_distance, ExchangeEngine, ExchangeError, RadiusUnit};
pub use models::{Coordinate, ExchangeMatch, ExchangeRequest, ExchangeRequestStatus, MatchDecision, MatchStatus};
pub use services::{ExchangeStore, InMemoryStore, PostgresStore};
