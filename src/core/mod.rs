// Core algorithm exports
pub mod distance;
pub mod engine;
pub mod error;
pub mod filters;
pub mod lifecycle;
pub mod matcher;
pub mod requests;

pub use distance::{haversine_distance, RadiusUnit};
pub use engine::ExchangeEngine;
pub use error::{ExchangeError, ExchangeResult};
pub use filters::{is_reciprocal_match, within_distance};
pub use lifecycle::MatchLifecycle;
pub use matcher::MatchFinder;
pub use requests::RequestLifecycle;
