//! Ratings adapters. Implement RatingsPort.
//!
//! HTTP adapter for the ratings backend and a mock for unconfigured setups.

pub mod http_ratings;
pub mod mock_ratings;

pub use http_ratings::HttpRatingsAdapter;
pub use mock_ratings::MockRatingsAdapter;
