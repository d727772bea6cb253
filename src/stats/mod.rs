mod errors;
pub mod handlers;
pub mod models;
pub mod normalizer;
pub mod parsing;
pub mod rating;
pub mod service;
pub mod types;

pub use errors::StatsError;
pub use models::*;
pub use normalizer::StatsNormalizer;
pub use rating::{rating, RatingInput};
pub use service::{StatsService, StatsServiceBuilder};
