pub mod profile;
pub mod rating;

pub use rating::{capped_rating, Assessment, RatingEngine};
