//! Multi-predicate search over the media index.

mod color;
mod details;
mod engine;
mod rules;

pub use color::matches_color;
pub use details::{DateRange, DimensionBounds, OrderBy, QueryDetails};
pub use engine::Query;
pub use rules::{Polarity, PrefixRules};
