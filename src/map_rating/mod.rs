//! Per-map ratings
//!
//! The same family of signals as the full engine, restricted to the matches
//! of a single map and computed for one team at a time.

pub mod calculator;

pub use calculator::{MapRating, MapRatingCalculator};
