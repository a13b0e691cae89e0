//! Domain modules organized as vertical slices.
//!
//! - `market`: per-market precision and the inputs it configures
//! - `order`: order form draft and its chain amounts

pub mod market;
pub mod order;
