/// Timeline construction and validation.
pub mod build;
/// Segment lookup, transition windows and the global fade envelope.
pub mod lookup;
/// Timeline data types.
pub mod model;
