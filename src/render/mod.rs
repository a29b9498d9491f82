/// Per-timestamp frame composition.
pub mod compositor;
/// Output frame type.
pub mod frame;
/// Segment layer placement and painting.
pub mod layer;
