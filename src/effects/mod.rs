/// Premultiplied RGBA8 pixel and buffer compositing.
pub mod composite;
/// Boundary transitions between two segment layers.
pub mod transitions;
