/// Active caption and highlight word selection.
pub mod captions;
/// Caption text layout and stroke-then-fill drawing.
pub mod text;
