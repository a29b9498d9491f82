/// Per-tick mixing of the configured audio sources.
pub mod mix;
/// Audio track descriptions.
pub mod source;
