/// Caller-facing composition configuration.
pub mod config;
/// Project files bundling config, timeline input and audio references.
pub mod project;
