/// `ffmpeg`-backed encode sink.
pub mod ffmpeg;
/// Codec/container negotiation.
pub mod negotiate;
/// Encode sink contract and the in-memory sink.
pub mod sink;
