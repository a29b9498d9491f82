/// Image decoding into premultiplied RGBA8.
pub mod decode;
/// Concurrent asset loading ahead of priming.
pub(crate) mod loader;
/// `ffprobe`/`ffmpeg` backed media probing and decoding.
pub mod media;
/// Source reference resolution.
pub mod resolve;
