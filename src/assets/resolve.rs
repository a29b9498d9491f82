use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::assets::media::{self, AudioPcm, VideoSourceInfo};
use crate::foundation::error::{ReelError, ReelResult};

/// Turns resolver-specific source strings into bytes, local paths and decoded audio.
///
/// The pipeline itself performs no network IO; a resolver that fetches remote references is the
/// caller's concern. Implementations are shared across loader threads.
pub trait AssetResolver: Send + Sync {
    /// Read the encoded bytes of `source`.
    fn read_bytes(&self, source: &str) -> ReelResult<Vec<u8>>;

    /// A local filesystem path for `source`, used by `ffmpeg`-based probing and decoding.
    fn local_path(&self, source: &str) -> ReelResult<PathBuf>;

    /// Decode `source` to mix-bus interleaved `f32` PCM at `sample_rate`.
    fn decode_audio(&self, source: &str, sample_rate: u32) -> ReelResult<AudioPcm> {
        let path = self.local_path(source)?;
        media::decode_audio(&path, sample_rate)
    }

    /// Probe a video source.
    fn probe_video(&self, source: &str) -> ReelResult<VideoSourceInfo> {
        let path = self.local_path(source)?;
        media::probe_video(&path)
    }
}

/// Resolves relative paths against a root directory.
#[derive(Clone, Debug)]
pub struct FsResolver {
    root: PathBuf,
}

impl FsResolver {
    /// Resolver rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetResolver for FsResolver {
    fn read_bytes(&self, source: &str) -> ReelResult<Vec<u8>> {
        let p = self.local_path(source)?;
        let bytes =
            std::fs::read(&p).with_context(|| format!("failed to read asset '{}'", p.display()))?;
        Ok(bytes)
    }

    fn local_path(&self, source: &str) -> ReelResult<PathBuf> {
        let norm = normalize_rel_path(source)?;
        Ok(self.root.join(Path::new(&norm)))
    }
}

/// Normalize and validate root-relative asset paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> ReelResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(ReelError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(ReelError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(ReelError::validation("asset paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(ReelError::validation("asset path must contain a file name"));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/resolve.rs"]
mod tests;
