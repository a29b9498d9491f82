use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{ReelError, ReelResult};

/// One composited output frame: fully opaque RGBA8, row-major, tightly packed.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 4` bytes; alpha is always 255.
    pub data: Vec<u8>,
    /// Output time this frame represents.
    pub timestamp_sec: f64,
}

impl RenderFrame {
    /// RGBA of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Whether every pixel has alpha 255.
    pub fn is_opaque(&self) -> bool {
        self.data.chunks_exact(4).all(|px| px[3] == 255)
    }

    /// Stable 64-bit digest of the pixel data.
    pub fn digest(&self) -> u64 {
        xxhash_rust::xxh3::xxh3_64(&self.data)
    }

    /// Write the frame as a PNG file, creating parent directories.
    pub fn write_png(&self, path: &Path) -> ReelResult<()> {
        crate::encode::ffmpeg::ensure_parent_dir(path)?;
        let img = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| ReelError::evaluation("frame buffer does not match its dimensions"))?;
        img.save(path)
            .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}
