use std::path::Path;

use anyhow::Context as _;

use crate::error::{FixtureError, FixtureResult};

/// A validated, row-major RGBA8 pixel buffer (`data.len() == w * h * 4`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn save_png(&self, path: &Path) -> FixtureResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        image::save_buffer_with_format(
            path,
            &self.data,
            self.width,
            self.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    }
}

/// Decodes the renderer's raw framebuffer into a [`PixelBuffer`].
///
/// The renderer posts pixels in ARGB byte order; downstream PNG encoding
/// wants RGBA, so every 4-byte group is rotated alpha-last. The transform
/// is a pure byte permutation: output length equals input length.
pub fn decode_argb(raw: &[u8], width: u32, height: u32) -> FixtureResult<PixelBuffer> {
    let expected = u64::from(width) * u64::from(height) * 4;
    if raw.len() as u64 != expected {
        return Err(FixtureError::InvalidBody {
            expected,
            actual: raw.len() as u64,
        });
    }

    let mut data = vec![0u8; raw.len()];
    for (dst, src) in data.chunks_exact_mut(4).zip(raw.chunks_exact(4)) {
        dst[0] = src[1];
        dst[1] = src[2];
        dst[2] = src[3];
        dst[3] = src[0];
    }

    Ok(PixelBuffer {
        width,
        height,
        data,
    })
}
