//! Texture decoding into CPU-side RGBA8 buffers.

use std::path::Path;

/// Channels per decoded pixel.
pub const TEXTURE_CHANNELS: u32 = 4;

/// Texture data in CPU-friendly format before device upload.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl TextureData {
    /// Wrap an RGBA8 buffer, checking its size against the dimensions.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> anyhow::Result<Self> {
        let expected = width as usize * height as usize * TEXTURE_CHANNELS as usize;
        if data.len() != expected {
            anyhow::bail!(
                "RGBA8 buffer of {} bytes does not match {}x{} ({} bytes)",
                data.len(),
                width,
                height,
                expected
            );
        }
        Ok(Self { data, width, height })
    }

    /// Decode an image file, converting whatever it holds to RGBA8.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let img = image::open(path)
            .map_err(|e| anyhow::anyhow!("Failed to open image {:?}: {}", path, e))?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let data = rgba.into_raw();

        log::info!("Loaded texture {}x{} with {} bytes", width, height, data.len());

        Self::from_rgba8(width, height, data)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}
