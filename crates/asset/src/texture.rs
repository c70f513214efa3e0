//! Texture loading: 8-bit RGB/RGBA images decoded for upload.

use std::path::Path;

use anyhow::{Context, Result, bail};
use image::DynamicImage;

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Rgb8,
    Rgba8,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::Rgb8 => 3,
            TextureFormat::Rgba8 => 4,
        }
    }
}

impl TextureData {
    /// Wrap raw pixel data, checking its length against the format.
    pub fn new(width: u32, height: u32, format: TextureFormat, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel() as usize;
        if data.len() != expected {
            bail!(
                "{}x{} {:?} texture needs {} bytes, got {}",
                width,
                height,
                format,
                expected,
                data.len()
            );
        }
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    /// Decode an image file. Only 8-bit RGB and RGBA pixels are accepted.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let img = image::open(path).with_context(|| format!("can't load image {:?}", path))?;
        let texture = Self::from_image(img).with_context(|| format!("{:?}", path))?;

        log::info!(
            "Loaded texture {}x{} ({:?}) with {} bytes",
            texture.width,
            texture.height,
            texture.format,
            texture.data.len()
        );
        Ok(texture)
    }

    /// Convert a decoded image without touching its channel layout.
    pub fn from_image(img: DynamicImage) -> Result<Self> {
        let (width, height, format, data) = match img {
            DynamicImage::ImageRgb8(rgb) => {
                (rgb.width(), rgb.height(), TextureFormat::Rgb8, rgb.into_raw())
            }
            DynamicImage::ImageRgba8(rgba) => {
                (rgba.width(), rgba.height(), TextureFormat::Rgba8, rgba.into_raw())
            }
            other => bail!("unsupported pixel format {:?}", other.color()),
        };
        Self::new(width, height, format, data)
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        self.format.bytes_per_pixel()
    }

    /// Check if the texture data is valid.
    pub fn is_valid(&self) -> bool {
        let expected = self.width as usize * self.height as usize * self.bytes_per_pixel() as usize;
        self.data.len() == expected && self.width > 0 && self.height > 0
    }
}
