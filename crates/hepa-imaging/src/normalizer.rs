//! 影像归一化
//!
//! 将任意输入影像转换为模型输入：固定分辨率、单通道、[0, 1] 取值。

use hepa_core::{HepaError, NormalizedImage, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::debug;

/// 影像归一化器
#[derive(Debug, Clone, Copy)]
pub struct ImageNormalizer {
    target_size: u32,
}

impl ImageNormalizer {
    pub fn new(target_size: u32) -> Self {
        Self { target_size }
    }

    /// 从内存解码影像
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes).map_err(|e| HepaError::InvalidImage(e.to_string()))
    }

    /// 缩放到目标分辨率并取第一个通道
    ///
    /// 8位影像除以255，16位影像除以65535；彩色影像取红色通道。
    pub fn normalize(&self, image: &DynamicImage) -> NormalizedImage {
        let size = self.target_size;
        let resized = image.resize_exact(size, size, FilterType::CatmullRom);

        let pixels: Vec<f32> = match &resized {
            DynamicImage::ImageLuma8(buf) => buf.pixels().map(|p| p[0] as f32 / 255.0).collect(),
            DynamicImage::ImageLumaA8(buf) => buf.pixels().map(|p| p[0] as f32 / 255.0).collect(),
            DynamicImage::ImageLuma16(buf) => buf.pixels().map(|p| p[0] as f32 / 65535.0).collect(),
            DynamicImage::ImageLumaA16(buf) => {
                buf.pixels().map(|p| p[0] as f32 / 65535.0).collect()
            }
            DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgba16(_) => resized
                .to_rgb16()
                .pixels()
                .map(|p| p[0] as f32 / 65535.0)
                .collect(),
            _ => resized.to_rgb8().pixels().map(|p| p[0] as f32 / 255.0).collect(),
        };

        let (width, height) = image.dimensions();
        debug!(
            "Normalized {:?} image {}x{} to {}x{}",
            image.color(),
            width,
            height,
            size,
            size
        );

        NormalizedImage {
            width: size,
            height: size,
            pixels,
        }
    }

    pub fn normalize_bytes(&self, bytes: &[u8]) -> Result<NormalizedImage> {
        let image = Self::decode(bytes)?;
        Ok(self.normalize(&image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

    #[test]
    fn test_grayscale_normalization() {
        let gray = GrayImage::from_pixel(64, 64, Luma([255]));
        let normalized = ImageNormalizer::new(32).normalize(&DynamicImage::ImageLuma8(gray));

        assert_eq!(normalized.shape(), [1, 32, 32, 1]);
        assert_eq!(normalized.pixels.len(), 32 * 32);
        assert!(normalized.pixels.iter().all(|v| (*v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_rgb_uses_first_channel() {
        let rgb = RgbImage::from_pixel(16, 16, Rgb([51, 255, 0]));
        let normalized = ImageNormalizer::new(16).normalize(&DynamicImage::ImageRgb8(rgb));

        assert!((normalized.get(3, 7) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_sixteen_bit_stays_in_unit_range() {
        let deep: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_pixel(8, 8, Luma([65535]));
        let normalized = ImageNormalizer::new(8).normalize(&DynamicImage::ImageLuma16(deep));

        assert!(normalized.pixels.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!((normalized.get(0, 0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_bytes() {
        let err = ImageNormalizer::new(256).normalize_bytes(b"definitely not a png").unwrap_err();
        assert!(matches!(err, HepaError::InvalidImage(_)));
    }
}
