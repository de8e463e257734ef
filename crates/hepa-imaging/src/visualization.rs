//! 分割结果可视化
//!
//! 三联图：原始影像 | 二值掩码 | 叠加图（肿瘤像素红色，透明度0.5），
//! 每个面板上方带标题。

use hepa_core::{BinaryMask, HepaError, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::io::Cursor;
use tracing::warn;

/// 面板间距（像素）
const PANEL_GAP: u32 = 12;
/// 标题栏高度（像素）
const CAPTION_HEIGHT: u32 = 28;
const PANEL_TITLES: [&str; 3] = ["Original Image", "Segmentation Mask", "Tumor Detection"];
/// 叠加透明度
const OVERLAY_ALPHA: f32 = 0.5;
const TUMOR_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// 生成三联图
///
/// 原始影像缩放到掩码分辨率；单通道影像广播为三通道。
/// 标题绘制失败（如缺少系统字体）时保留空白标题栏。
pub fn build_composite(original: &DynamicImage, mask: &BinaryMask) -> Result<RgbImage> {
    let (w, h) = (mask.width, mask.height);
    if w == 0 || h == 0 || mask.pixels.len() != (w * h) as usize {
        return Err(HepaError::Encoding(format!(
            "Mask of {} pixels does not match {}x{}",
            mask.pixels.len(),
            w,
            h
        )));
    }

    let base = original.resize_exact(w, h, FilterType::CatmullRom).to_rgb8();
    let mask_panel = render_mask(mask);
    let overlay = blend_overlay(&base, mask);

    let mut canvas = RgbImage::from_pixel(
        3 * w + 4 * PANEL_GAP,
        h + CAPTION_HEIGHT + 2 * PANEL_GAP,
        BACKGROUND,
    );
    for (index, panel) in [&base, &mask_panel, &overlay].into_iter().enumerate() {
        imageops::replace(
            &mut canvas,
            panel,
            panel_left(index, w) as i64,
            (PANEL_GAP + CAPTION_HEIGHT) as i64,
        );
    }

    if let Err(e) = draw_captions(&mut canvas, w) {
        warn!("Failed to draw visualization captions: {}", e);
    }

    Ok(canvas)
}

fn panel_left(index: usize, panel_width: u32) -> u32 {
    PANEL_GAP + index as u32 * (panel_width + PANEL_GAP)
}

/// 在各面板上方居中绘制标题
fn draw_captions(canvas: &mut RgbImage, panel_width: u32) -> std::result::Result<(), String> {
    let size = canvas.dimensions();
    let root = BitMapBackend::with_buffer(&mut **canvas, size).into_drawing_area();
    let style = ("sans-serif", 16)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));

    let y = (PANEL_GAP + CAPTION_HEIGHT / 2) as i32;
    for (index, title) in PANEL_TITLES.iter().enumerate() {
        let x = (panel_left(index, panel_width) + panel_width / 2) as i32;
        root.draw_text(title, &style, (x, y)).map_err(|e| e.to_string())?;
    }
    root.present().map_err(|e| e.to_string())
}

/// 掩码灰度图：肿瘤白色，其余黑色
fn render_mask(mask: &BinaryMask) -> RgbImage {
    RgbImage::from_fn(mask.width, mask.height, |x, y| {
        if mask.is_tumor(x, y) {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    })
}

/// 整幅加权混合：out = base·(1-α) + color·α，非肿瘤像素的 color 为黑色
fn blend_overlay(base: &RgbImage, mask: &BinaryMask) -> RgbImage {
    RgbImage::from_fn(base.width(), base.height(), |x, y| {
        let original = base.get_pixel(x, y);
        let color = if mask.is_tumor(x, y) {
            TUMOR_COLOR
        } else {
            Rgb([0, 0, 0])
        };

        let mut out = [0u8; 3];
        for c in 0..3 {
            let value =
                original[c] as f32 * (1.0 - OVERLAY_ALPHA) + color[c] as f32 * OVERLAY_ALPHA;
            out[c] = value.round().clamp(0.0, 255.0) as u8;
        }
        Rgb(out)
    })
}

/// 编码为 PNG
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| HepaError::Encoding(e.to_string()))?;
    Ok(bytes)
}
