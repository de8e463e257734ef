//! PDF 导出
//!
//! A4 纵向页面，内置 Helvetica 字体。第一部分依次输出患者信息表、诊断、
//! 肿瘤体积、病因、预防措施和风险因素，内容超出页面时自动分页（底边距 15 mm）；
//! 最后一页嵌入分割可视化图像。

use crate::document::ReportDocument;
use hepa_core::{HepaError, Result};
use printpdf::image_crate::{self, DynamicImage};
use printpdf::*;
use tracing::debug;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 10.0;
const BOTTOM_MARGIN: f32 = 15.0;
const LINE_HEIGHT: f32 = 7.0;
const HEADING_HEIGHT: f32 = 10.0;
const FIELD_COLUMN: f32 = 60.0;
const IMAGE_WIDTH: f32 = 180.0;
const PT_TO_MM: f32 = 0.352_778;
/// Helvetica 平均字宽约为字号的一半
const AVG_CHAR_EM: f32 = 0.5;

const BOLD_LINE_PREFIXES: [&str; 3] = ["Diagnosis:", "Description:", "Recommended Treatment:"];

/// 生成结果
#[derive(Debug, Clone)]
pub struct PdfExport {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// PDF 导出器
#[derive(Debug, Clone)]
pub struct PdfExporter {
    title: String,
}

impl Default for PdfExporter {
    fn default() -> Self {
        Self {
            title: "Liver Tumor Detection Report".to_string(),
        }
    }
}

impl PdfExporter {
    /// 渲染报告；`visualization_png` 为分割可视化图像的编码数据
    pub fn export(&self, document: &ReportDocument, visualization_png: &[u8]) -> Result<PdfExport> {
        let visualization = image_crate::load_from_memory(visualization_png)
            .map_err(|e| HepaError::Pdf(format!("Failed to read visualization image: {}", e)))?;

        let mut page = PageWriter::new(&self.title)?;

        page.centered_title(&self.title, 16.0);
        page.gap(20.0);

        page.heading("Patient Information:");
        page.gap(5.0);
        page.table_row("Field", "Value", true);
        for (field, value) in &document.demographics {
            page.table_row(field, value, false);
        }
        page.gap(10.0);

        page.heading("Diagnosis:");
        for line in &document.diagnosis_lines {
            if BOLD_LINE_PREFIXES.iter().any(|p| line.starts_with(p)) {
                page.paragraph(line, 11.0, true, 0.0);
            } else {
                page.paragraph(line, 10.0, false, 0.0);
            }
        }
        page.gap(5.0);

        page.heading("Tumor Volume Analysis:");
        page.paragraph(&document.tumor_volume, 10.0, false, 0.0);
        page.paragraph(&document.tumor_category, 10.0, false, 0.0);
        page.gap(5.0);

        page.heading("Potential Causes:");
        for cause in &document.causes {
            page.paragraph(cause, 10.0, false, 0.0);
        }
        page.gap(5.0);

        page.heading("Prevention Strategies:");
        for item in &document.prevention {
            page.paragraph(item, 10.0, false, 0.0);
        }
        page.gap(5.0);

        if !document.risk_factors.is_empty() {
            page.heading("Risk Factors Analysis:");
            for risk in &document.risk_factors {
                page.paragraph(risk, 10.0, false, 10.0);
            }
            page.gap(5.0);
        }

        page.new_page();
        page.heading("Liver Scan Analysis:");
        page.image(&visualization, IMAGE_WIDTH);

        let pages = page.pages;
        let bytes = page.finish()?;
        debug!("Rendered PDF report: {} pages, {} bytes", pages, bytes.len());

        Ok(PdfExport { bytes, pages })
    }
}

/// 内置字体只覆盖 WinAnsi 字符集，其余字符替换为 ASCII
fn pdf_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '³' => '3',
            '²' => '2',
            '→' | '↓' => '>',
            '–' | '—' => '-',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '?',
        })
        .collect()
}

fn wrap_width(width_mm: f32, font_size: f32) -> usize {
    let char_mm = font_size * AVG_CHAR_EM * PT_TO_MM;
    ((width_mm / char_mm) as usize).max(10)
}

fn wrap(text: &str, width_mm: f32, font_size: f32) -> Vec<String> {
    let lines: Vec<String> = textwrap::wrap(text, wrap_width(width_mm, font_size))
        .into_iter()
        .map(|l| l.into_owned())
        .collect();
    if lines.is_empty() {
        vec![String::new()]
    } else {
        lines
    }
}

struct PageWriter {
    doc: PdfDocumentReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    layer: PdfLayerReference,
    /// 当前行顶部距页面底边的距离 (mm)
    y: f32,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| HepaError::Pdf(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| HepaError::Pdf(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            regular,
            bold,
            layer,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height < BOTTOM_MARGIN {
            self.new_page();
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn font(&self, bold: bool) -> &IndirectFontRef {
        if bold {
            &self.bold
        } else {
            &self.regular
        }
    }

    /// 在高度为 `height` 的行内写一行文字
    fn text_in_row(&self, text: &str, size: f32, bold: bool, x: f32, height: f32) {
        let baseline = self.y - (height + size * PT_TO_MM * 0.7) / 2.0;
        self.layer
            .use_text(pdf_text(text), size, Mm(x), Mm(baseline), self.font(bold));
    }

    fn centered_title(&mut self, text: &str, size: f32) {
        self.ensure_space(HEADING_HEIGHT);
        let text_width = text.chars().count() as f32 * size * 0.55 * PT_TO_MM;
        let x = ((PAGE_WIDTH - text_width) / 2.0).max(MARGIN);
        self.text_in_row(text, size, true, x, HEADING_HEIGHT);
        self.y -= HEADING_HEIGHT;
    }

    fn heading(&mut self, text: &str) {
        self.ensure_space(HEADING_HEIGHT);
        self.text_in_row(text, 12.0, true, MARGIN, HEADING_HEIGHT);
        self.y -= HEADING_HEIGHT;
    }

    fn paragraph(&mut self, text: &str, size: f32, bold: bool, indent: f32) {
        let width = PAGE_WIDTH - 2.0 * MARGIN - indent;
        for line in wrap(text, width, size) {
            self.ensure_space(LINE_HEIGHT);
            self.text_in_row(&line, size, bold, MARGIN + indent, LINE_HEIGHT);
            self.y -= LINE_HEIGHT;
        }
    }

    fn table_row(&mut self, field: &str, value: &str, bold: bool) {
        let value_width = PAGE_WIDTH - 2.0 * MARGIN - FIELD_COLUMN;
        let value_lines = wrap(value, value_width - 4.0, 10.0);
        let height = LINE_HEIGHT * value_lines.len() as f32;
        self.ensure_space(height);

        let top = self.y;
        self.rect(MARGIN, top, FIELD_COLUMN, height);
        self.rect(MARGIN + FIELD_COLUMN, top, value_width, height);

        self.text_in_row(field, 10.0, bold, MARGIN + 2.0, LINE_HEIGHT);
        for line in &value_lines {
            self.text_in_row(line, 10.0, bold, MARGIN + FIELD_COLUMN + 2.0, LINE_HEIGHT);
            self.y -= LINE_HEIGHT;
        }
        self.y = top - height;
    }

    fn rect(&self, x: f32, top: f32, width: f32, height: f32) {
        self.layer.set_outline_thickness(0.2);
        let line = Line {
            points: vec![
                (Point::new(Mm(x), Mm(top)), false),
                (Point::new(Mm(x + width), Mm(top)), false),
                (Point::new(Mm(x + width), Mm(top - height)), false),
                (Point::new(Mm(x), Mm(top - height)), false),
            ],
            is_closed: true,
        };
        self.layer.add_line(line);
    }

    fn image(&mut self, image: &DynamicImage, width_mm: f32) {
        let buffer = image.to_rgb8();
        let (px_width, px_height) = buffer.dimensions();
        let px_width = px_width.max(1);
        let rgb = DynamicImage::ImageRgb8(buffer);
        let dpi = px_width as f32 / (width_mm / 25.4);
        let height_mm = px_height as f32 / dpi * 25.4;

        self.ensure_space(height_mm);
        let transform = ImageTransform {
            translate_x: Some(Mm(MARGIN)),
            translate_y: Some(Mm(self.y - height_mm)),
            dpi: Some(dpi),
            ..Default::default()
        };
        Image::from_dynamic_image(&rgb).add_to_layer(self.layer.clone(), transform);
        self.y -= height_mm;
    }

    fn finish(self) -> Result<Vec<u8>> {
        self.doc
            .save_to_bytes()
            .map_err(|e| HepaError::Pdf(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn visualization_png() -> Vec<u8> {
        let img = RgbImage::from_pixel(90, 30, Rgb([120, 20, 20]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    fn document(risk_lines: usize) -> ReportDocument {
        ReportDocument {
            demographics: vec![
                ("Name".to_string(), "Test Patient".to_string()),
                ("BMI".to_string(), "22.5".to_string()),
            ],
            diagnosis_lines: vec![
                "Diagnosis: No Tumor Detected".to_string(),
                "Description: The liver appears normal.".to_string(),
            ],
            tumor_volume: "Tumor Volume: 0.00 mm³ (~0.0 cm³)".to_string(),
            tumor_category: "Tumor Size Category: Very Small (<0.1 cm³)".to_string(),
            causes: vec!["1. Chronic Viral Hepatitis (B/C)".to_string()],
            prevention: vec!["1. Vaccination".to_string()],
            risk_factors: (0..risk_lines).map(|i| format!("Risk {}: statement", i)).collect(),
        }
    }

    #[test]
    fn test_export_has_visualization_page() {
        let export = PdfExporter::default().export(&document(6), &visualization_png()).unwrap();
        assert!(export.bytes.starts_with(b"%PDF"));
        assert_eq!(export.pages, 2);
    }

    #[test]
    fn test_long_report_breaks_pages() {
        let export = PdfExporter::default().export(&document(120), &visualization_png()).unwrap();
        assert!(export.pages >= 4);
    }

    #[test]
    fn test_invalid_visualization_fails() {
        let err = PdfExporter::default().export(&document(1), b"not an image").unwrap_err();
        assert!(matches!(err, HepaError::Pdf(_)));
    }

    #[test]
    fn test_pdf_text_replaces_unsupported_characters() {
        assert_eq!(pdf_text("Volume (~1.5 cm³)"), "Volume (~1.5 cm3)");
        assert_eq!(pdf_text("Hepatitis → Vaccination"), "Hepatitis > Vaccination");
        assert_eq!(pdf_text("José"), "Jos?");
    }

    #[test]
    fn test_wrap_long_paragraph() {
        let text = "word ".repeat(100);
        let lines = wrap(&text, PAGE_WIDTH - 2.0 * MARGIN, 10.0);
        assert!(lines.len() > 3);
        assert!(lines.iter().all(|l| l.len() <= wrap_width(PAGE_WIDTH - 2.0 * MARGIN, 10.0)));
    }
}
