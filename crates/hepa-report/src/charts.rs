//! 关系图表
//!
//! 图表分两步生成：[`relationship_charts`] 从报告推导出纯数据的 [`ChartSpec`]，
//! [`render_png`] 再用 plotters 绘制到内存位图并编码为 PNG。

use hepa_core::{HepaError, Result};
use hepa_diagnosis::{AgeBracket, Report, SeverityPolicy, VolumeRiskBracket};
use image::{DynamicImage, ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use serde::Serialize;
use std::io::Cursor;

const LIGHT_BLUE: (u8, u8, u8) = (173, 216, 230);
const LIGHT_GREEN: (u8, u8, u8) = (144, 238, 144);
const LIGHT_CORAL: (u8, u8, u8) = (240, 128, 128);
const PINK: (u8, u8, u8) = (255, 192, 203);
const RED: (u8, u8, u8) = (255, 0, 0);
const GREEN: (u8, u8, u8) = (0, 128, 0);
const YELLOW: (u8, u8, u8) = (255, 255, 0);
const ORANGE: (u8, u8, u8) = (255, 165, 0);
const MATERIAL_GREEN: (u8, u8, u8) = (76, 175, 80);

/// 病因与对应预防措施的关联强度（固定值）
const CAUSE_PREVENTION: [(&str, &str, f64); 5] = [
    ("Hepatitis", "Vaccination", 0.9),
    ("Alcohol", "Moderation", 0.8),
    ("NAFLD", "Diet/Exercise", 0.7),
    ("Toxins", "Avoidance", 0.6),
    ("Genetics", "Screening", 0.5),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartKind {
    Pie,
    Bar,
    HorizontalBar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSlice {
    pub label: String,
    pub value: f64,
    pub color: (u8, u8, u8),
}

impl ChartSlice {
    fn new(label: impl Into<String>, value: f64, color: (u8, u8, u8)) -> Self {
        Self {
            label: label.into(),
            value,
            color,
        }
    }
}

/// 单张图表的数据描述
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub kind: ChartKind,
    pub slices: Vec<ChartSlice>,
    /// 数值轴说明
    pub axis_label: Option<String>,
    /// 柱状图数值轴上限
    pub value_max: f64,
    pub width: u32,
    pub height: u32,
}

impl ChartSpec {
    fn new(title: &str, kind: ChartKind, slices: Vec<ChartSlice>) -> Self {
        Self {
            title: title.to_string(),
            kind,
            slices,
            axis_label: None,
            value_max: 1.0,
            width: 600,
            height: 400,
        }
    }

    fn with_axis_label(mut self, label: &str) -> Self {
        self.axis_label = Some(label.to_string());
        self
    }

    fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn values(&self) -> Vec<f64> {
        self.slices.iter().map(|s| s.value).collect()
    }
}

fn one_hot(index: usize, len: usize) -> Vec<f64> {
    (0..len).map(|i| if i == index { 1.0 } else { 0.0 }).collect()
}

fn flag(set: bool) -> f64 {
    if set {
        1.0
    } else {
        0.0
    }
}

/// 从报告推导六张关系图表，顺序与页面上的 diagram_0..5 一致
pub fn relationship_charts(report: &Report, policy: &SeverityPolicy) -> Vec<ChartSpec> {
    let measures = &report.measures;

    let age_values = one_hot(policy.age_bracket(measures.age).index(), AgeBracket::LABELS.len());
    let age = ChartSpec::new(
        "Age vs Liver Disease Risk",
        ChartKind::Pie,
        AgeBracket::LABELS
            .iter()
            .zip(age_values)
            .zip([LIGHT_BLUE, LIGHT_GREEN, LIGHT_CORAL])
            .map(|((label, value), color)| ChartSlice::new(*label, value, color))
            .collect(),
    );

    let male = flag(report.patient.is_male());
    let gender = ChartSpec::new(
        "Gender vs Liver Disease Risk",
        ChartKind::Pie,
        vec![
            ChartSlice::new("Male", male * 100.0, LIGHT_BLUE),
            ChartSlice::new("Female", (1.0 - male) * 100.0, PINK),
        ],
    );

    let chronic = ChartSpec::new(
        "Chronic Diseases vs Liver Disease Risk",
        ChartKind::Bar,
        vec![ChartSlice::new(
            "Patient Chronic Diseases",
            flag(policy.has_chronic_liver_disease(&report.patient.chronic_diseases)),
            RED,
        )],
    )
    .with_axis_label("Chronic Liver Conditions (1=Yes, 0=No)");

    let elevated = flag(policy.enzymes_elevated(measures.liver_enzymes));
    let enzymes = ChartSpec::new(
        "Liver Enzymes vs Disease Risk",
        ChartKind::Pie,
        vec![
            ChartSlice::new("High Risk (Elevated)", elevated * 100.0, RED),
            ChartSlice::new("Normal", (1.0 - elevated) * 100.0, GREEN),
        ],
    );

    let volume_values = one_hot(
        policy.volume_risk(report.diagnosis.volume_cm3()).index(),
        VolumeRiskBracket::LABELS.len(),
    );
    let volume = ChartSpec::new(
        "Tumor Volume Category",
        ChartKind::Bar,
        VolumeRiskBracket::LABELS
            .iter()
            .zip(volume_values)
            .zip([GREEN, YELLOW, ORANGE, RED])
            .map(|((label, value), color)| ChartSlice::new(*label, value, color))
            .collect(),
    )
    .with_axis_label("Risk Level");

    let cause_prevention = ChartSpec::new(
        "Cause-Prevention Relationship",
        ChartKind::HorizontalBar,
        CAUSE_PREVENTION
            .iter()
            .map(|(cause, prevention, strength)| {
                ChartSlice::new(format!("{} -> {}", cause, prevention), *strength, MATERIAL_GREEN)
            })
            .collect(),
    )
    .with_axis_label("Prevention Effectiveness")
    .with_size(800, 600);

    vec![age, gender, chronic, enzymes, volume, cause_prevention]
}

fn chart_error(e: impl std::fmt::Display) -> HepaError {
    HepaError::Chart(e.to_string())
}

fn rgb(color: (u8, u8, u8)) -> RGBColor {
    RGBColor(color.0, color.1, color.2)
}

/// 绘制图表并编码为 PNG
pub fn render_png(spec: &ChartSpec) -> Result<Vec<u8>> {
    let (width, height) = (spec.width, spec.height);
    let mut buffer = vec![0u8; (width * height * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;
        let area = root
            .titled(&spec.title, ("sans-serif", 22))
            .map_err(chart_error)?;

        match spec.kind {
            ChartKind::Pie => draw_pie(&area, spec)?,
            ChartKind::Bar => draw_bars(&area, spec)?,
            ChartKind::HorizontalBar => draw_horizontal_bars(&area, spec)?,
        }

        root.present().map_err(chart_error)?;
    }

    let img = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| HepaError::Chart("Failed to create image from buffer".to_string()))?;

    let mut png_bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| HepaError::Encoding(e.to_string()))?;

    Ok(png_bytes)
}

fn draw_pie(area: &DrawingArea<BitMapBackend<'_>, Shift>, spec: &ChartSpec) -> Result<()> {
    // 零值扇区不绘制，否则标签会叠在一起
    let visible: Vec<&ChartSlice> = spec.slices.iter().filter(|s| s.value > 0.0).collect();
    if visible.is_empty() {
        return Ok(());
    }

    let sizes: Vec<f64> = visible.iter().map(|s| s.value).collect();
    let colors: Vec<RGBColor> = visible.iter().map(|s| rgb(s.color)).collect();
    let labels: Vec<String> = visible.iter().map(|s| s.label.clone()).collect();

    let (w, h) = area.dim_in_pixel();
    let center = ((w / 2) as i32, (h / 2) as i32);
    let radius = f64::from(w.min(h)) * 0.35;

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(90.0);
    pie.label_style(("sans-serif", 16).into_font().color(&BLACK));
    pie.percentages(("sans-serif", 14).into_font().color(&BLACK));
    area.draw(&pie).map_err(chart_error)?;

    Ok(())
}

fn draw_bars(area: &DrawingArea<BitMapBackend<'_>, Shift>, spec: &ChartSpec) -> Result<()> {
    let n = spec.slices.len() as u32;
    let labels: Vec<String> = spec.slices.iter().map(|s| s.label.clone()).collect();

    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0u32..n).into_segmented(), 0f64..spec.value_max)
        .map_err(chart_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n as usize)
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .y_desc(spec.axis_label.clone().unwrap_or_default())
        .draw()
        .map_err(chart_error)?;

    chart
        .draw_series(spec.slices.iter().enumerate().map(|(i, slice)| {
            let i = i as u32;
            let mut bar = Rectangle::new(
                [
                    (SegmentValue::Exact(i), 0.0),
                    (SegmentValue::Exact(i + 1), slice.value),
                ],
                rgb(slice.color).filled(),
            );
            bar.set_margin(0, 0, 10, 10);
            bar
        }))
        .map_err(chart_error)?;

    Ok(())
}

fn draw_horizontal_bars(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    spec: &ChartSpec,
) -> Result<()> {
    let n = spec.slices.len() as u32;
    // 第一项画在最上方
    let row = |i: u32| n - 1 - i;
    let labels: Vec<String> = spec.slices.iter().map(|s| s.label.clone()).collect();

    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(200)
        .build_cartesian_2d(0f64..spec.value_max, (0u32..n).into_segmented())
        .map_err(chart_error)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n as usize)
        .y_label_formatter(&|v| match v {
            SegmentValue::CenterOf(r) if *r < n => labels
                .get(row(*r) as usize)
                .cloned()
                .unwrap_or_default(),
            _ => String::new(),
        })
        .x_desc(spec.axis_label.clone().unwrap_or_default())
        .draw()
        .map_err(chart_error)?;

    chart
        .draw_series(spec.slices.iter().enumerate().map(|(i, slice)| {
            let r = row(i as u32);
            let mut bar = Rectangle::new(
                [
                    (0.0, SegmentValue::Exact(r)),
                    (slice.value, SegmentValue::Exact(r + 1)),
                ],
                rgb(slice.color).filled(),
            );
            bar.set_margin(8, 8, 0, 0);
            bar
        }))
        .map_err(chart_error)?;

    Ok(())
}
