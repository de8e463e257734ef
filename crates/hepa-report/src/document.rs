//! PDF 导出所需的报告内容
//!
//! 结构化报告直接转换为 [`ReportDocument`]；只有表单提交的纯文本时，
//! 由 [`parse_report_text`] 按行序恢复。纯文本解析依赖固定版式：
//! 前13行必须依次为患者字段，否则返回 `ReportFormat` 错误。

use hepa_core::{HepaError, Result};
use hepa_diagnosis::{Report, DEMOGRAPHIC_LABELS, RELATIONSHIPS_MARKER};
use serde::Serialize;

const DIAGNOSIS_MARKER: &str = "Diagnosis:";
const CAUSES_MARKER: &str = "Potential Causes:";
const PREVENTION_MARKER: &str = "Prevention Strategies:";
const VOLUME_MARKER: &str = "Tumor Volume:";
const CATEGORY_MARKER: &str = "Tumor Size Category:";

/// PDF 各区块的内容
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportDocument {
    /// 患者信息表（字段, 值）
    pub demographics: Vec<(String, String)>,
    /// 从 "Diagnosis:" 到风险因素段之前的非空行
    pub diagnosis_lines: Vec<String>,
    pub tumor_volume: String,
    pub tumor_category: String,
    pub causes: Vec<String>,
    pub prevention: Vec<String>,
    /// 风险因素，已去掉行首的 "- "
    pub risk_factors: Vec<String>,
}

impl From<&Report> for ReportDocument {
    fn from(report: &Report) -> Self {
        let text = report.render_text();
        let lines: Vec<&str> = text.lines().collect();
        let mut document = scan_sections(&lines[DEMOGRAPHIC_LABELS.len().min(lines.len())..]);
        document.demographics = report
            .demographics()
            .into_iter()
            .map(|(label, value)| (label.to_string(), value))
            .collect();
        document
    }
}

/// 按行序解析纯文本报告
pub fn parse_report_text(text: &str) -> Result<ReportDocument> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() < DEMOGRAPHIC_LABELS.len() {
        return Err(HepaError::ReportFormat(format!(
            "report has {} lines, expected at least {} patient fields",
            lines.len(),
            DEMOGRAPHIC_LABELS.len()
        )));
    }

    let mut demographics = Vec::with_capacity(DEMOGRAPHIC_LABELS.len());
    for (i, (label, line)) in DEMOGRAPHIC_LABELS.iter().zip(&lines).enumerate() {
        let (found, value) = line.split_once(": ").ok_or_else(|| {
            HepaError::ReportFormat(format!("line {} is not a \"Field: value\" pair", i + 1))
        })?;
        if found != *label {
            return Err(HepaError::ReportFormat(format!(
                "line {}: expected field \"{}\", found \"{}\"",
                i + 1,
                label,
                found
            )));
        }
        demographics.push((label.to_string(), value.to_string()));
    }

    let mut document = scan_sections(&lines[DEMOGRAPHIC_LABELS.len()..]);
    document.demographics = demographics;
    Ok(document)
}

fn scan_sections(lines: &[&str]) -> ReportDocument {
    let diagnosis_start = lines
        .iter()
        .position(|l| l.starts_with(DIAGNOSIS_MARKER))
        .unwrap_or(lines.len());
    let risk_start = lines
        .iter()
        .position(|l| l.trim() == RELATIONSHIPS_MARKER)
        .unwrap_or(lines.len());

    let diagnosis_lines = lines[diagnosis_start..risk_start.max(diagnosis_start)]
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.trim_end().to_string())
        .collect();

    let risk_factors = lines
        .get(risk_start + 1..)
        .unwrap_or_default()
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.trim().trim_start_matches("- ").to_string())
        .collect();

    ReportDocument {
        demographics: Vec::new(),
        diagnosis_lines,
        tumor_volume: first_with_prefix(lines, VOLUME_MARKER),
        tumor_category: first_with_prefix(lines, CATEGORY_MARKER),
        causes: list_after(lines, CAUSES_MARKER),
        prevention: list_after(lines, PREVENTION_MARKER),
        risk_factors,
    }
}

fn first_with_prefix(lines: &[&str], prefix: &str) -> String {
    lines
        .iter()
        .find(|l| l.starts_with(prefix))
        .map(|l| l.trim_end().to_string())
        .unwrap_or_default()
}

/// 标题行之后直到空行为止的列表项
fn list_after(lines: &[&str], header: &str) -> Vec<String> {
    lines
        .iter()
        .skip_while(|l| l.trim() != header)
        .skip(1)
        .take_while(|l| !l.trim().is_empty())
        .map(|l| l.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hepa_core::{PatientRecord, SegmentationMask};
    use hepa_diagnosis::{ReportComposer, SeverityClassifier};

    fn sample_report() -> Report {
        let patient = PatientRecord {
            name: "Layla Mansour".to_string(),
            national_id: "1234567890".to_string(),
            nationality: "Jordanian".to_string(),
            age: "58".to_string(),
            mobile_number: "0790000000".to_string(),
            gender: "Female".to_string(),
            chronic_diseases: "Cirrhosis".to_string(),
            liver_enzymes: "61".to_string(),
            bilirubin: "1.4".to_string(),
            albumin: "3.2".to_string(),
            weight: "64".to_string(),
            height: "160".to_string(),
        };
        let probabilities = (0..10_000).map(|i| if i < 1_500 { 0.8 } else { 0.2 }).collect();
        let mask = SegmentationMask::new(100, 100, probabilities).unwrap();
        let diagnosis = SeverityClassifier::default().classify(&mask);
        ReportComposer::default().compose("c".repeat(32), patient, diagnosis)
    }

    #[test]
    fn test_text_recovers_demographics() {
        let report = sample_report();
        let parsed = parse_report_text(&report.render_text()).unwrap();

        assert_eq!(parsed.demographics.len(), 13);
        assert_eq!(parsed.demographics[0], ("Name".to_string(), "Layla Mansour".to_string()));
        assert_eq!(parsed.demographics[7].1, "61.0 IU/L");
        assert_eq!(parsed.demographics[12].1, "25.0");
        assert_eq!(parsed, ReportDocument::from(&report));
    }

    #[test]
    fn test_browser_line_endings() {
        let report = sample_report();
        let crlf = report.render_text().replace('\n', "\r\n");
        let parsed = parse_report_text(&crlf).unwrap();
        assert_eq!(parsed, ReportDocument::from(&report));
    }

    #[test]
    fn test_sections() {
        let document = ReportDocument::from(&sample_report());

        assert_eq!(document.diagnosis_lines[0], "Diagnosis: Early Stage Liver Cancer (HCC)");
        assert!(document.diagnosis_lines.iter().any(|l| l == "Recommended Treatment:"));
        assert!(document.tumor_volume.starts_with("Tumor Volume: 1500.00 mm³"));
        assert_eq!(document.tumor_category, "Tumor Size Category: Medium (1-30 cm³)");
        assert!(document.causes[0].starts_with("1. "));
        assert!(document.prevention[0].starts_with("1. "));
        assert_eq!(document.risk_factors.len(), 6);
        assert!(document.risk_factors[0].starts_with("Age: "));
        assert!(!document.diagnosis_lines.iter().any(|l| l.contains(RELATIONSHIPS_MARKER)));
    }

    #[test]
    fn test_reordered_lines_fail() {
        let text = sample_report().render_text();
        let mut lines: Vec<&str> = text.lines().collect();
        lines.swap(0, 1);

        let err = parse_report_text(&lines.join("\n")).unwrap_err();
        assert!(matches!(err, HepaError::ReportFormat(_)));
    }

    #[test]
    fn test_removed_line_fails() {
        let text = sample_report().render_text();
        let mut lines: Vec<&str> = text.lines().collect();
        lines.remove(2);

        let err = parse_report_text(&lines.join("\n")).unwrap_err();
        assert!(err.to_string().contains("expected field \"Nationality\""));
    }

    #[test]
    fn test_short_text_fails() {
        assert!(matches!(
            parse_report_text("Name: X\nNational ID: 1"),
            Err(HepaError::ReportFormat(_))
        ));
        assert!(parse_report_text("").is_err());
    }
}
