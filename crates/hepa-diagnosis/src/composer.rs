//! 报告组装
//!
//! [`Report`] 是诊断结果的结构化载体，网页展示与 PDF 导出都直接使用它。
//! [`Report::render_text`] 生成固定版式的纯文本报告：前13行为患者字段，
//! 各段落以固定标记开头（"Diagnosis:", "Potential Causes:" 等），
//! 旧版纯文本解析依赖这些行序和标记，修改时需同步 `hepa-report` 中的解析器。

use crate::knowledge::ADDITIONAL_RECOMMENDATIONS;
use crate::policy::{BmiBand, SeverityPolicy, VolumeRiskBracket};
use chrono::{DateTime, Utc};
use hepa_core::utils::{parse_enzyme_reading, parse_number};
use hepa_core::{DiagnosisResult, PatientRecord};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::warn;

/// 风险因素段落标记
pub const RELATIONSHIPS_MARKER: &str = "Relationships between Input Data and Diagnosis:";

/// 文本报告前13行的字段名，按行序排列
pub const DEMOGRAPHIC_LABELS: [&str; 13] = [
    "Name",
    "National ID",
    "Nationality",
    "Age",
    "Mobile Number",
    "Gender",
    "Chronic Diseases",
    "Liver Enzymes (ALT)",
    "Bilirubin",
    "Albumin",
    "Weight",
    "Height",
    "BMI",
];

/// 从表单文本解析出的数值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClinicalMeasures {
    pub age: f64,
    /// ALT (IU/L)
    pub liver_enzymes: f64,
    pub bmi: f64,
}

/// 单条风险因素结论
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor: String,
    pub statement: String,
    pub elevated: bool,
}

impl RiskFactor {
    fn new(factor: &str, statement: impl Into<String>, elevated: bool) -> Self {
        Self {
            factor: factor.to_string(),
            statement: statement.into(),
            elevated,
        }
    }

    pub fn line(&self) -> String {
        format!("{}: {}", self.factor, self.statement)
    }
}

/// 结构化诊断报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub analysis_id: String,
    pub generated_at: DateTime<Utc>,
    pub patient: PatientRecord,
    pub measures: ClinicalMeasures,
    pub diagnosis: DiagnosisResult,
    /// 结论段落（无肿瘤 / 建议就诊）
    pub summary: String,
    /// 附加建议，无肿瘤时为空
    pub recommendations: Vec<String>,
    pub risk_factors: Vec<RiskFactor>,
    /// 数值字段解析失败时的回退说明
    pub parse_warnings: Vec<String>,
}

/// 按 Python `str(float)` 的习惯输出：整数值保留一位小数
fn format_reading(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// 文本报告按行解析，字段中的换行统一替换为空格
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

impl Report {
    /// 患者信息表的13行（标签, 值）
    pub fn demographics(&self) -> Vec<(&'static str, String)> {
        let p = &self.patient;
        let values = [
            single_line(&p.name),
            single_line(&p.national_id),
            single_line(&p.nationality),
            single_line(&p.age),
            single_line(&p.mobile_number),
            single_line(&p.gender),
            single_line(&p.chronic_diseases),
            format!("{} IU/L", format_reading(self.measures.liver_enzymes)),
            format!("{} mg/dL", single_line(&p.bilirubin)),
            format!("{} g/dL", single_line(&p.albumin)),
            format!("{} kg", single_line(&p.weight)),
            format!("{} cm", single_line(&p.height)),
            format!("{:.1}", self.measures.bmi),
        ];
        DEMOGRAPHIC_LABELS.into_iter().zip(values).collect()
    }

    pub fn tumor_volume_line(&self) -> String {
        format!(
            "Tumor Volume: {:.2} mm³ (~{:.1} cm³)",
            self.diagnosis.volume,
            self.diagnosis.volume_cm3()
        )
    }

    pub fn tumor_category_line(&self) -> String {
        format!("Tumor Size Category: {}", self.diagnosis.volume_category.label())
    }

    /// 生成固定版式的纯文本报告
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let d = &self.diagnosis;

        for (label, value) in self.demographics() {
            let _ = writeln!(out, "{}: {}", label, value);
        }
        let _ = writeln!(out, "{}", self.tumor_volume_line());
        let _ = writeln!(out, "{}\n", self.tumor_category_line());

        let _ = writeln!(out, "Diagnosis: {}\n", d.category.title());
        let _ = writeln!(out, "Description: {}\n", d.description);

        out.push_str("Potential Causes:\n");
        let _ = writeln!(out, "{}\n", numbered(&d.causes));

        out.push_str("Recommended Treatment:\n");
        let _ = writeln!(out, "{}\n", d.treatment);

        out.push_str("Prevention Strategies:\n");
        let _ = writeln!(out, "{}\n", numbered(&d.prevention));

        let _ = writeln!(out, "{}\n", single_line(&self.summary));

        if !self.recommendations.is_empty() {
            out.push_str("Additional Recommendations:\n");
            for item in &self.recommendations {
                let _ = writeln!(out, "- {}", item);
            }
            out.push('\n');
        }

        let _ = writeln!(out, "\n{}", RELATIONSHIPS_MARKER);
        for risk in &self.risk_factors {
            let _ = writeln!(out, "- {}", risk.line());
        }

        out
    }
}

fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 报告组装器
#[derive(Debug, Clone, Default)]
pub struct ReportComposer {
    policy: SeverityPolicy,
}

impl ReportComposer {
    pub fn new(policy: SeverityPolicy) -> Self {
        Self { policy }
    }

    /// 解析数值字段；失败时回退为0并记录说明
    pub fn measure(&self, patient: &PatientRecord) -> (ClinicalMeasures, Vec<String>) {
        let mut warnings = Vec::new();
        let fallback = |field: &str, raw: &str, warnings: &mut Vec<String>| {
            let message = format!("Could not read {} \"{}\" as a number; using 0", field, raw);
            warn!("{}", message);
            warnings.push(message);
            0.0
        };

        let age = parse_number(&patient.age).unwrap_or_else(|| fallback("age", &patient.age, &mut warnings));
        let liver_enzymes = parse_enzyme_reading(&patient.liver_enzymes)
            .unwrap_or_else(|| fallback("liver enzymes", &patient.liver_enzymes, &mut warnings));

        let weight = parse_number(&patient.weight);
        let height = parse_number(&patient.height);
        let bmi = match (weight, height) {
            (Some(w), Some(h)) if h > 0.0 => w / ((h / 100.0) * (h / 100.0)),
            (Some(_), Some(_)) => {
                let message = format!("Height \"{}\" must be positive; BMI set to 0", patient.height);
                warn!("{}", message);
                warnings.push(message);
                0.0
            }
            (None, _) => fallback("weight", &patient.weight, &mut warnings),
            (_, None) => fallback("height", &patient.height, &mut warnings),
        };

        (
            ClinicalMeasures {
                age,
                liver_enzymes,
                bmi,
            },
            warnings,
        )
    }

    /// 六条风险因素结论
    pub fn risk_factors(
        &self,
        patient: &PatientRecord,
        measures: &ClinicalMeasures,
        volume_cm3: f64,
    ) -> Vec<RiskFactor> {
        let policy = &self.policy;
        let mut risks = Vec::with_capacity(6);

        risks.push(if policy.is_elderly(measures.age) {
            RiskFactor::new(
                "Age",
                format!(
                    "Patients over {} years old are at higher risk of liver cancer.",
                    policy.elderly_age
                ),
                true,
            )
        } else {
            RiskFactor::new("Age", "Younger patients have a lower risk of liver cancer.", false)
        });

        risks.push(if patient.is_male() {
            RiskFactor::new(
                "Gender",
                "Males have higher risk of liver cancer compared to females.",
                true,
            )
        } else {
            RiskFactor::new(
                "Gender",
                "Females have lower risk of liver cancer compared to males.",
                false,
            )
        });

        risks.push(if policy.has_chronic_liver_disease(&patient.chronic_diseases) {
            RiskFactor::new(
                "Chronic Diseases",
                "Patients with chronic liver diseases are at higher risk of complications.",
                true,
            )
        } else {
            RiskFactor::new(
                "Chronic Diseases",
                "No significant chronic liver diseases were reported.",
                false,
            )
        });

        risks.push(if policy.enzymes_elevated(measures.liver_enzymes) {
            RiskFactor::new(
                "Liver Enzymes",
                "Elevated liver enzymes may indicate liver damage or inflammation.",
                true,
            )
        } else {
            RiskFactor::new("Liver Enzymes", "Normal liver enzyme levels.", false)
        });

        risks.push(match policy.volume_risk(volume_cm3) {
            VolumeRiskBracket::UnderOne => {
                RiskFactor::new("Tumor Volume", "Very small tumor (<1 cm³), lower risk.", false)
            }
            VolumeRiskBracket::OneToFive => {
                RiskFactor::new("Tumor Volume", "Small tumor (1-5 cm³), moderate risk.", true)
            }
            VolumeRiskBracket::FiveToTen => {
                RiskFactor::new("Tumor Volume", "Medium tumor (5-10 cm³), high risk.", true)
            }
            VolumeRiskBracket::TenOrMore => {
                RiskFactor::new("Tumor Volume", "Large tumor (>10 cm³), very high risk.", true)
            }
        });

        risks.push(match policy.bmi_band(measures.bmi) {
            BmiBand::Obese => RiskFactor::new(
                "BMI",
                "Obesity is a risk factor for fatty liver disease and liver cancer.",
                true,
            ),
            BmiBand::Overweight => RiskFactor::new(
                "BMI",
                "Overweight status may contribute to liver disease risk.",
                true,
            ),
            BmiBand::Healthy => {
                RiskFactor::new("BMI", "Healthy weight reduces liver disease risk.", false)
            }
        });

        risks
    }

    /// 组装完整报告
    pub fn compose(
        &self,
        analysis_id: impl Into<String>,
        patient: PatientRecord,
        diagnosis: DiagnosisResult,
    ) -> Report {
        let (measures, parse_warnings) = self.measure(&patient);
        let risk_factors = self.risk_factors(&patient, &measures, diagnosis.volume_cm3());
        let name = single_line(&patient.name);

        let (summary, recommendations) = if diagnosis.category.has_tumor() {
            (
                format!(
                    "{} has a liver condition that requires medical attention. Consultation with a hepatologist \
                     or oncologist is strongly recommended. Depending on the diagnosis, further tests like biopsy \
                     or additional imaging may be needed to confirm the diagnosis and plan treatment.",
                    name
                ),
                ADDITIONAL_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect(),
            )
        } else {
            (
                format!(
                    "{} shows no signs of liver tumors in the scan. No further treatment is required. However, \
                     if the patient has risk factors like hepatitis or alcohol use, regular monitoring is recommended.",
                    name
                ),
                Vec::new(),
            )
        };

        Report {
            analysis_id: analysis_id.into(),
            generated_at: Utc::now(),
            patient,
            measures,
            diagnosis,
            summary,
            recommendations,
            risk_factors,
            parse_warnings,
        }
    }
}
