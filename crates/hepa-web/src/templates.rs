//! 页面模板

use hepa_core::{HepaError, Result};
use hepa_diagnosis::{Report, RiskFactor};
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::json;

const LAYOUT_TEMPLATE: &str = include_str!("../templates/layout.hbs");
const INDEX_TEMPLATE: &str = include_str!("../templates/index.hbs");
const RESULT_TEMPLATE: &str = include_str!("../templates/result.hbs");

/// 结果页的诊断摘要
#[derive(Debug, Serialize)]
pub struct DiagnosisView {
    pub title: &'static str,
    pub short_label: &'static str,
    pub has_tumor: bool,
    pub area_percentage: String,
    pub volume_mm3: String,
    pub volume_cm3: String,
    pub volume_category: &'static str,
    pub description: String,
}

/// 结果页数据
#[derive(Debug, Serialize)]
pub struct ResultView<'a> {
    pub analysis_id: &'a str,
    pub report_text: String,
    pub visualization_url: &'a str,
    pub diagram_urls: &'a [String],
    pub diagnosis: DiagnosisView,
    pub risk_factors: &'a [RiskFactor],
    pub warnings: &'a [String],
    pub age: &'a str,
    pub gender: &'a str,
    pub chronic_diseases: &'a str,
    pub liver_enzymes: &'a str,
}

impl<'a> ResultView<'a> {
    pub fn new(report: &'a Report, visualization_url: &'a str, diagram_urls: &'a [String]) -> Self {
        let d = &report.diagnosis;
        Self {
            analysis_id: &report.analysis_id,
            report_text: report.render_text(),
            visualization_url,
            diagram_urls,
            diagnosis: DiagnosisView {
                title: d.category.title(),
                short_label: d.category.short_label(),
                has_tumor: d.category.has_tumor(),
                area_percentage: format!("{:.2}", d.area_percentage),
                volume_mm3: format!("{:.2}", d.volume),
                volume_cm3: format!("{:.1}", d.volume_cm3()),
                volume_category: d.volume_category.label(),
                description: d.description.clone(),
            },
            risk_factors: &report.risk_factors,
            warnings: &report.parse_warnings,
            age: &report.patient.age,
            gender: &report.patient.gender,
            chronic_diseases: &report.patient.chronic_diseases,
            liver_enzymes: &report.patient.liver_enzymes,
        }
    }
}

/// Handlebars 页面渲染器
pub struct PageRenderer {
    registry: Handlebars<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);
        registry
            .register_partial("layout", LAYOUT_TEMPLATE)
            .map_err(|e| HepaError::Internal(format!("Invalid layout template: {}", e)))?;
        registry
            .register_template_string("index", INDEX_TEMPLATE)
            .map_err(|e| HepaError::Internal(format!("Invalid index template: {}", e)))?;
        registry
            .register_template_string("result", RESULT_TEMPLATE)
            .map_err(|e| HepaError::Internal(format!("Invalid result template: {}", e)))?;

        Ok(Self { registry })
    }

    pub fn index(&self) -> Result<String> {
        self.render("index", &json!({}))
    }

    pub fn result(&self, view: &ResultView<'_>) -> Result<String> {
        self.render("result", view)
    }

    fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String> {
        self.registry
            .render(name, data)
            .map_err(|e| HepaError::Internal(format!("Template render error: {}", e)))
    }
}
