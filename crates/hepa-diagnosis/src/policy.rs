//! 分级策略
//!
//! 所有阈值集中在 [`SeverityPolicy`] 中。其中有三条彼此独立的轴：
//!
//! 1. 严重程度：按肿瘤**面积占比**分级 (1% / 10% / 30%)，决定诊断类别。
//! 2. 体积分级：按肿瘤**体积 cm³** 分级 (0.1 / 1 / 30)，报告中的 "Tumor Size Category"。
//! 3. 风险区间：按肿瘤**体积 cm³** 分级 (1 / 5 / 10)，风险因素说明和体积图表使用。
//!
//! 单张切片的面积占比与体积估计量纲不同，三条轴不做互相校正，
//! 因此边界情况下类别之间可能看起来不一致。所有区间均为左闭右开。

use hepa_core::{SeverityCategory, VolumeCategory};
use serde::{Deserialize, Serialize};

/// 年龄区间（图表使用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeBracket {
    Under40,
    From40To60,
    Over60,
}

impl AgeBracket {
    pub const LABELS: [&'static str; 3] = ["<40", "40-60", ">60"];

    pub fn index(&self) -> usize {
        match self {
            AgeBracket::Under40 => 0,
            AgeBracket::From40To60 => 1,
            AgeBracket::Over60 => 2,
        }
    }
}

/// 体积风险区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeRiskBracket {
    UnderOne,
    OneToFive,
    FiveToTen,
    TenOrMore,
}

impl VolumeRiskBracket {
    pub const LABELS: [&'static str; 4] = ["<1cm³", "1-5cm³", "5-10cm³", ">10cm³"];

    pub fn index(&self) -> usize {
        match self {
            VolumeRiskBracket::UnderOne => 0,
            VolumeRiskBracket::OneToFive => 1,
            VolumeRiskBracket::FiveToTen => 2,
            VolumeRiskBracket::TenOrMore => 3,
        }
    }
}

/// BMI 区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BmiBand {
    Healthy,
    Overweight,
    Obese,
}

/// 分级策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityPolicy {
    /// 掩码二值化阈值（严格大于）
    pub binarization_threshold: f32,
    /// 面积占比分界 (%)：良性 / 早期 / 晚期
    pub area_bands_percent: [f64; 3],
    /// 体积分级分界 (cm³)
    pub size_bands_cm3: [f64; 3],
    /// 风险区间分界 (cm³)
    pub risk_bands_cm3: [f64; 3],
    /// 肝酶升高阈值 (IU/L)，严格大于
    pub elevated_enzyme_limit: f64,
    /// 高龄阈值（岁），严格大于
    pub elderly_age: f64,
    /// 年龄图表的低龄分界（岁）
    pub young_age: f64,
    /// 超重 BMI，严格大于
    pub overweight_bmi: f64,
    /// 肥胖 BMI，严格大于
    pub obese_bmi: f64,
    /// 慢性肝病关键词（整个字段忽略大小写后完全匹配）
    pub chronic_keywords: Vec<String>,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            binarization_threshold: 0.5,
            area_bands_percent: [1.0, 10.0, 30.0],
            size_bands_cm3: [0.1, 1.0, 30.0],
            risk_bands_cm3: [1.0, 5.0, 10.0],
            elevated_enzyme_limit: 40.0,
            elderly_age: 60.0,
            young_age: 40.0,
            overweight_bmi: 25.0,
            obese_bmi: 30.0,
            chronic_keywords: vec![
                "hepatitis".to_string(),
                "cirrhosis".to_string(),
                "fatty liver".to_string(),
            ],
        }
    }
}

/// 按三个分界点落入四个区间的下标，分界值归入上一区间
fn band_index(value: f64, bands: &[f64; 3]) -> usize {
    bands.iter().take_while(|edge| value >= **edge).count()
}

impl SeverityPolicy {
    pub fn severity_for_area(&self, area_percentage: f64) -> SeverityCategory {
        match band_index(area_percentage, &self.area_bands_percent) {
            0 => SeverityCategory::NoTumor,
            1 => SeverityCategory::Benign,
            2 => SeverityCategory::EarlyStageCancer,
            _ => SeverityCategory::AdvancedOrMetastatic,
        }
    }

    pub fn volume_category(&self, volume_cm3: f64) -> VolumeCategory {
        match band_index(volume_cm3, &self.size_bands_cm3) {
            0 => VolumeCategory::VerySmall,
            1 => VolumeCategory::Small,
            2 => VolumeCategory::Medium,
            _ => VolumeCategory::Large,
        }
    }

    pub fn volume_risk(&self, volume_cm3: f64) -> VolumeRiskBracket {
        match band_index(volume_cm3, &self.risk_bands_cm3) {
            0 => VolumeRiskBracket::UnderOne,
            1 => VolumeRiskBracket::OneToFive,
            2 => VolumeRiskBracket::FiveToTen,
            _ => VolumeRiskBracket::TenOrMore,
        }
    }

    /// 年龄区间：<40, 40–60（含60）, >60
    pub fn age_bracket(&self, age: f64) -> AgeBracket {
        if age < self.young_age {
            AgeBracket::Under40
        } else if age <= self.elderly_age {
            AgeBracket::From40To60
        } else {
            AgeBracket::Over60
        }
    }

    pub fn is_elderly(&self, age: f64) -> bool {
        age > self.elderly_age
    }

    pub fn has_chronic_liver_disease(&self, chronic_diseases: &str) -> bool {
        let normalized = chronic_diseases.to_lowercase();
        self.chronic_keywords.iter().any(|k| *k == normalized)
    }

    pub fn enzymes_elevated(&self, liver_enzymes: f64) -> bool {
        liver_enzymes > self.elevated_enzyme_limit
    }

    pub fn bmi_band(&self, bmi: f64) -> BmiBand {
        if bmi > self.obese_bmi {
            BmiBand::Obese
        } else if bmi > self.overweight_bmi {
            BmiBand::Overweight
        } else {
            BmiBand::Healthy
        }
    }
}
