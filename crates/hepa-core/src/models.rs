//! 核心数据模型定义

use crate::error::{HepaError, Result};
use serde::{Deserialize, Serialize};

/// 患者信息
///
/// 所有字段按表单原样保存为文本，数值解析在下游按需进行（失败时回退为0）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub name: String,
    pub national_id: String,
    pub nationality: String,
    pub age: String,
    pub mobile_number: String,
    pub gender: String,
    pub chronic_diseases: String,
    pub liver_enzymes: String, // ALT, IU/L
    pub bilirubin: String,     // mg/dL
    pub albumin: String,       // g/dL
    pub weight: String,        // kg
    pub height: String,        // cm
}

impl PatientRecord {
    /// 上传表单中的字段名（顺序与表单一致）
    pub const FORM_FIELDS: [&'static str; 12] = [
        "name",
        "national_id",
        "nationality",
        "age",
        "mobile_number",
        "gender",
        "chronic_diseases",
        "liver_enzymes",
        "bilirubin",
        "albumin",
        "weight",
        "height",
    ];

    /// 按表单字段名设置值，未知字段返回 `false`
    pub fn set_field(&mut self, field: &str, value: String) -> bool {
        let slot = match field {
            "name" => &mut self.name,
            "national_id" => &mut self.national_id,
            "nationality" => &mut self.nationality,
            "age" => &mut self.age,
            "mobile_number" => &mut self.mobile_number,
            "gender" => &mut self.gender,
            "chronic_diseases" => &mut self.chronic_diseases,
            "liver_enzymes" => &mut self.liver_enzymes,
            "bilirubin" => &mut self.bilirubin,
            "albumin" => &mut self.albumin,
            "weight" => &mut self.weight,
            "height" => &mut self.height,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// 性别判断沿用表单取值，仅 "Male" 视为男性
    pub fn is_male(&self) -> bool {
        self.gender == "Male"
    }
}

/// 体素间距 (mm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoxelSpacing {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl VoxelSpacing {
    /// 单个体素体积 (mm³)
    pub fn voxel_volume(&self) -> f64 {
        self.x * self.y * self.z
    }
}

impl Default for VoxelSpacing {
    fn default() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            z: 1.0,
        }
    }
}

/// 归一化后的模型输入，形状为 (1, H, W, 1)，取值范围 [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    pub width: u32,
    pub height: u32,
    /// 行优先存储的单通道像素
    pub pixels: Vec<f32>,
}

impl NormalizedImage {
    pub fn shape(&self) -> [usize; 4] {
        [1, self.height as usize, self.width as usize, 1]
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.pixels[(y * self.width + x) as usize]
    }
}

/// 模型输出的逐像素肿瘤概率
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationMask {
    width: u32,
    height: u32,
    probabilities: Vec<f32>,
}

impl SegmentationMask {
    pub fn new(width: u32, height: u32, probabilities: Vec<f32>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if probabilities.len() != expected || expected == 0 {
            return Err(HepaError::MaskShape {
                expected,
                actual: probabilities.len(),
            });
        }
        Ok(Self {
            width,
            height,
            probabilities,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn probabilities(&self) -> &[f32] {
        &self.probabilities
    }

    /// 概率严格大于阈值的像素视为肿瘤
    pub fn binarize(&self, threshold: f32) -> BinaryMask {
        BinaryMask {
            width: self.width,
            height: self.height,
            pixels: self.probabilities.iter().map(|p| *p > threshold).collect(),
        }
    }
}

/// 二值化掩码
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<bool>,
}

impl BinaryMask {
    pub fn tumor_pixels(&self) -> usize {
        self.pixels.iter().filter(|p| **p).count()
    }

    pub fn total_pixels(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_tumor(&self, x: u32, y: u32) -> bool {
        self.pixels[(y * self.width + x) as usize]
    }
}

/// 严重程度分级（按肿瘤面积占比）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeverityCategory {
    NoTumor,
    Benign,
    EarlyStageCancer,
    AdvancedOrMetastatic,
}

impl SeverityCategory {
    /// 报告中 "Diagnosis:" 行使用的完整诊断名称
    pub fn title(&self) -> &'static str {
        match self {
            SeverityCategory::NoTumor => "No Tumor Detected",
            SeverityCategory::Benign => "Benign Liver Tumor (e.g., Hemangioma)",
            SeverityCategory::EarlyStageCancer => "Early Stage Liver Cancer (HCC)",
            SeverityCategory::AdvancedOrMetastatic => "Advanced Liver Cancer or Metastasis",
        }
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            SeverityCategory::NoTumor => "No Tumor",
            SeverityCategory::Benign => "Benign",
            SeverityCategory::EarlyStageCancer => "Early-Stage Cancer",
            SeverityCategory::AdvancedOrMetastatic => "Advanced/Metastatic",
        }
    }

    pub fn has_tumor(&self) -> bool {
        !matches!(self, SeverityCategory::NoTumor)
    }
}

/// 肿瘤体积分级 (cm³)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VolumeCategory {
    VerySmall,
    Small,
    Medium,
    Large,
}

impl VolumeCategory {
    pub fn label(&self) -> &'static str {
        match self {
            VolumeCategory::VerySmall => "Very Small (<0.1 cm³)",
            VolumeCategory::Small => "Small (0.1-1 cm³)",
            VolumeCategory::Medium => "Medium (1-30 cm³)",
            VolumeCategory::Large => "Large (>30 cm³)",
        }
    }
}

/// 分类器输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub category: SeverityCategory,
    pub area_percentage: f64,
    pub tumor_pixels: usize,
    pub total_pixels: usize,
    /// 肿瘤体积 (mm³)
    pub volume: f64,
    pub volume_category: VolumeCategory,
    pub description: String,
    pub treatment: String,
    pub causes: Vec<String>,
    pub prevention: Vec<String>,
}

impl DiagnosisResult {
    pub fn volume_cm3(&self) -> f64 {
        self.volume / 1000.0
    }
}
