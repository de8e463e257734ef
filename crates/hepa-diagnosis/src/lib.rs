//! # HepaScan Diagnosis
//!
//! 分割结果的分级、临床说明文本以及叙述性报告的组装。

pub mod classifier;
pub mod composer;
pub mod knowledge;
pub mod policy;

pub use classifier::SeverityClassifier;
pub use composer::{
    ClinicalMeasures, Report, ReportComposer, RiskFactor, DEMOGRAPHIC_LABELS, RELATIONSHIPS_MARKER,
};
pub use policy::{AgeBracket, BmiBand, SeverityPolicy, VolumeRiskBracket};
