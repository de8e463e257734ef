//! # HepaScan Imaging
//!
//! 影像输入处理：解码与归一化、分割模型调用、分割结果可视化。

pub mod model;
pub mod normalizer;
pub mod visualization;

pub use model::{SegmentationModel, TfServingModel};
pub use normalizer::ImageNormalizer;
pub use visualization::{build_composite, encode_png};
