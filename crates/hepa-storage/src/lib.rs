//! # HepaScan存储模块
//!
//! 按分析ID隔离的上传文件与生成产物存储，以及旧分析的清理。

pub mod artifacts;
pub mod retention;

pub use artifacts::*;
