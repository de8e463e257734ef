//! # HepaScan Core
//!
//! 肝脏肿瘤筛查系统的核心模块，提供基础数据结构、错误定义、配置和通用工具。

pub mod config;
pub mod error;
pub mod models;
pub mod utils;

pub use config::HepaConfig;
pub use error::{HepaError, Result};
pub use models::*;
