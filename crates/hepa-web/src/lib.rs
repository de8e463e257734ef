//! # HepaScan Web
//!
//! 上传表单、分析流程、PDF 下载与健康检查的 HTTP 服务。

pub mod analysis;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;
pub mod templates;

pub use server::WebServer;
pub use state::AppState;
