//! # HepaScan Report
//!
//! 关系图表渲染、纯文本报告解析与 PDF 导出。

pub mod charts;
pub mod document;
pub mod pdf;

pub use charts::{relationship_charts, render_png, ChartKind, ChartSlice, ChartSpec};
pub use document::{parse_report_text, ReportDocument};
pub use pdf::{PdfExport, PdfExporter};
