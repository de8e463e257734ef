//! HTTP 错误映射

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hepa_core::HepaError;
use tracing::{error, warn};

/// 分析流程中的错误，按类别映射状态码，响应体为纯文本
#[derive(Debug)]
pub struct AppError(pub HepaError);

impl From<HepaError> for AppError {
    fn from(err: HepaError) -> Self {
        Self(err)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            HepaError::MissingUpload(_)
            | HepaError::MissingField(_)
            | HepaError::Validation(_) => StatusCode::BAD_REQUEST,
            HepaError::InvalidImage(_) => StatusCode::UNPROCESSABLE_ENTITY,
            HepaError::Model(_) | HepaError::MaskShape { .. } => StatusCode::BAD_GATEWAY,
            HepaError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Analysis failed: {}", self.0);
        } else {
            warn!("Rejected request: {}", self.0);
        }

        (status, self.0.to_string()).into_response()
    }
}

/// PDF 下载路径上的任何错误都返回 500
#[derive(Debug)]
pub struct PdfError(pub HepaError);

impl From<HepaError> for PdfError {
    fn from(err: HepaError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PdfError {
    fn into_response(self) -> Response {
        error!("PDF generation failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("An error occurred while generating the PDF: {}", self.0),
        )
            .into_response()
    }
}
