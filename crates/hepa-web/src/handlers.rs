//! HTTP处理器

use crate::analysis::{run_analysis, UploadedImage};
use crate::error::{AppError, PdfError};
use crate::state::AppState;
use crate::templates::ResultView;
use axum::{
    extract::{Form, Multipart, State},
    http::header,
    response::{Html, IntoResponse, Json, Response},
};
use hepa_core::{HepaError, PatientRecord, Result};
use hepa_diagnosis::Report;
use hepa_report::{parse_report_text, ReportDocument};
use hepa_storage::{PDF_FILE, VISUALIZATION_FILE};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// 上传表单
pub async fn index_page(State(state): State<AppState>) -> std::result::Result<Html<String>, AppError> {
    Ok(Html(state.pages.index()?))
}

/// 解析后的表单提交
struct Submission {
    patient: PatientRecord,
    image: UploadedImage,
}

async fn read_submission(mut multipart: Multipart) -> Result<Submission> {
    let mut patient = PatientRecord::default();
    let mut seen = HashSet::new();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| HepaError::Validation(format!("Malformed form data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| HepaError::Validation(format!("Failed to read upload: {}", e)))?;
            image = Some(UploadedImage {
                filename,
                data: data.to_vec(),
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| HepaError::Validation(format!("Failed to read field {}: {}", name, e)))?;
        if patient.set_field(&name, value) {
            seen.insert(name);
        }
    }

    if let Some(missing) = PatientRecord::FORM_FIELDS.iter().find(|f| !seen.contains(**f)) {
        return Err(HepaError::MissingField(missing.to_string()));
    }

    let image = image.ok_or_else(|| HepaError::MissingUpload("No image uploaded".to_string()))?;
    if image.filename.is_empty() {
        return Err(HepaError::MissingUpload("No image selected".to_string()));
    }

    Ok(Submission { patient, image })
}

/// 提交分析
pub async fn analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> std::result::Result<Html<String>, AppError> {
    let submission = read_submission(multipart).await?;
    let outcome = run_analysis(&state, submission.patient, submission.image).await?;

    let view = ResultView::new(&outcome.report, &outcome.visualization_url, &outcome.diagram_urls);
    Ok(Html(state.pages.result(&view)?))
}

fn required<'a>(form: &'a HashMap<String, String>, field: &str) -> Result<&'a str> {
    form.get(field)
        .map(String::as_str)
        .ok_or_else(|| HepaError::MissingField(field.to_string()))
}

/// 下载 PDF 报告
///
/// 表单带 `analysis_id` 时读取已保存的结构化报告；否则按行序解析 `report` 文本，
/// 并从 `visualization` 指向的 static 文件读取可视化图像。
pub async fn download_pdf(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> std::result::Result<Response, PdfError> {
    let analysis_id = form
        .get("analysis_id")
        .map(|id| id.trim())
        .filter(|id| !id.is_empty());

    let (document, visualization) = match analysis_id {
        Some(id) => {
            let report: Report = state.store.load_report(id).await?;
            let visualization = state.store.read_artifact(id, VISUALIZATION_FILE).await?;
            (ReportDocument::from(&report), visualization)
        }
        None => {
            let document = parse_report_text(required(&form, "report")?)?;
            let path = state
                .store
                .resolve_static_path(required(&form, "visualization")?)
                .await?;
            (document, tokio::fs::read(&path).await.map_err(HepaError::from)?)
        }
    };

    let exporter = state.exporter.clone();
    let export = tokio::task::spawn_blocking(move || exporter.export(&document, &visualization))
        .await
        .map_err(|e| HepaError::Internal(format!("PDF task failed: {}", e)))??;

    if let Some(id) = analysis_id {
        if let Err(e) = state.store.write_pdf(id, &export.bytes).await {
            warn!("Failed to keep PDF for analysis {}: {}", id, e);
        }
    }
    info!("Generated PDF report ({} pages)", export.pages);

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", PDF_FILE),
            ),
        ],
        export.bytes,
    )
        .into_response())
}

/// 健康检查处理器
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let reachable = match state.model.probe().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Model probe failed: {}", e);
            false
        }
    };

    let status = if reachable { "healthy" } else { "degraded" };

    Json(json!({
        "status": status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "model": {
            "name": state.model.name(),
            "reachable": reachable
        }
    }))
}
