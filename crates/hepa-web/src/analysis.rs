//! 分析流程
//!
//! 保存上传 → 解码归一化 → 模型分割 → 分级 → 报告 → 可视化与关系图 → 落盘。
//! 解码、绘图等 CPU 密集步骤放到阻塞线程池执行。

use crate::state::AppState;
use hepa_core::utils::generate_analysis_id;
use hepa_core::{HepaError, PatientRecord, Result};
use hepa_diagnosis::Report;
use hepa_imaging::{build_composite, encode_png, ImageNormalizer};
use hepa_report::{relationship_charts, render_png};
use tracing::{info, warn};

/// 上传的影像
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: String,
    pub data: Vec<u8>,
}

/// 一次分析的结果
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub report: Report,
    pub visualization_url: String,
    pub diagram_urls: Vec<String>,
}

async fn blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| HepaError::Internal(format!("Blocking task failed: {}", e)))?
}

/// 执行完整分析
pub async fn run_analysis(
    state: &AppState,
    patient: PatientRecord,
    upload: UploadedImage,
) -> Result<AnalysisOutcome> {
    let analysis_id = generate_analysis_id();
    info!("Starting analysis {} for upload {}", analysis_id, upload.filename);

    state
        .store
        .save_upload(&analysis_id, &upload.filename, &upload.data)
        .await?;

    let normalizer = state.normalizer;
    let (original, normalized) = blocking(move || {
        let original = ImageNormalizer::decode(&upload.data)?;
        let normalized = normalizer.normalize(&original);
        Ok((original, normalized))
    })
    .await?;

    let mask = state.model.predict(&normalized).await?;
    let binary = state.classifier.binarize(&mask);
    let diagnosis = state.classifier.classify(&mask);
    let report = state.composer.compose(analysis_id.clone(), patient, diagnosis);

    let charts = relationship_charts(&report, state.policy());
    let (visualization_png, diagrams) = blocking(move || {
        let composite = build_composite(&original, &binary)?;
        let png = encode_png(&composite)?;

        let diagrams: Vec<(usize, Vec<u8>)> = charts
            .iter()
            .enumerate()
            .filter_map(|(index, spec)| match render_png(spec) {
                Ok(bytes) => Some((index, bytes)),
                Err(e) => {
                    warn!("Skipping diagram \"{}\": {}", spec.title, e);
                    None
                }
            })
            .collect();

        Ok((png, diagrams))
    })
    .await?;

    let visualization_url = state
        .store
        .write_visualization(&analysis_id, &visualization_png)
        .await?;

    let mut diagram_urls = Vec::with_capacity(diagrams.len());
    for (index, png) in &diagrams {
        diagram_urls.push(state.store.write_diagram(&analysis_id, *index, png).await?);
    }

    state.store.save_report(&analysis_id, &report).await?;

    if let Err(e) = state.store.prune().await {
        warn!("Failed to prune old analyses: {}", e);
    }

    info!(
        "Analysis {} complete: {} ({:.2}% of slice, {:.2} mm³)",
        analysis_id,
        report.diagnosis.category.short_label(),
        report.diagnosis.area_percentage,
        report.diagnosis.volume
    );

    Ok(AnalysisOutcome {
        report,
        visualization_url,
        diagram_urls,
    })
}
