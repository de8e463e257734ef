//! 共享应用状态

use crate::templates::PageRenderer;
use hepa_core::{HepaConfig, Result};
use hepa_diagnosis::{ReportComposer, SeverityClassifier, SeverityPolicy};
use hepa_imaging::{ImageNormalizer, SegmentationModel};
use hepa_report::PdfExporter;
use hepa_storage::ArtifactStore;
use std::sync::Arc;

/// 所有处理器共享的只读状态
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<HepaConfig>,
    pub model: Arc<dyn SegmentationModel>,
    pub normalizer: ImageNormalizer,
    pub classifier: Arc<SeverityClassifier>,
    pub composer: Arc<ReportComposer>,
    pub exporter: Arc<PdfExporter>,
    pub store: ArtifactStore,
    pub pages: Arc<PageRenderer>,
}

impl AppState {
    pub fn new(config: HepaConfig, model: Arc<dyn SegmentationModel>) -> Result<Self> {
        let policy = SeverityPolicy::default();

        Ok(Self {
            normalizer: ImageNormalizer::new(model.input_size()),
            classifier: Arc::new(SeverityClassifier::new(
                policy.clone(),
                config.imaging.voxel_spacing,
            )),
            composer: Arc::new(ReportComposer::new(policy)),
            exporter: Arc::new(PdfExporter::default()),
            store: ArtifactStore::new(&config.storage),
            pages: Arc::new(PageRenderer::new()?),
            config: Arc::new(config),
            model,
        })
    }

    pub fn policy(&self) -> &SeverityPolicy {
        self.classifier.policy()
    }
}
