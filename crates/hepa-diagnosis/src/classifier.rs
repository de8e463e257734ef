//! 严重程度分类器

use crate::knowledge::guidance_for;
use crate::policy::SeverityPolicy;
use hepa_core::{BinaryMask, DiagnosisResult, SegmentationMask, VoxelSpacing};
use tracing::info;

/// 根据分割掩码给出诊断类别和体积估计
#[derive(Debug, Clone, Default)]
pub struct SeverityClassifier {
    policy: SeverityPolicy,
    spacing: VoxelSpacing,
}

impl SeverityClassifier {
    pub fn new(policy: SeverityPolicy, spacing: VoxelSpacing) -> Self {
        Self { policy, spacing }
    }

    pub fn policy(&self) -> &SeverityPolicy {
        &self.policy
    }

    pub fn binarize(&self, mask: &SegmentationMask) -> BinaryMask {
        mask.binarize(self.policy.binarization_threshold)
    }

    /// 肿瘤体积 (mm³) = 肿瘤像素数 × 单体素体积
    pub fn tumor_volume(&self, binary: &BinaryMask) -> f64 {
        binary.tumor_pixels() as f64 * self.spacing.voxel_volume()
    }

    pub fn classify(&self, mask: &SegmentationMask) -> DiagnosisResult {
        let binary = self.binarize(mask);
        let tumor_pixels = binary.tumor_pixels();
        let total_pixels = binary.total_pixels();
        let area_percentage = tumor_pixels as f64 * 100.0 / total_pixels as f64;
        let volume = self.tumor_volume(&binary);

        let category = self.policy.severity_for_area(area_percentage);
        let volume_category = self.policy.volume_category(volume / 1000.0);
        let guidance = guidance_for(category, volume);

        info!(
            "Classified mask: {}/{} tumor pixels ({:.2}%), volume {:.2} mm³ -> {:?} / {:?}",
            tumor_pixels, total_pixels, area_percentage, volume, category, volume_category
        );

        DiagnosisResult {
            category,
            area_percentage,
            tumor_pixels,
            total_pixels,
            volume,
            volume_category,
            description: guidance.description,
            treatment: guidance.treatment.to_string(),
            causes: guidance.causes.iter().map(|s| s.to_string()).collect(),
            prevention: guidance.prevention.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hepa_core::{SeverityCategory, VolumeCategory};

    /// 100×100 掩码，前 `tumor` 个像素概率为 0.9
    fn mask_with(tumor: usize) -> SegmentationMask {
        let probabilities = (0..10_000).map(|i| if i < tumor { 0.9 } else { 0.1 }).collect();
        SegmentationMask::new(100, 100, probabilities).unwrap()
    }

    #[test]
    fn test_volume_counts_binarized_pixels() {
        let result = SeverityClassifier::default().classify(&mask_with(100));

        assert_eq!(result.tumor_pixels, 100);
        assert_eq!(result.volume, 100.0);
        assert!((result.area_percentage - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_boundaries_land_in_upper_band() {
        let classifier = SeverityClassifier::default();

        assert_eq!(classifier.classify(&mask_with(99)).category, SeverityCategory::NoTumor);
        assert_eq!(classifier.classify(&mask_with(100)).category, SeverityCategory::Benign);
        assert_eq!(classifier.classify(&mask_with(1_000)).category, SeverityCategory::EarlyStageCancer);
        assert_eq!(classifier.classify(&mask_with(3_000)).category, SeverityCategory::AdvancedOrMetastatic);
    }

    #[test]
    fn test_volume_category_uses_cm3() {
        let classifier = SeverityClassifier::default();

        // 3000 mm³ = 3 cm³
        assert_eq!(classifier.classify(&mask_with(3_000)).volume_category, VolumeCategory::Medium);
        // 50 mm³ = 0.05 cm³
        assert_eq!(classifier.classify(&mask_with(50)).volume_category, VolumeCategory::VerySmall);
    }

    #[test]
    fn test_voxel_spacing_scales_volume() {
        let spacing = VoxelSpacing { x: 0.5, y: 0.5, z: 4.0 };
        let classifier = SeverityClassifier::new(SeverityPolicy::default(), spacing);

        let result = classifier.classify(&mask_with(200));
        assert_eq!(result.volume, 200.0);
        assert_eq!(result.category, SeverityCategory::Benign);
    }

    #[test]
    fn test_guidance_attached() {
        let result = SeverityClassifier::default().classify(&mask_with(0));
        assert_eq!(result.category.title(), "No Tumor Detected");
        assert_eq!(result.causes.len(), 6);
    }
}
