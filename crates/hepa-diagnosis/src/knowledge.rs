//! 各诊断类别的临床说明文本

use hepa_core::SeverityCategory;

/// 单个类别的说明
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicalGuidance {
    pub description: String,
    pub treatment: &'static str,
    pub causes: &'static [&'static str],
    pub prevention: &'static [&'static str],
}

const NO_TUMOR_CAUSES: &[&str] = &[
    "Chronic Viral Hepatitis (B/C): Leading cause worldwide",
    "Alcohol Abuse: Long-term excessive consumption",
    "Non-Alcoholic Fatty Liver Disease (NAFLD): Associated with obesity/diabetes",
    "Aflatoxin Exposure: From contaminated foods",
    "Genetic Factors: Family history increases risk",
    "Metabolic Disorders: Hemochromatosis, Wilson's disease",
];

const NO_TUMOR_PREVENTION: &[&str] = &[
    "Vaccination: Hepatitis B vaccine for all",
    "Alcohol Moderation: Limit to recommended levels",
    "Healthy Diet: Mediterranean diet recommended",
    "Regular Exercise: 150+ minutes/week",
    "Screening: For high-risk individuals",
    "Toxin Avoidance: Proper food storage",
];

const BENIGN_CAUSES: &[&str] = &[
    "Often congenital (present from birth)",
    "Hormonal factors (particularly oral contraceptive use in hepatic adenomas)",
    "Vascular malformations",
    "Unknown causes in many cases",
];

const BENIGN_PREVENTION: &[&str] = &[
    "Limit hormone medications when possible",
    "Regular medical checkups for those with known benign tumors",
    "Avoid unnecessary medications",
    "Maintain healthy lifestyle",
];

const EARLY_STAGE_CAUSES: &[&str] = &[
    "Chronic liver disease (cirrhosis) from hepatitis B/C",
    "Alcohol-related liver disease",
    "NAFLD/NASH (non-alcoholic steatohepatitis)",
    "Genetic predisposition",
    "Environmental toxins (aflatoxins)",
];

const EARLY_STAGE_PREVENTION: &[&str] = &[
    "Vaccination against hepatitis B",
    "Treatment of chronic hepatitis C",
    "Management of fatty liver disease",
    "Alcohol moderation",
    "Regular screening for high-risk patients",
];

const ADVANCED_CAUSES: &[&str] = &[
    "Advanced chronic liver disease",
    "Untreated viral hepatitis",
    "Environmental carcinogens (aflatoxins)",
    "Metastatic spread from other cancers",
    "Long-term alcohol abuse",
];

const ADVANCED_PREVENTION: &[&str] = &[
    "Early detection through regular screening in high-risk patients",
    "Management of underlying liver disease",
    "Avoidance of known risk factors",
    "Healthy lifestyle choices",
    "Regular medical follow-ups",
];

/// 肿瘤患者的附加建议
pub const ADDITIONAL_RECOMMENDATIONS: &[&str] = &[
    "Avoid alcohol completely",
    "Maintain healthy weight",
    "Get vaccinated against hepatitis A and B if not already immune",
    "Monitor liver function regularly",
    "Follow a liver-friendly diet (low fat, moderate protein)",
    "Stay hydrated",
    "Avoid unnecessary medications that can stress the liver",
];

/// 获取类别说明，描述中嵌入体积估计 (mm³)
pub fn guidance_for(category: SeverityCategory, volume: f64) -> ClinicalGuidance {
    let volume_cm3 = volume / 1000.0;

    match category {
        SeverityCategory::NoTumor => ClinicalGuidance {
            description: "No significant tumor was detected in the liver scan.".to_string(),
            treatment: "No specific treatment needed. Regular checkups recommended.",
            causes: NO_TUMOR_CAUSES,
            prevention: NO_TUMOR_PREVENTION,
        },
        SeverityCategory::Benign => ClinicalGuidance {
            description: format!(
                "Small benign tumor detected (Volume: {:.2} mm³). These are usually non-cancerous and don't spread. \
                 Common types include hemangiomas, focal nodular hyperplasia (FNH), and hepatic adenomas.",
                volume
            ),
            treatment: "Monitoring with regular imaging. Treatment usually not needed unless symptoms develop. \
                        Surgical removal may be considered for large or symptomatic tumors.",
            causes: BENIGN_CAUSES,
            prevention: BENIGN_PREVENTION,
        },
        SeverityCategory::EarlyStageCancer => ClinicalGuidance {
            description: format!(
                "Moderate-sized tumor detected (Volume: {:.2} mm³, ~{:.1} cm³). This may indicate early-stage \
                 hepatocellular carcinoma (HCC), the most common type of primary liver cancer.",
                volume, volume_cm3
            ),
            treatment: "Surgical options include resection or liver transplant. Localized treatments like \
                        radiofrequency ablation or TACE (transarterial chemoembolization) may be options. \
                        Systemic therapies like sorafenib may be considered.",
            causes: EARLY_STAGE_CAUSES,
            prevention: EARLY_STAGE_PREVENTION,
        },
        SeverityCategory::AdvancedOrMetastatic => ClinicalGuidance {
            description: format!(
                "Large tumor detected (Volume: {:.2} mm³, ~{:.1} cm³), possibly indicating advanced liver cancer \
                 or metastasis from other organs. This may include HCC, cholangiocarcinoma, or metastatic tumors \
                 from colon, breast or other cancers.",
                volume, volume_cm3
            ),
            treatment: "Multidisciplinary approach including systemic therapy (chemotherapy, targeted therapy, \
                        immunotherapy), radiation (SBRT), or palliative care depending on stage. Clinical trials \
                        may be an option.",
            causes: ADVANCED_CAUSES,
            prevention: ADVANCED_PREVENTION,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_embeds_volume() {
        let guidance = guidance_for(SeverityCategory::EarlyStageCancer, 12345.0);
        assert!(guidance.description.contains("12345.00 mm³"));
        assert!(guidance.description.contains("~12.3 cm³"));
    }

    #[test]
    fn test_texts_are_single_line() {
        for category in [
            SeverityCategory::NoTumor,
            SeverityCategory::Benign,
            SeverityCategory::EarlyStageCancer,
            SeverityCategory::AdvancedOrMetastatic,
        ] {
            let guidance = guidance_for(category, 100.0);
            assert!(!guidance.description.contains('\n'));
            assert!(!guidance.treatment.contains('\n'));
            assert!(!guidance.causes.is_empty());
            assert!(!guidance.prevention.is_empty());
        }
    }
}
