//! 分割模型接口
//!
//! 模型本身是外部训练好的产物，这里只定义调用契约：
//! 归一化影像 (1, H, W, 1) → 同分辨率的逐像素肿瘤概率。
//! 生产环境通过 TensorFlow Serving 的 REST 接口调用。

use async_trait::async_trait;
use hepa_core::config::ModelConfig;
use hepa_core::{HepaError, NormalizedImage, Result, SegmentationMask};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 分割模型接口
#[async_trait]
pub trait SegmentationModel: Send + Sync {
    /// 模型名称
    fn name(&self) -> &str;

    /// 模型输入边长
    fn input_size(&self) -> u32;

    /// 推理，返回与输入同分辨率的概率掩码
    async fn predict(&self, image: &NormalizedImage) -> Result<SegmentationMask>;

    /// 检查模型是否可用
    async fn probe(&self) -> Result<()>;
}

/// TensorFlow Serving 预测响应
#[derive(Debug, Deserialize)]
struct PredictResponse {
    predictions: Vec<Value>,
}

/// 基于 TensorFlow Serving REST API 的分割模型
pub struct TfServingModel {
    client: reqwest::Client,
    endpoint: String,
    name: String,
    input_size: u32,
}

impl TfServingModel {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| HepaError::Model(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            name: config.name.clone(),
            input_size: config.input_size,
        })
    }

    fn model_url(&self) -> String {
        format!("{}/v1/models/{}", self.endpoint, self.name)
    }

    /// 构造请求体：instances 中每个实例为 H×W×1 嵌套数组
    fn request_body(image: &NormalizedImage) -> Value {
        let rows: Vec<Vec<[f32; 1]>> = image
            .pixels
            .chunks(image.width as usize)
            .map(|row| row.iter().map(|v| [*v]).collect())
            .collect();

        json!({ "instances": [rows] })
    }
}

#[async_trait]
impl SegmentationModel for TfServingModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }

    async fn predict(&self, image: &NormalizedImage) -> Result<SegmentationMask> {
        let url = format!("{}:predict", self.model_url());
        let started = Instant::now();

        let response = self
            .client
            .post(&url)
            .json(&Self::request_body(image))
            .send()
            .await
            .map_err(|e| HepaError::Model(format!("Prediction request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HepaError::Model(format!(
                "Model server returned {}: {}",
                status, body
            )));
        }

        let payload: PredictResponse = response
            .json()
            .await
            .map_err(|e| HepaError::Model(format!("Invalid prediction payload: {}", e)))?;

        let first = payload
            .predictions
            .first()
            .ok_or_else(|| HepaError::Model("Empty predictions".to_string()))?;

        let mut probabilities = Vec::with_capacity(image.pixels.len());
        flatten_numbers(first, &mut probabilities)?;

        debug!(
            "Model {} answered {} values in {:?}",
            self.name,
            probabilities.len(),
            started.elapsed()
        );

        SegmentationMask::new(image.width, image.height, probabilities)
    }

    async fn probe(&self) -> Result<()> {
        let response = self
            .client
            .get(self.model_url())
            .send()
            .await
            .map_err(|e| HepaError::Model(format!("Model server unreachable: {}", e)))?;

        if response.status().is_success() {
            info!("Segmentation model {} is available", self.name);
            Ok(())
        } else {
            warn!("Segmentation model {} status check returned {}", self.name, response.status());
            Err(HepaError::Model(format!(
                "Model status check returned {}",
                response.status()
            )))
        }
    }
}

/// 将任意嵌套的数值数组按行优先展开
///
/// 接受 H×W×1 或 H×W 两种输出形状。
pub fn flatten_numbers(value: &Value, out: &mut Vec<f32>) -> Result<()> {
    match value {
        Value::Number(n) => {
            let v = n
                .as_f64()
                .ok_or_else(|| HepaError::Model(format!("Non-numeric prediction {}", n)))?;
            out.push(v as f32);
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(|item| flatten_numbers(item, out)),
        other => Err(HepaError::Model(format!("Unexpected prediction element: {}", other))),
    }
}
