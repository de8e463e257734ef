//! Web服务器

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use hepa_core::{HepaError, Result};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

use crate::handlers::{analyze, download_pdf, health, index_page};
use crate::state::AppState;

pub struct WebServer {
    addr: SocketAddr,
    state: AppState,
}

impl WebServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self { addr, state }
    }

    pub fn create_app(state: AppState) -> Router {
        let max_upload_bytes = state.config.server.max_upload_bytes;
        let static_dir = state.store.static_dir().to_path_buf();

        Router::new()
            // 上传表单与分析
            .route("/", get(index_page).post(analyze))

            // PDF 下载
            .route("/download_pdf", post(download_pdf))

            // 健康检查
            .route("/health", get(health))

            // 生成产物
            .nest_service("/static", ServeDir::new(static_dir))

            .with_state(state)

            // 全局中间件
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(
                        CorsLayer::new()
                            .allow_origin(Any)
                            .allow_methods(Any)
                            .allow_headers(Any),
                    )
                    .layer(DefaultBodyLimit::max(max_upload_bytes)),
            )
    }

    pub async fn run(self) -> Result<()> {
        self.state.store.init().await?;
        let app = Self::create_app(self.state);

        info!("Starting web server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, app)
            .await
            .map_err(|e| HepaError::Internal(format!("Failed to start web server: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use hepa_core::{HepaConfig, NormalizedImage, SegmentationMask};
    use hepa_imaging::SegmentationModel;
    use http_body_util::BodyExt;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use std::io::Cursor;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "hepascan-test-boundary";

    /// 前 `tumor_fraction` 比例的像素判为肿瘤
    struct StubModel {
        tumor_fraction: f32,
    }

    #[async_trait]
    impl SegmentationModel for StubModel {
        fn name(&self) -> &str {
            "stub"
        }

        fn input_size(&self) -> u32 {
            32
        }

        async fn predict(&self, image: &NormalizedImage) -> hepa_core::Result<SegmentationMask> {
            let total = image.pixels.len();
            let tumor = (total as f32 * self.tumor_fraction) as usize;
            let probabilities = (0..total).map(|i| if i < tumor { 0.9 } else { 0.1 }).collect();
            SegmentationMask::new(image.width, image.height, probabilities)
        }

        async fn probe(&self) -> hepa_core::Result<()> {
            Ok(())
        }
    }

    fn test_state(dir: &TempDir, tumor_fraction: f32) -> AppState {
        let mut config = HepaConfig::default();
        config.storage.uploads_dir = dir.path().join("uploads");
        config.storage.static_dir = dir.path().join("static");
        AppState::new(config, Arc::new(StubModel { tumor_fraction })).unwrap()
    }

    fn scan_png() -> Vec<u8> {
        let img = GrayImage::from_fn(48, 48, |x, y| Luma([((x + y) * 2) as u8]));
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn patient_fields() -> Vec<(&'static str, &'static str)> {
        vec![
            ("name", "Hana Youssef"),
            ("national_id", "28805051234567"),
            ("nationality", "Egyptian"),
            ("age", "66"),
            ("mobile_number", "01000000000"),
            ("gender", "Female"),
            ("chronic_diseases", "Hepatitis"),
            ("liver_enzymes", "72"),
            ("bilirubin", "1.9"),
            ("albumin", "3.1"),
            ("weight", "82"),
            ("height", "165"),
        ]
    }

    fn multipart_request(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        if let Some((filename, data)) = image {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                    BOUNDARY, filename
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri("/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn form_request(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, encode_form_value(v)))
            .collect::<Vec<_>>()
            .join("&");

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn encode_form_value(value: &str) -> String {
        value
            .bytes()
            .map(|b| match b {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    (b as char).to_string()
                }
                b' ' => "+".to_string(),
                _ => format!("%{:02X}", b),
            })
            .collect()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8_lossy(&bytes).to_string()
    }

    #[tokio::test]
    async fn test_index_page() {
        let dir = TempDir::new().unwrap();
        let app = WebServer::create_app(test_state(&dir, 0.0));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("multipart/form-data"));
    }

    #[tokio::test]
    async fn test_missing_image() {
        let dir = TempDir::new().unwrap();
        let app = WebServer::create_app(test_state(&dir, 0.0));

        let response = app.oneshot(multipart_request(&patient_fields(), None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "No image uploaded");
    }

    #[tokio::test]
    async fn test_empty_filename() {
        let dir = TempDir::new().unwrap();
        let app = WebServer::create_app(test_state(&dir, 0.0));

        let response = app
            .oneshot(multipart_request(&patient_fields(), Some(("", &b""[..]))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "No image selected");
    }

    #[tokio::test]
    async fn test_missing_text_field() {
        let dir = TempDir::new().unwrap();
        let app = WebServer::create_app(test_state(&dir, 0.0));
        let png = scan_png();
        let fields: Vec<_> = patient_fields().into_iter().filter(|(k, _)| *k != "age").collect();

        let response = app
            .oneshot(multipart_request(&fields, Some(("scan.png", png.as_slice()))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("age"));
    }

    #[tokio::test]
    async fn test_undecodable_image() {
        let dir = TempDir::new().unwrap();
        let app = WebServer::create_app(test_state(&dir, 0.0));

        let response = app
            .oneshot(multipart_request(&patient_fields(), Some(("scan.png", &b"not a png"[..]))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_upload_over_body_limit() {
        let dir = TempDir::new().unwrap();
        let mut config = HepaConfig::default();
        config.storage.uploads_dir = dir.path().join("uploads");
        config.storage.static_dir = dir.path().join("static");
        config.server.max_upload_bytes = 2048;
        let state = AppState::new(config, Arc::new(StubModel { tumor_fraction: 0.0 })).unwrap();
        let app = WebServer::create_app(state.clone());
        let oversized = vec![7u8; 8192];

        let response = app
            .oneshot(multipart_request(&patient_fields(), Some(("scan.png", oversized.as_slice()))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.store.list_analyses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_analysis_and_pdf_download() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, 0.2);
        let app = WebServer::create_app(state.clone());
        let png = scan_png();

        let response = app
            .clone()
            .oneshot(multipart_request(&patient_fields(), Some(("scan.png", png.as_slice()))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Early Stage Liver Cancer (HCC)"));

        let analyses = state.store.list_analyses().await.unwrap();
        assert_eq!(analyses.len(), 1);
        let id = &analyses[0];
        let analysis_dir = state.store.analysis_dir(id).unwrap();
        assert!(analysis_dir.join("visualization.png").exists());
        assert!(analysis_dir.join("report.json").exists());
        for index in 0..6 {
            assert!(analysis_dir.join(format!("diagram_{}.png", index)).exists());
        }
        assert!(html.contains("diagram_5.png"));
        assert!(dir.path().join("uploads").join(id).join("scan.png").exists());

        let response = app
            .clone()
            .oneshot(form_request(
                "/download_pdf",
                &[("report", ""), ("visualization", ""), ("analysis_id", id.as_str())],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("liver_report.pdf"));
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.starts_with(b"%PDF"));

        let visualization = app
            .oneshot(
                Request::builder()
                    .uri(format!("/static/analyses/{}/visualization.png", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(visualization.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_pdf_from_report_text() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir, 0.0);
        let app = WebServer::create_app(state.clone());

        let response = app
            .clone()
            .oneshot(multipart_request(&patient_fields(), Some(("scan.png", scan_png().as_slice()))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let id = state.store.list_analyses().await.unwrap().remove(0);
        let report: hepa_diagnosis::Report = state.store.load_report(&id).await.unwrap();
        let text = report.render_text().replace('\n', "\r\n");
        let visualization = format!("/static/analyses/{}/visualization.png", id);

        let response = app
            .clone()
            .oneshot(form_request(
                "/download_pdf",
                &[("report", text.as_str()), ("visualization", visualization.as_str())],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(form_request(
                "/download_pdf",
                &[("report", "Diagnosis: nothing"), ("visualization", visualization.as_str())],
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response)
            .await
            .starts_with("An error occurred while generating the PDF: "));
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let app = WebServer::create_app(test_state(&dir, 0.0));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["model"]["name"], "stub");
        assert_eq!(json["model"]["reachable"], true);
    }
}
