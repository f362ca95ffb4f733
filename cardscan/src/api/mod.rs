mod extractors;
mod frontend;
pub mod handlers;
pub mod openapi;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::handlers::ocr::MAX_FILE_SIZE;
    use super::{create_router, AppState};
    use crate::auth::SessionVerifier;
    use crate::config::{AuthConfig, Config, LocaleConfig};
    use crate::error::{CardscanError, Result};
    use crate::ocr::{OcrProvider, TextDetector};

    const BOUNDARY: &str = "cardscan-test-boundary";

    struct FakeDetector {
        text: Option<&'static str>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeDetector {
        fn returning(text: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                text,
                fail: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                text: None,
                fail: true,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextDetector for FakeDetector {
        async fn detect_text(&self, _image_bytes: &[u8]) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CardscanError::Vision("UNAVAILABLE: backend".to_string()));
            }
            Ok(self.text.map(String::from))
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.server.body_limit_bytes = 10 * 1024 * 1024;
        config.server.static_dir = None;
        config.locale = LocaleConfig::default();
        config.auth = AuthConfig::default();
        config
    }

    fn test_state(ocr: OcrProvider) -> AppState {
        let config = test_config();
        let sessions = SessionVerifier::new(&config.auth);
        AppState::new(config, ocr, sessions)
    }

    fn multipart_body(field: &str, content_type: Option<&str>, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"card.png\"\r\n")
                .as_bytes(),
        );
        if let Some(ct) = content_type {
            body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_extracts_text_from_image() {
        let detector = FakeDetector::returning(Some("INVOICE #123"));
        let app = create_router(test_state(OcrProvider::with_detector(detector.clone())));

        let body = multipart_body("image", Some("image/png"), b"\x89PNG fake");
        let response = app.oneshot(upload("/api/ocr", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({ "text": "INVOICE #123" }));
        assert_eq!(detector.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_annotation_returns_sentinel() {
        let app = create_router(test_state(OcrProvider::with_detector(
            FakeDetector::returning(None),
        )));

        let body = multipart_body("image", Some("image/jpeg"), b"jpeg bytes");
        let response = app.oneshot(upload("/api/ocr", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["text"], "No text found.");
    }

    #[tokio::test]
    async fn test_missing_image_field_is_rejected() {
        let detector = FakeDetector::returning(Some("x"));
        let app = create_router(test_state(OcrProvider::with_detector(detector.clone())));

        let body = multipart_body("file", Some("image/png"), b"data");
        let response = app.oneshot(upload("/api/ocr", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "No image file provided.");
        assert_eq!(detector.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_image_type_is_rejected() {
        let detector = FakeDetector::returning(Some("x"));
        let app = create_router(test_state(OcrProvider::with_detector(detector.clone())));

        let body = multipart_body("image", Some("application/pdf"), b"%PDF-1.7");
        let response = app.oneshot(upload("/api/ocr", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Only image files are allowed.");
        assert_eq!(detector.calls(), 0);
    }

    #[tokio::test]
    async fn test_image_without_declared_type_is_rejected() {
        let app = create_router(test_state(OcrProvider::with_detector(
            FakeDetector::returning(Some("x")),
        )));

        let body = multipart_body("image", None, b"data");
        let response = app.oneshot(upload("/api/ocr", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_declared_type_is_case_insensitive() {
        let app = create_router(test_state(OcrProvider::with_detector(
            FakeDetector::returning(Some("ok")),
        )));

        let body = multipart_body("image", Some("IMAGE/PNG"), b"data");
        let response = app.oneshot(upload("/api/ocr", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_oversized_image_is_rejected() {
        let detector = FakeDetector::returning(Some("x"));
        let app = create_router(test_state(OcrProvider::with_detector(detector.clone())));

        let data = vec![0u8; MAX_FILE_SIZE + 1];
        let body = multipart_body("image", Some("image/png"), &data);
        let response = app.oneshot(upload("/api/ocr", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "File size exceeds 4MB.");
        assert_eq!(detector.calls(), 0);
    }

    #[tokio::test]
    async fn test_body_over_request_limit_is_too_large() {
        let detector = FakeDetector::returning(Some("x"));
        let state = test_state(OcrProvider::with_detector(detector.clone()));
        let limit = state.config.server.body_limit_bytes;
        let app = create_router(state);

        // Sent as a single frame, so the limit trips before any field is parsed.
        let data = vec![0u8; limit + 2 * 1024 * 1024];
        let body = multipart_body("image", Some("image/png"), &data);
        let response = app.oneshot(upload("/api/ocr", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "File size exceeds 4MB.");
        assert_eq!(detector.calls(), 0);
    }

    #[tokio::test]
    async fn test_image_at_exact_limit_is_accepted() {
        let app = create_router(test_state(OcrProvider::with_detector(
            FakeDetector::returning(Some("edge")),
        )));

        let data = vec![0u8; MAX_FILE_SIZE];
        let body = multipart_body("image", Some("image/png"), &data);
        let response = app.oneshot(upload("/api/ocr", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_provider_failure_is_generic_500() {
        let detector = FakeDetector::failing();
        let app = create_router(test_state(OcrProvider::with_detector(detector.clone())));

        let body = multipart_body("image", Some("image/png"), b"data");
        let response = app.oneshot(upload("/api/ocr", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "OCR processing failed.");
        assert_eq!(detector.calls(), 1, "failures are not retried");
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_processing_failure() {
        let app = create_router(test_state(OcrProvider::with_detector(
            FakeDetector::returning(Some("x")),
        )));

        let request = Request::builder()
            .method("POST")
            .uri("/api/ocr")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "OCR processing failed.");
    }

    #[tokio::test]
    async fn test_unconfigured_post_returns_500_without_reading_body() {
        let app = create_router(test_state(OcrProvider::unavailable("no key")));

        let body = multipart_body("image", Some("image/png"), b"data");
        let response = app.oneshot(upload("/api/ocr", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await["error"],
            "Google Cloud credentials not found."
        );
    }

    #[tokio::test]
    async fn test_unconfigured_post_wins_over_validation() {
        let app = create_router(test_state(OcrProvider::unavailable("no key")));

        let body = multipart_body("other", Some("text/plain"), b"data");
        let response = app.oneshot(upload("/api/ocr", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_probe_reports_configuration() {
        let app = create_router(test_state(OcrProvider::unavailable("no key")));
        let response = app
            .oneshot(Request::builder().uri("/api/ocr").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["message"], "OCR API is not configured.");

        let app = create_router(test_state(OcrProvider::with_detector(
            FakeDetector::returning(None),
        )));
        let response = app
            .oneshot(Request::builder().uri("/api/ocr").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "OCR API is working.");
    }

    #[tokio::test]
    async fn test_delay_query_holds_response() {
        let app = create_router(test_state(OcrProvider::with_detector(
            FakeDetector::returning(Some("slow")),
        )));

        let started = std::time::Instant::now();
        let body = multipart_body("image", Some("image/png"), b"data");
        let response = app
            .oneshot(upload("/api/ocr?delay=50", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(started.elapsed() >= std::time::Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_non_numeric_delay_is_ignored() {
        let app = create_router(test_state(OcrProvider::with_detector(
            FakeDetector::returning(Some("fast")),
        )));

        let body = multipart_body("image", Some("image/png"), b"data");
        let response = app
            .oneshot(upload("/api/ocr?delay=later", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["text"], "fast");
    }

    #[tokio::test]
    async fn test_api_routes_skip_locale_and_auth() {
        let app = create_router(test_state(OcrProvider::unavailable("no key")));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/anything")
                    .header(header::ACCEPT_LANGUAGE, "fr")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::LOCATION).is_none());
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_dashboard_redirects_through_full_router() {
        let app = create_router(test_state(OcrProvider::unavailable("no key")));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/fr/dashboard")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/fr/sign-in");
    }

    #[tokio::test]
    async fn test_openapi_json_is_served() {
        let app = create_router(test_state(OcrProvider::unavailable("no key")));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["openapi"].as_str().unwrap().starts_with('3'));
        assert!(json["paths"]["/api/ocr"]["post"].is_object());
        assert!(json["paths"]["/api/ocr"]["get"].is_object());
    }
}
