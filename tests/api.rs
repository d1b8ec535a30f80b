// tests/api.rs - HTTP handlers against in-memory models
mod common;

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use form_compare::api::{create_router, AppState, DetectorFactory};
use form_compare::models::{LinearModel, RecipeCatalog};
use form_compare::storage::{ArtifactUploader, S3Uploader, StorageResult};
use form_compare::{AnalysisConfig, AnalysisError, AnalysisResult, FfmpegBackend, PoseDetector, ServiceConfig};

use common::{MarkerDetector, ScriptBackend};

fn service_config(work_root: &std::path::Path) -> ServiceConfig {
    ServiceConfig {
        host: "127.0.0.1".into(),
        port: 0,
        work_root: work_root.to_path_buf(),
        pose_helper: vec!["pose-helper".into()],
        s3_bucket: "bucket".into(),
        s3_region: "us-east-1".into(),
        s3_endpoint: None,
        s3_access_key_id: Some("id".into()),
        s3_secret_access_key: Some("secret".into()),
        public_base_url: "https://bucket.example.com".into(),
        meal_plan_model: "unused.json".into(),
        exercise_model: "unused.json".into(),
        recipes_csv: "unused.csv".into(),
        cors_origins: vec!["*".into()],
        analysis: AnalysisConfig {
            chart_width: 320,
            chart_height: 240,
            ..AnalysisConfig::default()
        },
    }
}

fn state(work_root: &std::path::Path) -> AppState {
    let meal_plan_model = LinearModel {
        intercept: 600.0,
        weights: [("gender_M".to_string(), 300.0)].into_iter().collect(),
        integer_output: false,
    };
    let exercise_model = LinearModel {
        intercept: 2.0,
        weights: [("Exercise_Exercise 10".to_string(), 3.0)].into_iter().collect(),
        integer_output: true,
    };
    let recipes = RecipeCatalog::from_reader(
        "name,calories,protein\nToast,150,5\nPasta,700,20\nEggs,210,13\nRice,280.5,4\n".as_bytes(),
    )
    .unwrap();

    let s3_config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(Credentials::new("id", "secret", None, None, "test"))
        .build();
    let detector_factory: DetectorFactory = Arc::new(|| -> AnalysisResult<Box<dyn PoseDetector + Send>> {
        Err(AnalysisError::detector("no pose helper in tests"))
    });

    AppState {
        config: Arc::new(service_config(work_root)),
        meal_plan_model: Arc::new(meal_plan_model),
        exercise_model: Arc::new(exercise_model),
        recipes: Arc::new(recipes),
        uploader: Arc::new(S3Uploader::new(
            aws_sdk_s3::Client::from_conf(s3_config),
            "bucket",
            "https://bucket.example.com",
        )),
        http: reqwest::Client::new(),
        video_backend: Arc::new(FfmpegBackend::default()),
        detector_factory,
    }
}

/// Remembers every key it was handed and the size of the file behind it.
#[derive(Default)]
struct RecordingUploader {
    uploads: Mutex<Vec<(String, u64)>>,
}

#[async_trait]
impl ArtifactUploader for RecordingUploader {
    async fn upload_file(&self, path: &Path, key: &str) -> StorageResult<String> {
        let size = std::fs::metadata(path).unwrap().len();
        self.uploads.lock().unwrap().push((key.to_string(), size));
        Ok(format!("https://cdn.test/{}", key))
    }
}

/// Serve `routes` on an ephemeral local port and return its base URL.
async fn serve(routes: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, routes).await.unwrap() });
    format!("http://{}", addr)
}

async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn meal_plan_body(gender: &str, meals: i64, options: usize) -> Value {
    json!({
        "age": 25,
        "weight": 70.0,
        "height": 1.75,
        "bmi": 21.3,
        "bmr": 1384.1,
        "activity_level": 1.5,
        "gender": gender,
        "number_of_meals": meals,
        "number_of_options": options
    })
}

#[tokio::test]
async fn health_reports_healthy() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(state(dir.path()));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn meal_plan_suggests_recipes_below_the_per_meal_budget() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(state(dir.path()));

    let (status, body) = post_json(app, "/fitness-project/get-meal-plan", meal_plan_body("M", 3, 10)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_calories"], json!(900.0));
    assert_eq!(body["calories_per_meal"], json!(300.0));
    let names: Vec<&str> = body["suggested"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Toast", "Eggs", "Rice"]);
    assert_eq!(body["suggested"][0]["calories"], json!(150));
}

#[tokio::test]
async fn meal_plan_rejects_zero_meals() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(state(dir.path()));

    let (status, body) = post_json(app, "/fitness-project/get-meal-plan", meal_plan_body("F", 0, 3)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn exercise_intensity_lists_every_exercise() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(state(dir.path()));

    let (status, body) = post_json(
        app,
        "/fitness-project/get-exercise-intensity",
        json!({
            "actual_weight": 80.0,
            "age": 30,
            "gender": "Male",
            "duration": 40,
            "bmi": 24.0,
            "height": 1.8
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let levels = body.as_array().unwrap();
    assert_eq!(levels.len(), 10);
    assert_eq!(levels[0], json!({"Exercise 1": 2}));
    assert_eq!(levels[9], json!({"Exercise 10": 5}));
}

#[tokio::test]
async fn sport_analysis_requires_both_urls() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(state(dir.path()));

    let (status, _) = post_json(
        app,
        "/fitness-project/sport-analysis",
        json!({"correct_video": "", "incorrect_video": "http://example.com/b.mp4"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failed_downloads_are_bad_gateway_and_clean_up() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(state(dir.path()));

    let (status, body) = post_json(
        app,
        "/fitness-project/sport-analysis",
        json!({
            "correct_video": "http://127.0.0.1:9/correct.mp4",
            "incorrect_video": "http://127.0.0.1:9/incorrect.mp4"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "download_failed");
    // the per-request scratch directory is gone
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn incomplete_bodies_are_validation_errors() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_router(state(dir.path()));

    let (status, body) = post_json(app.clone(), "/fitness-project/get-meal-plan", json!({"age": 25})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].as_str().unwrap().contains("missing field"));

    let request = Request::builder()
        .method("POST")
        .uri("/fitness-project/sport-analysis")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test(flavor = "multi_thread")]
async fn sport_analysis_publishes_every_artifact_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let videos = serve(
        Router::new()
            .route("/correct.mp4", get(|| async { "30\n60\n90\n120" }))
            .route("/incorrect.mp4", get(|| async { "30\n60\n90\n120" })),
    )
    .await;

    let uploader = Arc::new(RecordingUploader::default());
    let detector_factory: DetectorFactory =
        Arc::new(|| -> AnalysisResult<Box<dyn PoseDetector + Send>> { Ok(Box::new(MarkerDetector)) });
    let app = create_router(AppState {
        uploader: uploader.clone(),
        video_backend: Arc::new(ScriptBackend::new()),
        detector_factory,
        ..state(dir.path())
    });

    let (status, body) = post_json(
        app,
        "/fitness-project/sport-analysis",
        json!({
            "correct_video": format!("{}/correct.mp4", videos),
            "incorrect_video": format!("{}/incorrect.mp4", videos)
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!((body["similarity"].as_f64().unwrap() - 100.0).abs() < 1e-6);
    for (field, file) in [
        ("correct_video", "correct_pose_analysis.mp4"),
        ("wrong_video", "wrong_pose_analysis.mp4"),
        ("angle_comparison_video", "angle_comparison.mp4"),
        ("final_graph", "final_comparison_graph.png"),
    ] {
        let url = body[field].as_str().unwrap();
        assert!(url.starts_with("https://cdn.test/sport-analysis/"), "{}", url);
        assert!(url.ends_with(file), "{}", url);
    }

    let uploads = uploader.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 4);
    assert!(uploads.iter().all(|(_, size)| *size > 0));
    // one request id groups all four keys
    let ids: Vec<&str> = uploads.iter().map(|(key, _)| key.split('/').nth(1).unwrap()).collect();
    assert!(ids.iter().all(|id| *id == ids[0]));

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
