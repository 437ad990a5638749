use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tower::ServiceExt;

use vidqueue_api::{
    auth::{hash_api_key, ApiKeyInfo, AuthConfig, Permission},
    create_app,
    routes::AppState,
};
use vidqueue_core::config::ApiConfig;
use vidqueue_core::music::MusicCatalog;
use vidqueue_dispatcher::{DispatchCore, DispatcherActor, DispatcherSettings};

struct TestApp {
    router: Router,
    _shutdown: broadcast::Sender<()>,
}

fn build_app(auth_config: AuthConfig, caller_timeout: Duration) -> TestApp {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let core = DispatchCore::new(DispatcherSettings::default(), MusicCatalog::default());
    let (actor, dispatcher) = DispatcherActor::new(core, shutdown_rx);
    actor.spawn();

    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let state = AppState {
        dispatcher,
        auth_config: Arc::new(auth_config),
        music: Arc::new(MusicCatalog::default()),
        caller_timeout,
        metrics: Some(recorder.handle()),
    };

    TestApp {
        router: create_app(state, &ApiConfig::default(), "/metrics"),
        _shutdown: shutdown_tx,
    }
}

fn open_app() -> TestApp {
    build_app(AuthConfig::default(), Duration::from_secs(10))
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_bytes(uri: &str, body: &'static [u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "video/mp4")
        .body(Body::from(body))
        .unwrap()
}

fn video_request(title: &str) -> Value {
    json!({
        "images": [
            { "url": "https://cdn.example.com/p1.jpg", "alt": "Page 1" },
            { "url": "https://cdn.example.com/p2.jpg" }
        ],
        "config": { "ratio": "9:16", "durationPerImg": 3 },
        "musicUrl": "epic_battle",
        "title": title
    })
}

/// 轮询直到拿到任务
async fn poll_until_assigned(router: &Router, worker_id: &str) -> Value {
    for _ in 0..100 {
        let response = send(router, get(&format!("/api/worker/get-task?workerId={worker_id}"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        if !body.is_null() {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no task was dispatched");
}

#[tokio::test]
async fn test_get_task_with_empty_queue_returns_null() {
    let app = open_app();

    let response = send(&app.router, get("/api/worker/get-task?workerId=worker_1a2b3c4d")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, Value::Null);

    // 不带workerId的匿名轮询同样合法
    let response = send(&app.router, get("/api/worker/get-task")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, Value::Null);
}

#[tokio::test]
async fn test_create_video_roundtrip() {
    let app = open_app();

    let router = app.router.clone();
    let caller = tokio::spawn(async move {
        send(&router, post_json("/api/create-video", video_request("Tập 12: Hồi kết"))).await
    });

    let task = poll_until_assigned(&app.router, "W1").await;
    let job_id = task["jobId"].as_str().unwrap().to_string();
    assert_eq!(task["images"].as_array().unwrap().len(), 2);
    assert_eq!(task["config"]["ratio"], "9:16");
    assert_eq!(
        task["musicUrl"],
        "https://incompetech.com/music/royalty-free/mp3-royaltyfree/Volatile%20Reaction.mp3"
    );

    // 忙碌的Worker再次轮询拿不到任务
    let response = send(&app.router, get("/api/worker/get-task?workerId=W1")).await;
    assert_eq!(body_json(response).await, Value::Null);

    let response = send(
        &app.router,
        post_bytes(
            &format!("/api/worker/submit-result/{job_id}?workerId=W1"),
            b"fake-mp4-bytes",
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "success": true }));

    let response = send(&app.router, get("/api/admin/stats")).await;
    let stats = body_json(response).await;
    assert_eq!(stats["workers"][0]["id"], "W1");
    assert_eq!(stats["workers"][0]["status"], "idle");

    let response = caller.await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Tap-12-Hoi-ket.mp4\""
    );
    assert_eq!(body_bytes(response).await, b"fake-mp4-bytes");

    // 重复提交不会再有接收方
    let response = send(
        &app.router,
        post_bytes(&format!("/api/worker/submit-result/{job_id}"), b"again"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({ "error": "Client disconnected" }));
}

#[tokio::test]
async fn test_worker_error_reaches_caller() {
    let app = open_app();

    let router = app.router.clone();
    let caller = tokio::spawn(async move {
        send(&router, post_json("/api/create-video", video_request("broken"))).await
    });

    let task = poll_until_assigned(&app.router, "W1").await;
    let job_id = task["jobId"].as_str().unwrap().to_string();

    let response = send(
        &app.router,
        post_json(
            &format!("/api/worker/report-error/{job_id}?workerId=W1"),
            json!({ "error": "No images processed" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "received": true }));

    let response = caller.await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "No images processed");

    // Worker立即恢复空闲
    let response = send(&app.router, get("/api/admin/stats")).await;
    let stats = body_json(response).await;
    assert_eq!(stats["workers"][0]["status"], "idle");
}

#[tokio::test]
async fn test_submissions_for_unknown_jobs() {
    let app = open_app();
    let unknown = uuid_like();

    let response = send(
        &app.router,
        post_bytes(&format!("/api/worker/submit-result/{unknown}"), b"x"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app.router,
        post_bytes("/api/worker/submit-result/not-a-job-id", b"x"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app.router,
        post_json(
            &format!("/api/worker/report-error/{unknown}"),
            json!({ "error": "late" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "received": true }));

    // 非JSON的错误上报也会被确认
    let request = Request::builder()
        .method("POST")
        .uri("/api/worker/report-error/not-a-job-id")
        .body(Body::from("plain text"))
        .unwrap();
    let response = send(&app.router, request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

fn uuid_like() -> String {
    vidqueue_core::models::JobId::new().to_string()
}

#[tokio::test]
async fn test_create_video_requires_images() {
    let app = open_app();

    let response = send(
        &app.router,
        post_json("/api/create-video", json!({ "images": [], "config": {} })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app.router, post_json("/api/create-video", json!({ "config": {} }))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "VALIDATION_ERROR");

    // 校验失败的请求不会入队
    let response = send(&app.router, get("/api/admin/stats")).await;
    let stats = body_json(response).await;
    assert_eq!(stats["queue"], json!([]));
    assert_eq!(stats["stats"]["totalJobs"], 0);
}

#[tokio::test]
async fn test_caller_timeout_returns_gateway_timeout() {
    let app = build_app(AuthConfig::default(), Duration::from_millis(50));

    let response = send(&app.router, post_json("/api/create-video", video_request("slow"))).await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_admin_stats_shape() {
    let app = open_app();

    let router = app.router.clone();
    let _caller = tokio::spawn(async move {
        send(&router, post_json("/api/create-video", video_request("queued title"))).await
    });

    let mut stats = Value::Null;
    for _ in 0..100 {
        let response = send(&app.router, get("/api/admin/stats")).await;
        assert_eq!(response.status(), StatusCode::OK);
        stats = body_json(response).await;
        if stats["queue"].as_array().is_some_and(|q| !q.is_empty()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(stats["queue"][0]["data"]["title"], "queued title");
    assert!(stats["queue"][0]["jobId"].is_string());
    assert_eq!(stats["workers"], json!([]));
    assert_eq!(stats["stats"]["totalJobs"], 0);
    assert_eq!(stats["stats"]["enqueued"], 1);
}

fn secured_auth() -> AuthConfig {
    let mut api_keys = HashMap::new();
    api_keys.insert(
        hash_api_key("submit-key"),
        ApiKeyInfo {
            name: "uploader".to_string(),
            permissions: vec![Permission::Submit],
            is_active: true,
        },
    );
    api_keys.insert(
        hash_api_key("admin-key"),
        ApiKeyInfo {
            name: "ops".to_string(),
            permissions: vec![Permission::Admin],
            is_active: true,
        },
    );
    AuthConfig {
        enabled: true,
        api_keys,
    }
}

#[tokio::test]
async fn test_auth_on_protected_routes() {
    let app = build_app(secured_auth(), Duration::from_millis(50));

    let response = send(&app.router, get("/api/admin/stats")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/admin/stats")
        .header("X-API-Key", "wrong-key")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app.router, request).await.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/admin/stats")
        .header("X-API-Key", "submit-key")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app.router, request).await.status(), StatusCode::FORBIDDEN);

    let request = Request::builder()
        .uri("/api/admin/stats")
        .header(header::AUTHORIZATION, "Bearer admin-key")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app.router, request).await.status(), StatusCode::OK);

    let response = send(&app.router, post_json("/api/create-video", video_request("x"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // 有Submit权限即可提交，这里因无人处理而超时
    let mut request = post_json("/api/create-video", video_request("x"));
    request
        .headers_mut()
        .insert("X-API-Key", "submit-key".parse().unwrap());
    assert_eq!(send(&app.router, request).await.status(), StatusCode::GATEWAY_TIMEOUT);

    // Worker接口不需要认证
    let response = send(&app.router, get("/api/worker/get-task?workerId=w1")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_music_library() {
    let app = open_app();

    let response = send(&app.router, get("/api/music-library")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["music"].as_array().unwrap().len(), 15);
    assert_eq!(body["music"][0]["id"], "epic_battle");
}

#[tokio::test]
async fn test_health_and_metrics() {
    let app = open_app();

    let response = send(&app.router, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");

    let response = send(&app.router, get("/metrics")).await;
    assert_eq!(response.status(), StatusCode::OK);
}
