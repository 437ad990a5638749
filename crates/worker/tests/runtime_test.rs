use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use vidqueue_api::{auth::AuthConfig, create_app, routes::AppState};
use vidqueue_core::config::ApiConfig;
use vidqueue_core::models::{ImageRef, JobOutcome, TaskPayload, VideoRequest};
use vidqueue_core::music::MusicCatalog;
use vidqueue_dispatcher::{DispatchCore, DispatcherActor, DispatcherHandle, DispatcherSettings};
use vidqueue_worker::{
    DispatcherClient, RenderExecutor, SubmitStatus, WorkerError, WorkerResult, WorkerRuntime,
};

struct TestServer {
    base_url: String,
    dispatcher: DispatcherHandle,
    _shutdown: broadcast::Sender<()>,
}

async fn start_server() -> TestServer {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let core = DispatchCore::new(DispatcherSettings::default(), MusicCatalog::default());
    let (actor, dispatcher) = DispatcherActor::new(core, shutdown_rx);
    actor.spawn();

    let state = AppState {
        dispatcher: dispatcher.clone(),
        auth_config: Arc::new(AuthConfig::default()),
        music: Arc::new(MusicCatalog::default()),
        caller_timeout: Duration::from_secs(10),
        metrics: None,
    };
    let app = create_app(state, &ApiConfig::default(), "/metrics");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{addr}"),
        dispatcher,
        _shutdown: shutdown_tx,
    }
}

fn client(server: &TestServer, worker_id: &str) -> DispatcherClient {
    DispatcherClient::new(&server.base_url, worker_id, Duration::from_secs(5)).unwrap()
}

fn request(title: &str) -> VideoRequest {
    VideoRequest {
        images: vec![ImageRef {
            url: "https://cdn.example.com/p1.jpg".to_string(),
            alt: Some("Page 1".to_string()),
        }],
        config: serde_json::json!({ "ratio": "16:9" }),
        music_url: None,
        title: Some(title.to_string()),
    }
}

struct StaticExecutor(&'static [u8]);

#[async_trait]
impl RenderExecutor for StaticExecutor {
    fn name(&self) -> &str {
        "static"
    }

    async fn render(&self, _task: &TaskPayload) -> WorkerResult<Bytes> {
        Ok(Bytes::from_static(self.0))
    }
}

struct FailingExecutor;

#[async_trait]
impl RenderExecutor for FailingExecutor {
    fn name(&self) -> &str {
        "failing"
    }

    async fn render(&self, _task: &TaskPayload) -> WorkerResult<Bytes> {
        Err(WorkerError::Render("No images processed".to_string()))
    }
}

#[tokio::test]
async fn test_poll_empty_queue() {
    let server = start_server().await;
    let task = client(&server, "worker_0000000a").poll_task().await.unwrap();
    assert!(task.is_none());
}

#[tokio::test]
async fn test_run_once_delivers_artifact() {
    let server = start_server().await;
    let ticket = server.dispatcher.submit(request("Chapter 7")).await.unwrap();

    let runtime = WorkerRuntime::new(
        client(&server, "worker_0000000b"),
        Arc::new(StaticExecutor(b"rendered")),
        Duration::from_millis(10),
    );
    assert!(runtime.run_once().await.unwrap());
    assert!(!runtime.run_once().await.unwrap());

    let outcome = ticket.wait(Duration::from_secs(5)).await.unwrap();
    assert_eq!(
        outcome,
        JobOutcome::Completed {
            artifact: Bytes::from_static(b"rendered"),
            filename: "Chapter-7.mp4".to_string(),
        }
    );
}

#[tokio::test]
async fn test_render_failure_is_reported() {
    let server = start_server().await;
    let ticket = server.dispatcher.submit(request("broken")).await.unwrap();

    let runtime = WorkerRuntime::new(
        client(&server, "worker_0000000c"),
        Arc::new(FailingExecutor),
        Duration::from_millis(10),
    );
    assert!(runtime.run_once().await.unwrap());

    let outcome = ticket.wait(Duration::from_secs(5)).await.unwrap();
    assert_eq!(
        outcome,
        JobOutcome::Failed {
            reason: "No images processed".to_string()
        }
    );

    let snapshot = server.dispatcher.snapshot().await.unwrap();
    assert_eq!(snapshot.workers.len(), 1);
    assert_eq!(snapshot.workers[0].id, "worker_0000000c");
}

#[tokio::test]
async fn test_submit_without_caller() {
    let server = start_server().await;
    let worker = client(&server, "worker_0000000d");

    let status = worker
        .submit_result(vidqueue_core::models::JobId::new(), Bytes::from_static(b"x"))
        .await
        .unwrap();
    assert_eq!(status, SubmitStatus::ClientGone);

    worker
        .report_error(vidqueue_core::models::JobId::new(), "late")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_run_loop_processes_until_shutdown() {
    let server = start_server().await;
    let first = server.dispatcher.submit(request("one")).await.unwrap();
    let second = server.dispatcher.submit(request("two")).await.unwrap();

    let runtime = WorkerRuntime::new(
        client(&server, "worker_0000000e"),
        Arc::new(StaticExecutor(b"mp4")),
        Duration::from_millis(20),
    );
    let (stop_tx, stop_rx) = broadcast::channel(1);
    let handle = tokio::spawn(async move { runtime.run(stop_rx).await });

    let first = first.wait(Duration::from_secs(5)).await.unwrap();
    let second = second.wait(Duration::from_secs(5)).await.unwrap();
    assert!(matches!(first, JobOutcome::Completed { filename, .. } if filename == "one.mp4"));
    assert!(matches!(second, JobOutcome::Completed { filename, .. } if filename == "two.mp4"));

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_unreachable_server_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let worker = DispatcherClient::new(
        &format!("http://{addr}"),
        "worker_0000000f",
        Duration::from_secs(1),
    )
    .unwrap();
    assert!(matches!(worker.poll_task().await, Err(WorkerError::Http(_))));
}
