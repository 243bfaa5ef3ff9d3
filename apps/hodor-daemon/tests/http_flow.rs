// http_flow.rs — Hook → status → tag through the router with a real engine.

use std::fs;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use hodor_deployer::testing::{release_archive, url, Entry, MemoryFetcher};
use hodor_deployer::{DeployError, DeploymentEngine, JobStatus, ReleaseConfig};
use hodor_store::{KvStore, StatusStore};
use tempfile::tempdir;
use tower::ServiceExt;

const ARCHIVE_URL: &str = "http://releases.test/site.tar.gz";

struct Harness {
    engine: Arc<DeploymentEngine>,
    worker: Option<JoinHandle<Result<(), DeployError>>>,
}

impl Harness {
    fn start(config: ReleaseConfig, fetcher: MemoryFetcher, db: &std::path::Path) -> Self {
        let store = StatusStore::new(KvStore::open(db).unwrap());
        let engine = Arc::new(DeploymentEngine::new(config, store, Arc::new(fetcher)));
        let worker = {
            let engine = engine.clone();
            thread::spawn(move || engine.start())
        };
        Self {
            engine,
            worker: Some(worker),
        }
    }

    fn router(&self) -> Router {
        hodor_daemon::router(self.engine.clone())
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.engine.stop();
        if let Some(worker) = self.worker.take() {
            worker.join().unwrap().unwrap();
        }
    }
}

async fn call(router: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn hook(router: Router, release_key: &str, tag: &str) -> String {
    let body = serde_json::json!({ "browser_download_url": ARCHIVE_URL, "tag": tag });
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/hook/{release_key}"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let (status, body) = call(router, request).await;
    assert_eq!(status, StatusCode::OK, "hook failed: {body}");
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    json["jobID"].as_str().unwrap().to_string()
}

async fn wait_for_terminal(router: Router, job_id: &str) -> JobStatus {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let request = Request::builder()
            .uri(format!("/api/status/{job_id}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(router.clone(), request).await;
        assert_eq!(status, StatusCode::OK, "status failed: {body}");

        let job: JobStatus = serde_json::from_str(&body).unwrap();
        if job.is_terminal() {
            return job;
        }
        assert!(Instant::now() < deadline, "timed out waiting for {job_id}");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

async fn latest_tag(router: Router, release_key: &str) -> String {
    let request = Request::builder()
        .uri(format!("/api/tags/{release_key}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(router, request).await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn hook_installs_release_and_records_tag() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("srv").join("site");
    fs::create_dir_all(&target).unwrap();
    fs::write(target.join("stale.html"), "old").unwrap();

    let fetcher = MemoryFetcher::new();
    fetcher.serve(
        &url(ARCHIVE_URL),
        release_archive(&[
            Entry::Dir("dist/"),
            Entry::File("dist/index.html", b"<h1>v1.4.0</h1>"),
        ]),
    );
    let config = ReleaseConfig::default().with_entry("site", &target);
    let harness = Harness::start(config, fetcher, &dir.path().join("hodor.db"));

    assert_eq!(latest_tag(harness.router(), "site").await, "unknown");

    let job_id = hook(harness.router(), "site", "v1.4.0").await;
    let status = wait_for_terminal(harness.router(), &job_id).await;

    assert_eq!(status, JobStatus::done());
    assert_eq!(
        fs::read_to_string(target.join("index.html")).unwrap(),
        "<h1>v1.4.0</h1>"
    );
    assert!(!target.join("stale.html").exists());
    assert_eq!(latest_tag(harness.router(), "site").await, "v1.4.0");
}

#[tokio::test]
async fn unknown_release_fails_and_keeps_tag() {
    let dir = tempdir().unwrap();
    let harness = Harness::start(
        ReleaseConfig::default(),
        MemoryFetcher::new(),
        &dir.path().join("hodor.db"),
    );

    let job_id = hook(harness.router(), "ghost", "v9").await;
    let status = wait_for_terminal(harness.router(), &job_id).await;

    assert_eq!(status.status, "failed");
    assert_eq!(status.message, r#"releaseID "ghost" not found from the config"#);
    assert_eq!(latest_tag(harness.router(), "ghost").await, "unknown");
}

#[tokio::test]
async fn hook_after_stop_is_unavailable() {
    let dir = tempdir().unwrap();
    let harness = Harness::start(
        ReleaseConfig::default(),
        MemoryFetcher::new(),
        &dir.path().join("hodor.db"),
    );
    harness.engine.stop();

    let request = Request::builder()
        .method("POST")
        .uri("/api/hook/site")
        .body(Body::from(format!(r#"{{"browser_download_url": "{ARCHIVE_URL}"}}"#)))
        .unwrap();
    let (status, body) = call(harness.router(), request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "failed to deploy: deployer is stopped\n");
}
