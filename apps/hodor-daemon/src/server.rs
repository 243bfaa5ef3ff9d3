// server.rs — HTTP routes and the serve loop.
//
// Request validation (body decoding, URL parsing) happens here; the engine
// only ever sees well-formed release keys and URLs. Engine calls touch
// SQLite, so they run on the blocking pool.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderName};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use hodor_deployer::{Deployer, JobStatus, Url};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::badge;
use crate::error::ApiError;

/// The engine as seen by handlers.
pub type SharedDeployer = Arc<dyn Deployer>;

/// Body of a hook request, as sent by the CI system.
#[derive(Debug, Deserialize)]
struct HookRequest {
    browser_download_url: String,
    #[serde(default)]
    tag: String,
}

#[derive(Debug, Serialize)]
struct HookResponse {
    #[serde(rename = "jobID")]
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct TagQuery {
    format: Option<String>,
}

/// Build the API router with request-id, tracing and CORS layers.
pub fn router(deployer: SharedDeployer) -> Router {
    let request_id = HeaderName::from_static("x-request-id");

    Router::new()
        .route("/api/hook/{release_key}", post(hook))
        .route("/api/status/{job_id}", get(status))
        .route("/api/tags/{release_key}", get(tags))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
        .with_state(deployer)
}

/// Serve the API on `addr` until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    deployer: SharedDeployer,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "server is ready to handle requests");

    axum::serve(listener, router(deployer))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// POST /api/hook/{release_key}
async fn hook(
    State(deployer): State<SharedDeployer>,
    Path(release_key): Path<String>,
    body: Bytes,
) -> Result<Json<HookResponse>, ApiError> {
    let request: HookRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("failed to decode request: {e}")))?;
    let source_url = Url::parse(&request.browser_download_url)
        .map_err(|e| ApiError::BadRequest(format!("wrong url: {e}")))?;
    let tag = Some(request.tag).filter(|t| !t.is_empty());

    let job_id = blocking(move || deployer.deploy(&release_key, &source_url, tag.as_deref()))
        .await?
        .map_err(ApiError::from_deploy)?;

    Ok(Json(HookResponse { job_id }))
}

/// GET /api/status/{job_id}
async fn status(
    State(deployer): State<SharedDeployer>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatus>, ApiError> {
    let status = blocking(move || deployer.status(&job_id))
        .await?
        .map_err(|e| ApiError::from_store("failed to get status", e))?;
    Ok(Json(status))
}

/// GET /api/tags/{release_key}[?format=svg]
async fn tags(
    State(deployer): State<SharedDeployer>,
    Path(release_key): Path<String>,
    Query(query): Query<TagQuery>,
) -> Result<Response, ApiError> {
    let tag = blocking(move || deployer.latest_tag(&release_key))
        .await?
        .map_err(|e| ApiError::from_store("failed to get tag", e))?;

    let response = match query.format.as_deref() {
        Some("svg") => (
            [(header::CONTENT_TYPE, "image/svg+xml;charset=utf-8")],
            badge::render("Deployed", &tag, badge::COLOR_BLUE),
        )
            .into_response(),
        _ => ([(header::CONTENT_TYPE, "text/plain")], tag).into_response(),
    };
    Ok(response)
}

async fn blocking<T>(f: impl FnOnce() -> T + Send + 'static) -> Result<T, ApiError>
where
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("engine call failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use hodor_deployer::{DeployError, StoreError};
    use hodor_store::Bucket;
    use tower::ServiceExt;

    /// Records deploy calls and answers from canned values.
    #[derive(Default)]
    struct FakeDeployer {
        deployed: Mutex<Vec<(String, String, Option<String>)>>,
        queue_full: bool,
        tag: Option<String>,
    }

    impl Deployer for FakeDeployer {
        fn deploy(
            &self,
            release_key: &str,
            source_url: &Url,
            tag: Option<&str>,
        ) -> Result<String, DeployError> {
            if self.queue_full {
                return Err(DeployError::QueueFull);
            }
            self.deployed.lock().unwrap().push((
                release_key.to_string(),
                source_url.to_string(),
                tag.map(str::to_string),
            ));
            Ok("job-1".to_string())
        }

        fn status(&self, job_id: &str) -> Result<JobStatus, StoreError> {
            if job_id == "job-1" {
                Ok(JobStatus::done())
            } else {
                Err(StoreError::NotFound {
                    bucket: Bucket::Jobs,
                    key: job_id.to_string(),
                })
            }
        }

        fn latest_tag(&self, _release_key: &str) -> Result<String, StoreError> {
            Ok(self.tag.clone().unwrap_or_else(|| "unknown".to_string()))
        }
    }

    async fn send(deployer: Arc<FakeDeployer>, request: Request<Body>) -> (StatusCode, String) {
        let response = router(deployer).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn hook_request(release_key: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/hook/{release_key}"))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn hook_queues_deploy_and_returns_job_id() {
        let deployer = Arc::new(FakeDeployer::default());
        let (status, body) = send(
            deployer.clone(),
            hook_request(
                "site",
                r#"{"browser_download_url": "https://ci.example.com/site.tar.gz", "tag": "v1.2.0"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["jobID"], "job-1");

        let deployed = deployer.deployed.lock().unwrap();
        assert_eq!(
            deployed.as_slice(),
            &[(
                "site".to_string(),
                "https://ci.example.com/site.tar.gz".to_string(),
                Some("v1.2.0".to_string())
            )]
        );
    }

    #[tokio::test]
    async fn hook_without_tag_deploys_untagged() {
        let deployer = Arc::new(FakeDeployer::default());
        let (status, _) = send(
            deployer.clone(),
            hook_request(
                "site",
                r#"{"browser_download_url": "https://ci.example.com/site.tar.gz"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(deployer.deployed.lock().unwrap()[0].2, None);
    }

    #[tokio::test]
    async fn hook_rejects_malformed_body() {
        let deployer = Arc::new(FakeDeployer::default());
        let (status, body) = send(deployer.clone(), hook_request("site", "not json")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.starts_with("failed to decode request"));
        assert!(deployer.deployed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn hook_rejects_unparseable_url() {
        let deployer = Arc::new(FakeDeployer::default());
        let (status, body) = send(
            deployer.clone(),
            hook_request("site", r#"{"browser_download_url": "not a url"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.starts_with("wrong url"));
        assert!(deployer.deployed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn hook_reports_full_queue_as_unavailable() {
        let deployer = Arc::new(FakeDeployer {
            queue_full: true,
            ..FakeDeployer::default()
        });
        let (status, body) = send(
            deployer,
            hook_request(
                "site",
                r#"{"browser_download_url": "https://ci.example.com/site.tar.gz"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "failed to deploy: buffer is full, re-try later\n");
    }

    #[tokio::test]
    async fn hook_requires_post() {
        let deployer = Arc::new(FakeDeployer::default());
        let (status, _) = send(deployer, get("/api/hook/site")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn status_returns_job_status() {
        let deployer = Arc::new(FakeDeployer::default());
        let (status, body) = send(deployer, get("/api/status/job-1")).await;

        assert_eq!(status, StatusCode::OK);
        let job: JobStatus = serde_json::from_str(&body).unwrap();
        assert_eq!(job, JobStatus::done());
    }

    #[tokio::test]
    async fn status_of_unknown_job_is_not_found() {
        let deployer = Arc::new(FakeDeployer::default());
        let (status, body) = send(deployer, get("/api/status/nope")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.starts_with("failed to get status"));
    }

    #[tokio::test]
    async fn tags_defaults_to_plain_text() {
        let deployer = Arc::new(FakeDeployer {
            tag: Some("v2.0.1".to_string()),
            ..FakeDeployer::default()
        });
        let response = router(deployer).oneshot(get("/api/tags/site")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/plain");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"v2.0.1");
    }

    #[tokio::test]
    async fn tags_as_svg_badge() {
        let deployer = Arc::new(FakeDeployer::default());
        let response = router(deployer)
            .oneshot(get("/api/tags/site?format=svg"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "image/svg+xml;charset=utf-8"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let svg = String::from_utf8(body.to_vec()).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Deployed"));
        assert!(svg.contains("unknown"));
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let deployer = Arc::new(FakeDeployer::default());
        let response = router(deployer).oneshot(get("/api/tags/site")).await.unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }
}
