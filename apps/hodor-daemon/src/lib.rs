//! # hodor-daemon
//!
//! HTTP front end for the hodor deployment engine.
//!
//! - `POST /api/hook/{release_key}` — queue a deployment, returns `{"jobID": ...}`
//! - `GET /api/status/{job_id}` — job status as `{"status": ..., "message": ...}`
//! - `GET /api/tags/{release_key}` — latest deployed tag, as text or an SVG
//!   badge with `?format=svg`
//!
//! Handlers talk to a [`hodor_deployer::Deployer`], so they can be exercised
//! against a fake.

pub mod badge;
pub mod error;
pub mod server;

pub use error::ApiError;
pub use server::{router, serve};
