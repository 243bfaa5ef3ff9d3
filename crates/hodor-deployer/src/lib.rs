//! # hodor-deployer
//!
//! Release deployment engine for hodor.
//!
//! A build system announces "release X is ready at URL Y"; the engine queues
//! the request, and a single worker fetches the gzip-compressed tarball,
//! unpacks it into a scratch directory and swaps it into the directory
//! configured for X. Callers poll the job status asynchronously.
//!
//! ## Key components
//!
//! - [`DeploymentEngine`] — façade: submit jobs, query statuses and tags,
//!   run and stop the worker
//! - [`Deployer`] — trait the transport layer talks to
//! - [`Installer`] — fetch, extract and swap one release
//! - [`Fetcher`] — transport seam for downloading archives ([`HttpFetcher`])
//! - [`ReleaseConfig`] — release key → target directory mapping

pub mod archive;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod installer;
pub mod job;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod worker;

pub use config::ReleaseConfig;
pub use engine::{Deployer, DeploymentEngine, Lifecycle, QUEUE_CAPACITY, UNKNOWN_TAG};
pub use error::{ArchiveError, ConfigError, DeployError, FetchError, InstallError};
pub use fetch::{Fetcher, HttpFetcher};
pub use hodor_store::{JobStatus, StoreError};
pub use installer::Installer;
pub use job::Job;
pub use reqwest::Url;
