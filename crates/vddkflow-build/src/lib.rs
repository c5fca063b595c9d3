//! VDDKFlow OpenShift backend
//!
//! This crate implements the build backend traits of `vddkflow-core`
//! against the OpenShift REST API, using the pod's service account:
//!
//! - `BuildConfigTrigger` instantiates the `vddk` BuildConfig
//! - `ImageStreamTagLocator` resolves `vddk:latest` to its pull reference

pub mod api;
pub mod cluster;
pub mod error;
pub mod locator;
pub mod tag;
pub mod trigger;

pub use cluster::{ApiClient, ClusterContext};
pub use error::{BuildError, BuildResult};
pub use locator::ImageStreamTagLocator;
pub use tag::{image_stream_tag_name, split_stream_tag, validate_tag};
pub use trigger::BuildConfigTrigger;
