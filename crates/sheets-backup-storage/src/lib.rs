//! Destination bucket uploaders.
//!
//! `GcsUploader` talks to the Cloud Storage JSON API with the run's bearer
//! token. `S3Uploader` covers AWS S3 and S3-compatible stores such as R2.

mod gcs;
mod s3;

pub use gcs::{GcsUploader, GCS_API_BASE};
pub use s3::S3Uploader;
