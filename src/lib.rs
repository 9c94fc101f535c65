#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

#[cfg(feature = "chrome")]
pub mod chrome;

pub mod config;
pub mod extract;
pub mod server;
pub mod upload;
pub mod verify;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;

pub use config::Config;
pub use extract::{extract_claim, extract_claim_from_path, Claim};
pub use upload::{CertificateChecker, Reply, Upload};
pub use verify::{verify_claim, FetchError, PageNameFetcher, VerificationOutcome};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid value {value:?} for setting {key}")]
    InvalidSetting { key: &'static str, value: String },
    #[error("could not create upload directory {}", .0.display())]
    UploadDir(PathBuf, #[source] std::io::Error),
    #[error("could not store upload at {}", .0.display())]
    StoreUpload(PathBuf, #[source] std::io::Error),
}
