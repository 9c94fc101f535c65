//! Handles one uploaded certificate from raw bytes to a reply, independent of
//! the HTTP framework serving it.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::extract::{extract_claim_from_path, Claim};
use crate::verify::{verify_claim, PageNameFetcher, VerificationOutcome};
use crate::Error;

/// A file received from the client.
#[derive(Debug, Clone, Copy)]
pub struct Upload<'a> {
    /// Name the client gave the file. Only checked for presence.
    pub filename: &'a str,
    pub bytes: &'a [u8],
}

/// Result of handling one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    NoFile,
    NoFilename,
    StorageFailed,
    ExtractionFailed,
    Checked {
        name: String,
        url: String,
        outcome: VerificationOutcome,
    },
}

impl Reply {
    pub fn status_code(&self) -> u16 {
        match self {
            Reply::NoFile | Reply::NoFilename => 400,
            Reply::StorageFailed => 500,
            Reply::ExtractionFailed | Reply::Checked { .. } => 200,
        }
    }

    /// Whether [`Reply::body`] is an HTML fragment rather than plain text.
    pub fn is_html(&self) -> bool {
        matches!(self, Reply::Checked { .. })
    }

    pub fn body(&self) -> String {
        match self {
            Reply::NoFile => "No file uploaded".to_string(),
            Reply::NoFilename => "No file selected".to_string(),
            Reply::StorageFailed => "Could not store the uploaded file.".to_string(),
            Reply::ExtractionFailed => {
                "Could not extract name or URL from the certificate.".to_string()
            }
            Reply::Checked { name, url, outcome } => format!(
                "Certificate Name: {}<br>URL: {}<br>Status: {}",
                escape_html(name),
                escape_html(url),
                escape_html(&outcome.to_string()),
            ),
        }
    }
}

/// Extracts and verifies uploaded certificates.
pub struct CertificateChecker<F> {
    upload_dir: PathBuf,
    element_timeout: Duration,
    fetcher: F,
}

impl<F: PageNameFetcher> CertificateChecker<F> {
    pub fn new(upload_dir: impl Into<PathBuf>, element_timeout: Duration, fetcher: F) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            element_timeout,
            fetcher,
        }
    }

    /// Runs the whole check for one upload: store, extract, discard, verify.
    ///
    /// The stored copy of the upload is always removed before this returns.
    pub fn handle_upload(&self, upload: Option<Upload<'_>>) -> Reply {
        let Some(upload) = upload else {
            return Reply::NoFile;
        };
        if upload.filename.is_empty() {
            return Reply::NoFilename;
        }

        let claim = match self.store(upload.bytes) {
            Ok(stored) => extract_claim_from_path(stored.path()),
            Err(e) => {
                let chain = format!("{:#}", anyhow::Error::new(e));
                warn!(error = %chain, "upload not stored");
                return Reply::StorageFailed;
            }
        };

        let Some((name, url)) = claim.complete() else {
            info!(filename = upload.filename, "no name or URL in certificate");
            return Reply::ExtractionFailed;
        };

        let outcome = verify_claim(&self.fetcher, url, name, self.element_timeout);
        Reply::Checked {
            name: name.to_string(),
            url: url.to_string(),
            outcome,
        }
    }

    /// Verifies an already extracted claim, if it is complete.
    pub fn check_claim(&self, claim: &Claim) -> Option<VerificationOutcome> {
        let (name, url) = claim.complete()?;
        Some(verify_claim(&self.fetcher, url, name, self.element_timeout))
    }

    /// Writes the upload under a fresh name, so concurrent uploads never
    /// share a path regardless of what the client called the file.
    fn store(&self, bytes: &[u8]) -> Result<StoredUpload, Error> {
        fs::create_dir_all(&self.upload_dir)
            .map_err(|e| Error::UploadDir(self.upload_dir.clone(), e))?;
        let path = self.upload_dir.join(format!("{}.pdf", Uuid::new_v4()));
        fs::write(&path, bytes).map_err(|e| Error::StoreUpload(path.clone(), e))?;
        Ok(StoredUpload { path })
    }
}

/// An uploaded file on disk, removed when dropped.
struct StoredUpload {
    path: PathBuf,
}

impl StoredUpload {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoredUpload {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "could not remove upload");
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
