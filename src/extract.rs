//! Recovers the claimed name and verification URL from a certificate PDF.
//!
//! Extraction never fails from the caller's point of view: an unreadable or
//! malformed document simply yields an empty [`Claim`].

use std::any::Any;
use std::panic;
use std::path::Path;

use anyhow::{anyhow, Result};
use lopdf::Document;
use regex::Regex;
use tracing::{debug, warn};

lazy_static::lazy_static! {
    static ref VERIFY_URL_REGEX: Regex =
        Regex::new(r"https?://coursera\.org/verify(?:/[A-Za-z0-9]+)?(?:/\S+)?").unwrap();
    static ref COMPLETED_BY_REGEX: Regex =
        Regex::new(r"(?i)(.+)\s+has successfully completed the online").unwrap();
}

/// The name and URL a certificate asserts, not yet checked against anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Claim {
    pub name: Option<String>,
    pub url: Option<String>,
}

impl Claim {
    /// Returns `(name, url)` only when both were found.
    pub fn complete(&self) -> Option<(&str, &str)> {
        Some((self.name.as_deref()?, self.url.as_deref()?))
    }
}

/// Reads the PDF at `path` and extracts its claim.
pub fn extract_claim_from_path(path: impl AsRef<Path>) -> Claim {
    let path = path.as_ref();
    match std::fs::read(path) {
        Ok(bytes) => extract_claim(bytes),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read certificate");
            Claim::default()
        }
    }
}

/// Extracts the claim from the bytes of a PDF document.
pub fn extract_claim(pdf_bytes: impl AsRef<[u8]>) -> Claim {
    match document_text(pdf_bytes.as_ref()) {
        Ok(text) => claim_from_text(&text),
        Err(e) => {
            warn!(error = %e, "could not extract text from certificate");
            Claim::default()
        }
    }
}

/// Concatenated text of every page, in page order.
///
/// lopdf asserts on some malformed structures instead of returning an error,
/// so a panic inside the parser is reported as an ordinary failure.
fn document_text(pdf_bytes: &[u8]) -> Result<String> {
    panic::catch_unwind(|| -> Result<String> {
        let doc = Document::load_mem(pdf_bytes)?;
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        Ok(doc.extract_text(&page_numbers)?)
    })
    .unwrap_or_else(|payload| Err(anyhow!("PDF parser panicked: {}", panic_message(&*payload))))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown cause"
    }
}

/// Applies the URL and name patterns to already extracted text.
pub fn claim_from_text(text: &str) -> Claim {
    // The URL is frequently wrapped over several lines in the footer.
    let joined: String = text.chars().filter(|&c| c != '\n' && c != '\r').collect();
    let url = VERIFY_URL_REGEX
        .find(&joined)
        .map(|m| m.as_str().to_string());

    let name = COMPLETED_BY_REGEX
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    debug!(?name, ?url, "claim extracted");
    Claim { name, url }
}
