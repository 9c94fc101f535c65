//! Compares a claimed name against the name rendered on the claim's
//! verification page.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

/// How long to wait for the name element to show up on the page.
pub const DEFAULT_ELEMENT_TIMEOUT: Duration = Duration::from_secs(20);

/// Location of the recipient's name on the certificate verification page.
///
/// Any change to the page's markup makes every check come back as
/// [`VerificationOutcome::NameNotFound`].
pub const CERTIFICATE_NAME_XPATH: &str = "//*[@id='rendered-content']/div/div/div[1]/div/div/div[2]/div[1]/div[1]/div/div[2]/h3/span/strong";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("could not launch the browser")]
    Launch(#[source] anyhow::Error),
    #[error("could not load {url}")]
    Navigation {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("browser session failed")]
    Browser(#[source] anyhow::Error),
}

/// Something that can render a page and read the certificate name off it.
pub trait PageNameFetcher: Send + Sync {
    /// Loads `url` and returns the text of the name element.
    ///
    /// Returns `Ok(None)` when the page loaded but the element did not
    /// appear within `timeout`, and an error when the page or the browser
    /// could not be reached at all.
    fn fetch_rendered_name(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Option<String>, FetchError>;
}

impl<F: PageNameFetcher + ?Sized> PageNameFetcher for std::sync::Arc<F> {
    fn fetch_rendered_name(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Option<String>, FetchError> {
        (**self).fetch_rendered_name(url, timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    Mismatch { expected: String, found: String },
    NameNotFound,
    AccessError,
}

impl VerificationOutcome {
    /// Whether a name was located on the page at all.
    pub fn name_located(&self) -> bool {
        matches!(self, Self::Verified | Self::Mismatch { .. })
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified => f.write_str("Verified"),
            Self::Mismatch { expected, found } => {
                write!(f, "Mismatch: Expected '{expected}', Found '{found}'")
            }
            Self::NameNotFound => f.write_str("Name Not Found on Webpage"),
            Self::AccessError => f.write_str("Error with Webpage or Browser"),
        }
    }
}

/// Case-insensitive comparison, ignoring surrounding whitespace.
pub fn names_match(expected: &str, found: &str) -> bool {
    expected.trim().to_lowercase() == found.trim().to_lowercase()
}

/// Fetches the name shown at `url` and compares it to `expected`.
pub fn verify_claim<F: PageNameFetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    expected: &str,
    timeout: Duration,
) -> VerificationOutcome {
    let found = match fetcher.fetch_rendered_name(url, timeout) {
        Ok(found) => found,
        Err(e) => {
            let chain = format!("{:#}", anyhow::Error::new(e));
            warn!(url, error = %chain, "certificate page not accessible");
            return VerificationOutcome::AccessError;
        }
    };

    let outcome = match found.as_deref().map(str::trim) {
        None | Some("") => VerificationOutcome::NameNotFound,
        Some(found) if names_match(expected, found) => VerificationOutcome::Verified,
        Some(found) => VerificationOutcome::Mismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        },
    };
    info!(
        url,
        %outcome,
        name_located = outcome.name_located(),
        "certificate checked"
    );
    outcome
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Stands in for a browser: returns a canned page result.
    pub(crate) enum FakePage {
        Shows(&'static str),
        NeverRenders,
        Unreachable,
    }

    impl PageNameFetcher for FakePage {
        fn fetch_rendered_name(
            &self,
            url: &str,
            _timeout: Duration,
        ) -> Result<Option<String>, FetchError> {
            match self {
                FakePage::Shows(name) => Ok(Some(name.to_string())),
                FakePage::NeverRenders => Ok(None),
                FakePage::Unreachable => Err(FetchError::Navigation {
                    url: url.to_string(),
                    source: anyhow::anyhow!("net::ERR_NAME_NOT_RESOLVED"),
                }),
            }
        }
    }

    const URL: &str = "https://coursera.org/verify/ABCD1234";

    fn check(page: FakePage, expected: &str) -> VerificationOutcome {
        verify_claim(&page, URL, expected, DEFAULT_ELEMENT_TIMEOUT)
    }

    #[test]
    fn test_names_match() {
        assert!(names_match("Jane Doe", " jane doe "));
        assert!(names_match("  JANE DOE", "Jane Doe\n"));
        assert!(!names_match("Jane Doe", "Jane  Doe"));
        assert!(!names_match("Jane Doe", "John Doe"));
    }

    #[test]
    fn test_verified() {
        let outcome = check(FakePage::Shows(" jane doe "), "Jane Doe");
        assert_eq!(outcome, VerificationOutcome::Verified);
        assert!(outcome.name_located());
        assert_eq!(outcome.to_string(), "Verified");
    }

    #[test]
    fn test_mismatch() {
        let outcome = check(FakePage::Shows("  John Smith "), "Jane Doe");
        assert_eq!(
            outcome,
            VerificationOutcome::Mismatch {
                expected: "Jane Doe".to_string(),
                found: "John Smith".to_string(),
            }
        );
        assert!(outcome.name_located());
        assert_eq!(
            outcome.to_string(),
            "Mismatch: Expected 'Jane Doe', Found 'John Smith'"
        );
    }

    #[test]
    fn test_element_never_rendered() {
        let outcome = check(FakePage::NeverRenders, "Jane Doe");
        assert_eq!(outcome, VerificationOutcome::NameNotFound);
        assert!(!outcome.name_located());

        // An element that renders without text is no better.
        assert_eq!(
            check(FakePage::Shows("   "), "Jane Doe"),
            VerificationOutcome::NameNotFound
        );
    }

    #[test]
    fn test_unreachable_page() {
        let outcome = check(FakePage::Unreachable, "Jane Doe");
        assert_eq!(outcome, VerificationOutcome::AccessError);
        assert!(!outcome.name_located());
        assert_eq!(outcome.to_string(), "Error with Webpage or Browser");
    }
}
