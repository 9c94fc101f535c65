//! Headless Chrome implementation of [`PageNameFetcher`].
//!
//! Every call launches its own browser process and tears it down before
//! returning, so no state leaks from one certificate check to the next. It is
//! enabled by the `chrome` feature.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions};
use tracing::debug;

use crate::verify::{FetchError, PageNameFetcher, CERTIFICATE_NAME_XPATH};

/// Reads the certificate name with a disposable headless Chrome session.
#[derive(Debug, Clone, Default)]
pub struct ChromeFetcher {
    /// Chrome or Chromium binary. Detected automatically when `None`.
    pub chrome_path: Option<PathBuf>,
    /// Runs Chrome with its sandbox enabled. Usually has to be off inside
    /// containers.
    pub sandbox: bool,
}

impl ChromeFetcher {
    pub fn new(chrome_path: Option<PathBuf>, sandbox: bool) -> Self {
        Self {
            chrome_path,
            sandbox,
        }
    }

    fn launch(&self) -> anyhow::Result<Browser> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(self.sandbox)
            .path(self.chrome_path.clone())
            .args(vec![OsStr::new("--disable-gpu")])
            .build()
            .map_err(anyhow::Error::msg)?;
        Browser::new(options)
    }
}

impl PageNameFetcher for ChromeFetcher {
    fn fetch_rendered_name(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Option<String>, FetchError> {
        // Dropping `browser` kills the Chrome process, on every return path.
        let browser = self.launch().map_err(FetchError::Launch)?;
        let tab = browser.new_tab().map_err(FetchError::Browser)?;

        tab.navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|source| FetchError::Navigation {
                url: url.to_string(),
                source,
            })?;

        let element = match tab.wait_for_xpath_with_custom_timeout(CERTIFICATE_NAME_XPATH, timeout)
        {
            Ok(element) => element,
            Err(e) => {
                debug!(url, error = %e, "name element not found");
                return Ok(None);
            }
        };
        let name = element.get_inner_text().map_err(FetchError::Browser)?;
        Ok(Some(name.trim().to_string()))
    }
}
