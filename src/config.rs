use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::verify::DEFAULT_ELEMENT_TIMEOUT;
use crate::Error;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Runtime settings, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub element_timeout: Duration,
    pub chrome_path: Option<PathBuf>,
    pub chrome_sandbox: bool,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            element_timeout: DEFAULT_ELEMENT_TIMEOUT,
            chrome_path: None,
            chrome_sandbox: false,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    /// Builds the configuration from `CERT_CHECK_*` variables (and `PORT`),
    /// falling back to the defaults for anything unset.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::default();

        if let Some(addr) = parse_setting(&lookup, "CERT_CHECK_ADDR")? {
            config.addr = addr;
        }
        if let Some(port) = parse_setting::<u16>(&lookup, "PORT")? {
            config.addr.set_port(port);
        }
        if let Some(dir) = non_empty(&lookup, "CERT_CHECK_UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(secs) = parse_setting::<u64>(&lookup, "CERT_CHECK_ELEMENT_TIMEOUT")? {
            config.element_timeout = Duration::from_secs(secs);
        }
        config.chrome_path = non_empty(&lookup, "CERT_CHECK_CHROME_PATH").map(PathBuf::from);
        if let Some(sandbox) = parse_setting(&lookup, "CERT_CHECK_CHROME_SANDBOX")? {
            config.chrome_sandbox = sandbox;
        }
        if let Some(limit) = parse_setting(&lookup, "CERT_CHECK_MAX_UPLOAD_BYTES")? {
            config.max_upload_bytes = limit;
        }

        Ok(config)
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_setting<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, Error> {
    non_empty(lookup, key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| Error::InvalidSetting { key, value })
        })
        .transpose()
}
