use std::env;
use std::env::VarError;
use std::fmt::Display;
use std::time::Duration;

use http::Uri;

/// Overall deadline for a single upstream round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Deadline for establishing the TCP/TLS connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const HTTP_PROXY_ENV_NAME: &str = "HTTP_PROXY";
const HTTPS_PROXY_ENV_NAME: &str = "HTTPS_PROXY";

#[derive(Clone)]
pub struct HttpConfig {
    pub(crate) timeout: Duration,
    pub(crate) conn_timeout: Duration,
    pub(crate) proxy: ProxyConfig,
}

impl HttpConfig {
    pub fn new(timeout: Duration, conn_timeout: Duration, proxy: ProxyConfig) -> Self {
        Self {
            timeout,
            conn_timeout,
            proxy,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, ProxyConfig::default())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ProxyError {
    #[error("invalid proxy url `{0}`: `{1}`")]
    InvalidUrl(String, String),
}

/// Type to represent a Url which can be used in proxy implementations.
/// It allows representing empty urls and perform basic uri validations.
#[derive(Debug, Default, PartialEq, Clone)]
pub struct ProxyUrl(Option<Uri>);

impl TryFrom<&str> for ProxyUrl {
    type Error = ProxyError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        if s.is_empty() {
            return Ok(Self(None));
        }
        let uri = s
            .parse::<Uri>()
            .map_err(|err| ProxyError::InvalidUrl(s.to_string(), err.to_string()))?;
        Ok(Self(Some(uri)))
    }
}

impl Display for ProxyUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(url) => write!(f, "{url}"),
            None => write!(f, ""),
        }
    }
}

impl ProxyUrl {
    fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

/// Proxy settings for the upstream HTTP clients.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct ProxyConfig {
    /// Proxy URL:
    /// <protocol>://<user>:<password>@<host>:<port>
    /// (All parts except host are optional)
    url: ProxyUrl,
}

impl ProxyConfig {
    pub fn new(proxy_url: &str) -> Result<Self, ProxyError> {
        let url = ProxyUrl::try_from(proxy_url)?;
        Ok(Self { url })
    }

    pub fn is_empty(&self) -> bool {
        self.url.is_empty()
    }

    /// Returns a string representation of the proxy url.
    pub fn url_as_string(&self) -> String {
        self.url.to_string()
    }

    /// Returns a new instance whose url is taken from the standard environment variables if needed.
    pub fn try_with_url_from_env(self) -> Result<Self, ProxyError> {
        self.with_env_aware_url(env::var)
    }

    /// Returns a new instance setting up the url using the provided `env_var` function to get it
    /// from the environment if required. It fails if the url from the environment is not valid.
    fn with_env_aware_url<F>(self, env_var: F) -> Result<Self, ProxyError>
    where
        F: Fn(&'static str) -> Result<String, VarError>,
    {
        if !self.url.is_empty() {
            return Ok(self);
        }
        let url = env_var(HTTPS_PROXY_ENV_NAME)
            .or_else(|_| env_var(HTTP_PROXY_ENV_NAME))
            .unwrap_or_default()
            .as_str()
            .try_into()?;
        Ok(ProxyConfig { url })
    }
}
