//! HTTP client and configuration.

use crate::api::{AccountApi, GroupsApi, MessagesApi, TopicsApi};
use crate::error::{Error, InvalidHeaderError};
use crate::live::{LiveBuilder, LiveEnd, LiveEvent};
use crate::types::{Credentials, Cursor};
use reqwest::header::{HeaderMap, HeaderValue};
use std::time::Duration;
use url::Url;

/// Service endpoint used for relative API paths.
pub const DEFAULT_BASE_URL: &str = "https://convore.com/";

/// Default number of times a 302 is answered by re-issuing the request.
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

/// A Convore API client.
///
/// The client is cloneable and can be shared across threads.
/// It manages connection pooling.
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: reqwest::Client,
    pub(crate) base_url: Url,
    pub(crate) credentials: Credentials,
    pub(crate) authorization: HeaderValue,
    pub(crate) user_agent: HeaderValue,
    pub(crate) default_headers: HeaderMap,
    pub(crate) request_timeout: Option<Duration>,
    pub(crate) poll_timeout: Option<Duration>,
    pub(crate) max_redirects: u32,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("credentials", &self.credentials)
            .field("default_headers", &self.default_headers)
            .field("request_timeout", &self.request_timeout)
            .field("poll_timeout", &self.poll_timeout)
            .field("max_redirects", &self.max_redirects)
            .finish()
    }
}

impl Client {
    /// Create a client for the default host with the given account.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client fails to build. Use `Client::builder()`
    /// for fallible construction.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        ClientBuilder::new()
            .credentials(username, password)
            .build()
            .expect("Failed to build default HTTP client")
    }

    /// Create a client builder for customization.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// A copy of this client that authenticates as someone else.
    ///
    /// The connection pool and every other setting are shared.
    pub fn with_credentials(&self, credentials: Credentials) -> Result<Client, Error> {
        let authorization = credentials.header_value()?;
        Ok(Client {
            credentials,
            authorization,
            ..self.clone()
        })
    }

    pub fn account(&self) -> AccountApi {
        AccountApi::new(self.clone())
    }

    pub fn groups(&self) -> GroupsApi {
        GroupsApi::new(self.clone())
    }

    pub fn topics(&self) -> TopicsApi {
        TopicsApi::new(self.clone())
    }

    pub fn messages(&self) -> MessagesApi {
        MessagesApi::new(self.clone())
    }

    /// Configure a live activity stream.
    ///
    /// No network request is made until the stream is polled.
    pub fn live(&self) -> LiveBuilder {
        LiveBuilder::new(self.clone())
    }

    /// Follow the live activity stream, resuming after `cursor` if given.
    ///
    /// Runs until the credentials are rejected or an error ends the stream.
    /// Use [`Client::live`] to attach a cancellation token.
    pub async fn start_live<F>(&self, handler: F, cursor: Option<Cursor>) -> Result<LiveEnd, Error>
    where
        F: FnMut(LiveEvent),
    {
        let mut builder = self.live();
        if let Some(cursor) = cursor {
            builder = builder.cursor(cursor);
        }
        builder.build().run(handler).await
    }

    /// Resolve a relative API path against the base URL.
    pub(crate) fn resolve(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }
}

/// Builder for configuring a Client.
#[must_use = "builders do nothing unless you call .build()"]
pub struct ClientBuilder {
    base_url: String,
    credentials: Option<Credentials>,
    user_agent: Option<String>,
    default_headers: HeaderMap,
    request_timeout: Option<Duration>,
    poll_timeout: Option<Duration>,
    max_redirects: u32,
}

impl ClientBuilder {
    /// Create a new client builder.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials: None,
            user_agent: None,
            default_headers: HeaderMap::new(),
            request_timeout: None,
            poll_timeout: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    /// Set the account used to authenticate relative API paths.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Override the service endpoint for relative paths.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Add a default header for all requests.
    ///
    /// Invalid header names or values are silently ignored. Use
    /// [`try_default_header`](Self::try_default_header) if you need error handling.
    pub fn default_header(mut self, key: &str, value: &str) -> Self {
        if let (Ok(name), Ok(val)) = (
            reqwest::header::HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.default_headers.insert(name, val);
        }
        self
    }

    /// Add a default header, returning an error if the name or value is invalid.
    pub fn try_default_header(
        mut self,
        key: &str,
        value: &str,
    ) -> std::result::Result<Self, InvalidHeaderError> {
        let name = reqwest::header::HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| InvalidHeaderError::InvalidName(key.to_string()))?;
        let val = HeaderValue::from_str(value)
            .map_err(|_| InvalidHeaderError::InvalidValue(value.to_string()))?;
        self.default_headers.insert(name, val);
        Ok(self)
    }

    /// Set the timeout for ordinary API requests. Unset by default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the client-side timeout for live long-poll requests.
    ///
    /// Unset by default: the server decides when a long poll returns. When
    /// unset, live requests fall back to the request timeout, if any.
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }

    /// How many consecutive 302 responses to answer by re-issuing.
    pub fn max_redirects(mut self, max: u32) -> Self {
        self.max_redirects = max;
        self
    }

    /// Build the client.
    ///
    /// Fails without credentials, on an unparseable base URL, or when the
    /// underlying HTTP client fails to build (e.g., TLS configuration issues).
    pub fn build(self) -> Result<Client, Error> {
        let credentials = self
            .credentials
            .ok_or_else(|| Error::Config("credentials are required".to_string()))?;
        let authorization = credentials.header_value()?;

        let mut base_url = Url::parse(&self.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("{} cannot be a base url", self.base_url)));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("convore-rs/{}", env!("CARGO_PKG_VERSION")));
        let user_agent = HeaderValue::from_str(&user_agent)
            .map_err(|_| InvalidHeaderError::InvalidValue(user_agent.clone()))?;

        // 302 is classified by the transport, never followed here.
        let inner = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Client {
            inner,
            base_url,
            credentials,
            authorization,
            user_agent,
            default_headers: self.default_headers,
            request_timeout: self.request_timeout,
            poll_timeout: self.poll_timeout,
            max_redirects: self.max_redirects,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
