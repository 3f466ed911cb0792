//! Single-request transport and response classification.

use crate::client::Client;
use crate::error::Error;
use crate::types::{ApiError, Reply};
use bytes::Bytes;
use http::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const APPLICATION_JSON: &str = "application/json";

/// HTTP methods the API uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// Where a request goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// Path on the configured service host, sent with credentials.
    Relative(String),
    /// Fully-qualified `http`/`https` URL, sent without credentials.
    Absolute(Url),
}

impl Target {
    pub fn parse(target: &str) -> Result<Self, Error> {
        match Url::parse(target) {
            Ok(url) => match url.scheme() {
                "http" | "https" if url.host_str().is_some_and(|h| !h.is_empty()) => {
                    Ok(Target::Absolute(url))
                }
                _ => Err(Error::InvalidTarget(target.to_string())),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(Target::Relative(target.to_string()))
            }
            Err(err) => Err(Error::InvalidUrl(err)),
        }
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self, Target::Absolute(_))
    }
}

/// Description of one API request.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub target: String,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl RequestSpec {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            body: None,
            query: Vec::new(),
            timeout: None,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::Get, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::Post, target)
    }

    /// Set the JSON body. Only POST requests carry it.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Classified outcome of exactly one HTTP exchange.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseOutcome {
    /// 200, with the JSON body or the raw text when it did not parse.
    Success(Value),
    /// 401
    Unauthorized(ApiError),
    /// 302; the caller re-issues the identical request.
    Redirect,
    /// Any other status.
    HardFailure(u16),
}

impl Client {
    /// Perform one request and classify the response.
    ///
    /// Relative targets go to the base URL with Basic auth; absolute
    /// `http`/`https` targets go straight to their host without it.
    pub async fn execute(&self, request: &RequestSpec) -> Result<ResponseOutcome, Error> {
        let target = Target::parse(&request.target)?;
        let url = match &target {
            Target::Absolute(url) => url.clone(),
            Target::Relative(path) => self.resolve(path)?,
        };

        let mut req = self.inner.request(request.method.into(), url.clone());

        for (key, value) in self.default_headers.iter() {
            req = req.header(key.clone(), value.clone());
        }
        req = req
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .header(USER_AGENT, self.user_agent.clone());
        if !target.is_absolute() {
            req = req.header(AUTHORIZATION, self.authorization.clone());
        }

        if !request.query.is_empty() {
            req = req.query(&request.query);
        }

        if let Some(timeout) = request.timeout.or(self.request_timeout) {
            req = req.timeout(timeout);
        }

        if request.method == Method::Post {
            if let Some(body) = &request.body {
                let payload = Bytes::from(serde_json::to_vec(body)?);
                req = req.header(CONTENT_LENGTH, payload.len()).body(payload);
            }
        }

        debug!(method = %request.method, %url, "sending request");
        let resp = req.send().await?;
        classify(resp, &request.target).await
    }

    /// Perform a request, re-issuing it on 302 and turning hard failures
    /// into errors.
    ///
    /// The re-issued request targets the original path; any `Location`
    /// header is ignored.
    pub async fn send(&self, request: &RequestSpec) -> Result<Reply, Error> {
        let mut redirects = 0;
        loop {
            match self.execute(request).await? {
                ResponseOutcome::Success(body) => return Ok(Reply::Success(body)),
                ResponseOutcome::Unauthorized(err) => return Ok(Reply::Unauthorized(err)),
                ResponseOutcome::Redirect => {
                    if redirects >= self.max_redirects {
                        return Err(Error::TooManyRedirects {
                            target: request.target.clone(),
                            redirects,
                        });
                    }
                    redirects += 1;
                    debug!(path = %request.target, redirects, "redirected, re-issuing");
                }
                ResponseOutcome::HardFailure(status) => {
                    return Err(Error::HardFailure {
                        status,
                        target: request.target.clone(),
                    });
                }
            }
        }
    }

    /// GET a target.
    pub async fn get(&self, target: &str) -> Result<Reply, Error> {
        self.send(&RequestSpec::get(target)).await
    }

    /// GET a target with query parameters.
    pub async fn get_with_query<K, V>(&self, target: &str, query: &[(K, V)]) -> Result<Reply, Error>
    where
        K: AsRef<str>,
        V: ToString,
    {
        let request = query
            .iter()
            .fold(RequestSpec::get(target), |req, (k, v)| req.query(k.as_ref(), v.to_string()));
        self.send(&request).await
    }

    /// POST to a target, with an optional JSON body.
    pub async fn post(&self, target: &str, body: Option<Value>) -> Result<Reply, Error> {
        let mut request = RequestSpec::post(target);
        request.body = body;
        self.send(&request).await
    }
}

async fn classify(resp: reqwest::Response, target: &str) -> Result<ResponseOutcome, Error> {
    let status = resp.status();
    debug!(status = status.as_u16(), path = target, "response");

    match status {
        StatusCode::OK => {
            let text = resp.text().await?;
            Ok(ResponseOutcome::Success(parse_body(text)))
        }
        StatusCode::UNAUTHORIZED => Ok(ResponseOutcome::Unauthorized(ApiError::unauthorized())),
        StatusCode::FOUND => Ok(ResponseOutcome::Redirect),
        _ => {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), path = target, body = %body, "request failed");
            Ok(ResponseOutcome::HardFailure(status.as_u16()))
        }
    }
}

/// JSON when it parses, the raw text otherwise.
pub(crate) fn parse_body(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
