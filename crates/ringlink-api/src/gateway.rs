// HTTP gateway for the vendor cloud
//
// Wraps `reqwest::Client` with host routing, per-endpoint-class header
// composition, a request-scoped timeout, and response classification.
// Endpoint groups (oauth, session, devices, ...) are implemented as
// inherent methods in separate files to keep this module focused on
// transport mechanics.

use std::borrow::Cow;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::auth::{Endpoints, Host, RequestAuth};
use crate::error::Error;
use crate::transport::TransportConfig;

/// API version advertised on every data call.
pub const API_VERSION: u32 = 11;

/// Whether the caller wants the body decoded as JSON or handed back raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Json,
    Raw,
}

/// A successfully classified response body.
#[derive(Debug, Clone)]
pub enum Body {
    /// Decoded JSON. An empty body decodes to `Value::Null`.
    Json(Value),
    /// Raw bytes (image payloads).
    Raw(Bytes),
}

impl Body {
    /// Deserialize a JSON body into `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, Error> {
        match self {
            Self::Json(value) => {
                let preview = preview(&value.to_string());
                serde_json::from_value(value).map_err(|e| Error::Decode {
                    message: e.to_string(),
                    body: preview,
                })
            }
            Self::Raw(bytes) => serde_json::from_slice(&bytes).map_err(|e| Error::Decode {
                message: e.to_string(),
                body: preview(&String::from_utf8_lossy(&bytes)),
            }),
        }
    }

    /// Take the body as bytes, re-encoding JSON if necessary.
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Raw(bytes) => bytes,
            Self::Json(value) => Bytes::from(value.to_string()),
        }
    }
}

/// A single request description: verb, host, path, optional JSON body,
/// and the expected response kind.
#[derive(Debug, Clone)]
pub struct ApiRequest<'a> {
    pub method: Method,
    pub host: Host,
    pub path: Cow<'a, str>,
    /// Caller-supplied identifiers appended after `path`, percent-encoded.
    pub segments: Vec<String>,
    pub body: Option<Value>,
    pub response: ResponseKind,
}

impl<'a> ApiRequest<'a> {
    pub fn new(method: Method, host: Host, path: impl Into<Cow<'a, str>>) -> Self {
        Self {
            method,
            host,
            path: path.into(),
            segments: Vec::new(),
            body: None,
            response: ResponseKind::Json,
        }
    }

    pub fn get(host: Host, path: impl Into<Cow<'a, str>>) -> Self {
        Self::new(Method::GET, host, path)
    }

    pub fn post(host: Host, path: impl Into<Cow<'a, str>>) -> Self {
        Self::new(Method::POST, host, path)
    }

    pub fn put(host: Host, path: impl Into<Cow<'a, str>>) -> Self {
        Self::new(Method::PUT, host, path)
    }

    pub fn patch(host: Host, path: impl Into<Cow<'a, str>>) -> Self {
        Self::new(Method::PATCH, host, path)
    }

    /// Append an identifier as a single escaped path segment.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Attach a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Return the response body as raw bytes instead of JSON.
    pub fn raw(mut self) -> Self {
        self.response = ResponseKind::Raw;
        self
    }
}

/// Raw HTTP gateway for the vendor cloud.
///
/// Cheap to clone (the inner `reqwest::Client` is reference counted).
/// Holds no token material: callers pass a [`RequestAuth`] per request,
/// which keeps token ownership with the session layer.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    endpoints: Endpoints,
    hardware_id: String,
    timeout: Duration,
}

impl HttpGateway {
    /// Create a gateway from a `TransportConfig`.
    ///
    /// `hardware_id` must stay stable for the lifetime of the installation;
    /// the vendor binds session tokens to it.
    pub fn new(
        endpoints: Endpoints,
        hardware_id: impl Into<String>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            endpoints,
            hardware_id: hardware_id.into(),
            timeout: transport.timeout,
        })
    }

    /// Create a gateway with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        endpoints: Endpoints,
        hardware_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            endpoints,
            hardware_id: hardware_id.into(),
            timeout,
        }
    }

    /// The hardware identifier sent with token and session calls.
    pub fn hardware_id(&self) -> &str {
        &self.hardware_id
    }

    /// The configured vendor hosts.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// The request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL: `{host base}/{path}/{segments...}`.
    ///
    /// Segments are escaped, so `/` in an identifier cannot change the
    /// route. `.`, `..` and empty segments are rejected.
    pub(crate) fn url(&self, host: Host, path: &str, segments: &[String]) -> Result<Url, Error> {
        let base = self.endpoints.base(host).as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let mut url = Url::parse(&format!("{base}/{path}"))?;
        if segments.is_empty() {
            return Ok(url);
        }

        if let Some(bad) = segments
            .iter()
            .find(|s| matches!(s.as_str(), "" | "." | ".."))
        {
            return Err(Error::InvalidSegment {
                segment: bad.clone(),
            });
        }
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Request execution ────────────────────────────────────────────

    /// Execute one request and classify the response.
    ///
    /// The whole exchange (send + body read) is bounded by the gateway
    /// timeout; when it elapses the in-flight future is dropped, which
    /// aborts the connection, and [`Error::Timeout`] is returned.
    pub async fn request(
        &self,
        request: ApiRequest<'_>,
        auth: RequestAuth<'_>,
    ) -> Result<Body, Error> {
        let url = self.url(request.host, &request.path, &request.segments)?;
        debug!(method = %request.method, %url, "sending request");

        let builder = self.apply_auth(self.http.request(request.method.clone(), url), auth);
        let builder = match request.body {
            Some(ref body) => builder.json(body),
            None => builder,
        };

        let exchange = async {
            let resp = builder.send().await?;
            Self::classify(resp, &request.path, request.response, auth).await
        };

        if let Ok(result) = tokio::time::timeout(self.timeout, exchange).await {
            result
        } else {
            let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
            warn!(path = %request.path, timeout_ms, "request aborted after timeout");
            Err(Error::Timeout { timeout_ms })
        }
    }

    /// Execute a request and deserialize its JSON body.
    pub(crate) async fn request_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest<'_>,
        auth: RequestAuth<'_>,
    ) -> Result<T, Error> {
        self.request(request, auth).await?.into_json()
    }

    /// Compose headers and query parameters for the endpoint class.
    fn apply_auth(
        &self,
        builder: reqwest::RequestBuilder,
        auth: RequestAuth<'_>,
    ) -> reqwest::RequestBuilder {
        match auth {
            RequestAuth::TokenGrant { mfa_code } => {
                let builder = builder
                    .header("hardware_id", &self.hardware_id)
                    .header("2fa-support", "true");
                match mfa_code {
                    Some(code) => builder.header("2fa-code", code),
                    None => builder,
                }
            }
            RequestAuth::SessionCreate { bearer } => builder
                .bearer_auth(bearer.expose_secret())
                .header("hardware_id", &self.hardware_id),
            RequestAuth::Data(tokens) => builder
                .bearer_auth(tokens.bearer.expose_secret())
                .query(&[
                    ("api_version", API_VERSION.to_string().as_str()),
                    ("auth_token", tokens.session.expose_secret()),
                ]),
            RequestAuth::Image { bearer } => builder
                .bearer_auth(bearer.expose_secret())
                .header("hardware_id", &self.hardware_id),
        }
    }

    /// Map a response onto the error taxonomy, or return its body.
    async fn classify(
        resp: reqwest::Response,
        path: &str,
        kind: ResponseKind,
        auth: RequestAuth<'_>,
    ) -> Result<Body, Error> {
        let status = resp.status();
        let bytes = resp.bytes().await?;
        trace!(%status, len = bytes.len(), "response received");

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                path: path.to_owned(),
            });
        }

        if status.is_client_error() {
            let message = error_message(&bytes);
            if auth.requires_session() {
                debug!(%status, path, "authorization rejected");
                return Err(Error::AuthExpired {
                    status: status.as_u16(),
                    message,
                });
            }
            if status == reqwest::StatusCode::PRECONDITION_FAILED {
                return Err(Error::MfaRequired {
                    delivery: mfa_delivery(&bytes),
                });
            }
            return Err(Error::Credential {
                message: format!("HTTP {status}: {message}"),
            });
        }

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: error_message(&bytes),
            });
        }

        match kind {
            ResponseKind::Raw => Ok(Body::Raw(bytes)),
            ResponseKind::Json if bytes.iter().all(u8::is_ascii_whitespace) => {
                Ok(Body::Json(Value::Null))
            }
            ResponseKind::Json => serde_json::from_slice(&bytes)
                .map(Body::Json)
                .map_err(|e| Error::Decode {
                    message: e.to_string(),
                    body: preview(&String::from_utf8_lossy(&bytes)),
                }),
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// The OAuth host answers `{"error": "...", "error_description": "..."}`;
/// the data hosts use `{"error": "..."}` or plain text.
fn error_message(bytes: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        for key in ["error_description", "error", "message"] {
            if let Some(msg) = value.get(key).and_then(Value::as_str) {
                return msg.to_owned();
            }
        }
    }
    preview(&String::from_utf8_lossy(bytes))
}

/// Describe where the second-factor code went (`"sms to +1xxx"`).
fn mfa_delivery(bytes: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(bytes).ok()?;
    let state = value.get("tsv_state").and_then(Value::as_str);
    let phone = value.get("phone").and_then(Value::as_str);
    match (state, phone) {
        (Some(state), Some(phone)) => Some(format!("{state} to {phone}")),
        (Some(state), None) => Some(state.to_owned()),
        (None, Some(phone)) => Some(phone.to_owned()),
        (None, None) => None,
    }
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}
