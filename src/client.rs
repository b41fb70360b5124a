//! Submission controller: reads the form, posts it, renders the reply.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::request::{self, SubmissionRequest};
use crate::response::{RenderedOutput, Resolution, ResponseError};
use crate::surface::DocumentSurface;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/";
pub const DEFAULT_ENDPOINT: &str = "api/clusters";
const ERROR_BODY_PREVIEW: usize = 200;

/// Status line and body of a completed exchange, whatever the status.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid server url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// One form POST to the clustering endpoint.
#[async_trait]
pub trait ClusterTransport: Send + Sync {
    async fn post_form(&self, body: String) -> Result<RawResponse, TransportError>;
}

/// What to do with a reply whose status is not 2xx.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum StatusPolicy {
    /// Report the status as an error without parsing the body.
    #[default]
    Strict,
    /// Parse the body regardless of status.
    Lenient,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Resolved against `base_url` the way a page resolves a relative link.
    pub endpoint: String,
    pub status_policy: StatusPolicy,
    /// `None` waits for the server indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            status_policy: StatusPolicy::default(),
            timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn endpoint_url(&self) -> Result<Url, TransportError> {
        Url::parse(&self.base_url)
            .and_then(|base| base.join(&self.endpoint))
            .map_err(|source| TransportError::InvalidUrl {
                url: format!("{}{}", self.base_url, self.endpoint),
                source,
            })
    }
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let url = config.endpoint_url()?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(TransportError::Client)?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ClusterTransport for HttpTransport {
    async fn post_form(&self, body: String) -> Result<RawResponse, TransportError> {
        let request_error = |source: reqwest::Error| TransportError::Request {
            url: self.url.to_string(),
            source,
        };
        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, request::CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(request_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(request_error)?;
        Ok(RawResponse::new(status, body.to_vec()))
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("server answered HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error(transparent)]
    Response(#[from] ResponseError),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SubmitOutcome {
    /// The document was blank; nothing was sent.
    Skipped,
    Rendered(RenderedOutput),
}

#[derive(Debug, Clone)]
pub struct SubmissionController<T> {
    transport: T,
    status_policy: StatusPolicy,
}

impl SubmissionController<HttpTransport> {
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        Ok(Self::new(HttpTransport::new(config)?, config.status_policy))
    }
}

impl<T: ClusterTransport> SubmissionController<T> {
    pub fn new(transport: T, status_policy: StatusPolicy) -> Self {
        Self {
            transport,
            status_policy,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Reads the form into a request, or `None` when the document is blank.
    pub fn prepare<S>(&self, surface: &S) -> Option<SubmissionRequest>
    where
        S: DocumentSurface + ?Sized,
    {
        let document = surface.document_text();
        if document
            .trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}')
            .is_empty()
        {
            warn!("Empty string submitted.");
            return None;
        }
        Some(SubmissionRequest::new(
            document,
            surface.selected_model(),
            surface.automatic_mention_detection(),
        ))
    }

    /// Sends exactly one request and validates the reply.
    pub async fn submit(&self, request: &SubmissionRequest) -> Result<Resolution, SubmitError> {
        let body = request.encode_form();
        debug!(
            model = request.model,
            automatic = request.automatic_mention_detection,
            bytes = body.len(),
            "posting document"
        );
        let response = self.transport.post_form(body).await?;
        if !response.is_success() && self.status_policy == StatusPolicy::Strict {
            return Err(SubmitError::HttpStatus {
                status: response.status,
                body: preview(&response.body),
            });
        }
        let resolution = Resolution::from_json(&response.body)?;
        let summary = resolution.summary();
        info!(
            status = response.status,
            mentions = summary.mentions,
            clusters = summary.clusters,
            singletons = summary.singletons,
            "resolution received"
        );
        Ok(resolution)
    }

    /// Handles one form submission end to end.
    ///
    /// Both output areas are replaced on success. On failure the error text
    /// replaces the mentions output, the clusters output is cleared, and the
    /// error is returned as well.
    pub async fn handle_submit<S>(&self, surface: &mut S) -> Result<SubmitOutcome, SubmitError>
    where
        S: DocumentSurface + ?Sized,
    {
        let Some(request) = self.prepare(surface) else {
            return Ok(SubmitOutcome::Skipped);
        };
        match self.submit(&request).await {
            Ok(resolution) => {
                let output = resolution.render();
                surface.set_mentions_output(&output.mentions);
                surface.set_clusters_output(&output.clusters);
                Ok(SubmitOutcome::Rendered(output))
            }
            Err(err) => {
                warn!(error = %err, "submission failed");
                render_failure(surface, &err);
                Err(err)
            }
        }
    }
}

pub fn render_failure<S>(surface: &mut S, error: &SubmitError)
where
    S: DocumentSurface + ?Sized,
{
    surface.set_mentions_output(&format!("Error: {error}"));
    surface.set_clusters_output("");
}

fn preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    match trimmed.char_indices().nth(ERROR_BODY_PREVIEW) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
