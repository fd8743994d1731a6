use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{ExtractionError, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36";

/// Language and region sent with every request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Localization {
    pub language_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

impl Localization {
    pub fn new(language_code: &str, country_code: Option<&str>) -> Self {
        Self {
            language_code: language_code.to_lowercase(),
            country_code: country_code.map(|c| c.to_uppercase()),
        }
    }

    /// Parse a tag such as `en`, `en-GB` or `pt_BR`.
    pub fn from_tag(tag: &str) -> Result<Self> {
        let mut parts = tag.split(['-', '_']);
        let language = parts
            .next()
            .filter(|l| !l.is_empty() && l.chars().all(|c| c.is_ascii_alphabetic()))
            .ok_or_else(|| ExtractionError::parsing("localization", format!("bad tag {tag:?}")))?;
        Ok(Self::new(language, parts.next().filter(|c| !c.is_empty())))
    }

    /// `en-GB` style tag.
    pub fn tag(&self) -> String {
        match &self.country_code {
            Some(country) => format!("{}-{}", self.language_code, country),
            None => self.language_code.clone(),
        }
    }

    pub fn accept_language(&self) -> String {
        match &self.country_code {
            Some(_) => format!("{}, {};q=0.9", self.tag(), self.language_code),
            None => self.language_code.clone(),
        }
    }
}

impl Default for Localization {
    fn default() -> Self {
        Self::new("en", Some("GB"))
    }
}

/// One outgoing request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    pub localization: Localization,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            localization: Localization::default(),
        }
    }

    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::get(url)
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn localization(mut self, localization: &Localization) -> Self {
        self.localization = localization.clone();
        self
    }
}

/// Response handed back by a [`Downloader`], whatever its status.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: String,
    pub headers: HeaderMap,
    /// URL after redirects.
    pub latest_url: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx status into a transport error.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ExtractionError::Http {
                status: self.status,
                url: self.latest_url,
            })
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(ExtractionError::from)
    }
}

/// Transport capability every extractor fetches through.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response>;

    async fn get(&self, url: &str, localization: &Localization) -> Result<Response> {
        self.execute(Request::get(url).localization(localization))
            .await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: HeaderMap,
        localization: &Localization,
    ) -> Result<Response> {
        let request = Request::post(url, serde_json::to_vec(body)?)
            .header(
                reqwest::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )
            .headers(headers)
            .localization(localization);
        self.execute(request).await
    }
}

/// reqwest backed [`Downloader`].
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
    default_headers: HeaderMap,
}

#[derive(Debug, Clone)]
pub struct HttpDownloaderBuilder {
    timeout: Duration,
    user_agent: String,
    headers: HeaderMap,
}

impl Default for HttpDownloaderBuilder {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: HeaderMap::new(),
        }
    }
}

impl HttpDownloaderBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn build(self) -> Result<HttpDownloader> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .cookie_store(true)
            .build()?;

        let mut default_headers = self.headers;
        default_headers.insert(USER_AGENT, HeaderValue::from_str(&self.user_agent)?);

        Ok(HttpDownloader {
            client,
            default_headers,
        })
    }
}

impl HttpDownloader {
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> HttpDownloaderBuilder {
        HttpDownloaderBuilder::default()
    }

    /// Merge default, per-request and localization headers.
    fn request_headers(&self, request: &Request) -> Result<HeaderMap> {
        let mut headers = self.default_headers.clone();
        headers.extend(request.headers.clone());
        if !headers.contains_key(ACCEPT_LANGUAGE) {
            headers.insert(
                ACCEPT_LANGUAGE,
                HeaderValue::from_str(&request.localization.accept_language())?,
            );
        }
        Ok(headers)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn execute(&self, request: Request) -> Result<Response> {
        debug!(method = %request.method, url = %request.url, "sending request");
        let headers = self.request_headers(&request)?;
        let url = request.url.clone();

        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractionError::RequestTimeout(url.clone())
            } else {
                ExtractionError::Network(e)
            }
        })?;

        let status = response.status().as_u16();
        if status == 429 {
            return Err(ExtractionError::ReCaptcha { url });
        }

        let latest_url = response.url().to_string();
        let headers = response.headers().clone();
        let body = response.text().await?;
        trace!(status, bytes = body.len(), url = %latest_url, "received response");

        Ok(Response {
            status,
            body,
            headers,
            latest_url,
        })
    }
}
