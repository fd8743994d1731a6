//! Scripted transport shared by the integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mediafetch::download::{Downloader, Request, Response};
use mediafetch::{ExtractionError, ExtractorContext, Result};
use reqwest::header::HeaderMap;

struct Route {
    pattern: String,
    status: u16,
    body: String,
}

/// Answers each request with the first route whose pattern occurs in the
/// URL or the request body, and records every URL it was asked for.
#[derive(Default)]
pub struct ScriptedDownloader {
    routes: Vec<Route>,
    urls: Mutex<Vec<String>>,
}

impl ScriptedDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, pattern: &str, body: impl Into<String>) -> Self {
        self.routes.push(Route {
            pattern: pattern.to_string(),
            status: 200,
            body: body.into(),
        });
        self
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    pub fn count(&self, fragment: &str) -> usize {
        self.urls().iter().filter(|u| u.contains(fragment)).count()
    }

    pub fn into_context(self) -> (ExtractorContext, Arc<ScriptedDownloader>) {
        let downloader = Arc::new(self);
        (ExtractorContext::new(downloader.clone()), downloader)
    }
}

#[async_trait]
impl Downloader for ScriptedDownloader {
    async fn execute(&self, request: Request) -> Result<Response> {
        let body = request
            .body
            .as_deref()
            .map(String::from_utf8_lossy)
            .unwrap_or_default()
            .into_owned();
        self.urls.lock().unwrap().push(request.url.clone());

        let route = self
            .routes
            .iter()
            .find(|r| request.url.contains(&r.pattern) || body.contains(&r.pattern))
            .ok_or_else(|| ExtractionError::Transport(format!("no route for {}", request.url)))?;
        Ok(Response {
            status: route.status,
            body: route.body.clone(),
            headers: HeaderMap::new(),
            latest_url: request.url,
        })
    }
}
