//! The per-request response pipeline.
//!
//! Drives one inbound request to exactly one terminal branch: a redirect, an
//! error body, or rendered content. Response defaults are applied before
//! resolution starts, so a failure mid-resolution still leaves sane values.

use std::sync::Arc;

use axum::http::StatusCode;
use bytes::Bytes;
use tracing::{debug, error, info};
use url::Url;

use crate::domain::request::ServerRequest;
use crate::domain::response::{ContentError, ResponseData};

use super::render::Renderer;
use super::resolver::ContentResolver;
use super::site::{RenderErrorMode, Site};

/// Transport-agnostic response produced by the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl PipelineResponse {
    /// Set a header, replacing any existing value for the same name.
    fn set_header(&mut self, name: &str, value: String) {
        if let Some(existing) = self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            existing.1 = value;
        } else {
            self.headers.push((name.to_string(), value));
        }
    }
}

/// Orchestrates one inbound request end-to-end for a single site.
pub struct RequestPipeline {
    site: Arc<Site>,
    resolver: Arc<dyn ContentResolver>,
    renderer: Arc<dyn Renderer>,
}

impl RequestPipeline {
    pub fn new(
        site: Arc<Site>,
        resolver: Arc<dyn ContentResolver>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            site,
            resolver,
            renderer,
        }
    }

    pub fn site(&self) -> &Arc<Site> {
        &self.site
    }

    /// Drive one request to its terminal branch. Always produces a response.
    pub async fn handle(&self, request: &ServerRequest) -> PipelineResponse {
        debug!(
            target: "facciata::pipeline",
            site = %self.site.id,
            method = %request.method,
            path = %request.path,
            "handling request"
        );

        let router = &self.site.config.router;
        let mut response = PipelineResponse {
            status: StatusCode::from_u16(router.status_code).unwrap_or(StatusCode::OK),
            headers: router
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            body: Bytes::new(),
        };
        response.set_header(
            "cache-control",
            format!("max-age={}", router.expires_seconds),
        );

        // Trailing-slash normalization skips resolution outright.
        let result = if router.trailing_slash_fix && needs_trailing_slash_fix(&request.path) {
            let mut data = ResponseData::default();
            data.state.redirect = Some(request.path_with_query());
            Ok(data)
        } else {
            self.resolver.resolve(&self.site, request).await
        };

        let data = match result {
            Ok(data) => data,
            Err(err) => {
                let error = ContentError::with_status(500, err.to_string());
                return self
                    .report_error(error, ResponseData::default(), response)
                    .await;
            }
        };

        if let Some(redirect) = data.state.redirect.clone() {
            return self.redirect(request, &data, redirect, response);
        }

        if let Some(error) = data.state.error.clone() {
            return self.report_error(error, data, response).await;
        }

        self.respond(request, data, response).await
    }

    fn redirect(
        &self,
        request: &ServerRequest,
        data: &ResponseData,
        redirect: String,
        mut response: PipelineResponse,
    ) -> PipelineResponse {
        let location = if is_absolute_url(&redirect) {
            redirect
        } else {
            format!("{}{}", request.host_url, redirect)
        };
        let location = fix_trailing_slash(&location);

        let status = data
            .state
            .status_code
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::MOVED_PERMANENTLY);

        info!(
            target: "facciata::pipeline",
            site = %self.site.id,
            status = status.as_u16(),
            location = %location,
            "redirecting"
        );

        response.status = status;
        response.set_header("location", location);
        response.body = Bytes::new();
        response
    }

    async fn report_error(
        &self,
        error: ContentError,
        mut data: ResponseData,
        mut response: PipelineResponse,
    ) -> PipelineResponse {
        let status = error.status();

        error!(
            target: "facciata::pipeline",
            site = %self.site.id,
            status,
            error = %error,
            "request failed"
        );

        let mode = self.site.config.render.render_error;

        data.state.status_code = Some(status);
        data.state.meta = Some(serde_json::json!({ "template": "error" }));
        data.state.error = match mode {
            RenderErrorMode::Full => Some(error.clone()),
            RenderErrorMode::Off | RenderErrorMode::Short => None,
        };

        let fallback =
            serde_json::to_string(&error).unwrap_or_else(|_| String::from("{}"));

        let body = if mode == RenderErrorMode::Off {
            fallback
        } else {
            match self.renderer.render(&data).await {
                Ok(body) => body,
                Err(err) => {
                    error!(
                        target: "facciata::pipeline",
                        site = %self.site.id,
                        error = %err,
                        "error view render failed"
                    );
                    fallback
                }
            }
        };

        response.status =
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        response.body = Bytes::from(body);
        response
    }

    async fn respond(
        &self,
        request: &ServerRequest,
        data: ResponseData,
        mut response: PipelineResponse,
    ) -> PipelineResponse {
        let body = if request.is_mutating() {
            String::new()
        } else {
            match self.renderer.render(&data).await {
                Ok(body) => body,
                Err(err) => {
                    let error = ContentError::with_status(500, err.to_string());
                    return self
                        .report_error(error, ResponseData::default(), response)
                        .await;
                }
            }
        };

        if let Some(expires) = data.state.expires_seconds {
            response.set_header("cache-control", format!("max-age={expires}"));
        }
        if let Some(status) = data
            .state
            .status_code
            .and_then(|code| StatusCode::from_u16(code).ok())
        {
            response.status = status;
        }
        for (name, value) in &data.state.headers {
            response.set_header(name, value.clone());
        }
        response.set_header("content-length", body.len().to_string());

        response.body = Bytes::from(body);
        response
    }
}

/// A path needs fixing when it ends with `/` but is not the root.
fn needs_trailing_slash_fix(path: &str) -> bool {
    path.len() > 1 && path.ends_with('/')
}

/// Strip a trailing slash from the path component, preserving the query.
fn fix_trailing_slash(location: &str) -> String {
    let (path, query) = match location.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (location, None),
    };

    let trimmed = if path.len() > 1 && path.ends_with('/') {
        &path[..path.len() - 1]
    } else {
        path
    };

    match query {
        Some(query) => format!("{trimmed}?{query}"),
        None => trimmed.to_string(),
    }
}

fn is_absolute_url(location: &str) -> bool {
    Url::parse(location).is_ok()
}
