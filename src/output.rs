// src/output.rs

use axum::{
    http::header,
    response::{Html, IntoResponse, Response},
};

use crate::{error::AppError, report::options::DownloadFormat, utils::html::escape};

/// Page metadata set by handlers before the body is written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMeta {
    pub url: String,
    pub title: String,
    pub heading: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadMeta {
    pub format: DownloadFormat,
    /// File name without extension.
    pub filename: String,
}

/// Buffered response body with a byte ceiling.
#[derive(Debug)]
pub struct OutputSink {
    body: String,
    limit: usize,
    download: Option<DownloadMeta>,
}

impl OutputSink {
    pub fn new(limit: usize) -> Self {
        Self {
            body: String::new(),
            limit,
            download: None,
        }
    }

    pub fn write(&mut self, chunk: &str) -> Result<(), AppError> {
        if self.body.len() + chunk.len() > self.limit {
            return Err(AppError::InternalServerError(format!(
                "Output exceeds memory limit of {} bytes",
                self.limit
            )));
        }
        self.body.push_str(chunk);
        Ok(())
    }

    /// Raises the ceiling; never lowers it.
    pub fn raise_memory_limit(&mut self, limit: usize) {
        if limit > self.limit {
            tracing::debug!(from = self.limit, to = limit, "Raising output memory limit");
            self.limit = limit;
            self.body.reserve(limit.min(1024 * 1024));
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Switches the sink to file mode; anything written so far is discarded.
    pub fn begin_download(&mut self, meta: DownloadMeta) {
        self.body.clear();
        self.download = Some(meta);
    }

    pub fn download(&self) -> Option<&DownloadMeta> {
        self.download.as_ref()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn into_response(self, page: &PageMeta) -> Response {
        match self.download {
            Some(meta) => {
                let disposition = format!(
                    "attachment; filename=\"{}.{}\"",
                    meta.filename.replace('"', ""),
                    meta.format.extension()
                );
                (
                    [
                        (header::CONTENT_TYPE, meta.format.content_type().to_string()),
                        (header::CONTENT_DISPOSITION, disposition),
                    ],
                    self.body,
                )
                    .into_response()
            }
            None => {
                let canonical = if page.url.is_empty() {
                    String::new()
                } else {
                    format!("<link rel=\"canonical\" href=\"{}\">", escape(&page.url))
                };
                Html(format!(
                    "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title>{}</head>\n<body>\n<h1>{}</h1>\n{}</body></html>\n",
                    escape(&page.title),
                    canonical,
                    escape(&page.heading),
                    self.body
                ))
                .into_response()
            }
        }
    }
}
