// src/fetch.rs

use crate::error::{Error, Result};
use crate::model::StructureDocument;
use crate::page::resolve_url;
use log::debug;
use reqwest::Url;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self { status: 200, body: body.into() }
    }

    pub fn not_found() -> Self {
        Self { status: 404, body: String::new() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP GET capability.
///
/// `Err` is reserved for transport failures; a reachable server answering
/// with an error status is an `Ok` response.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse>;

    /// Whether `url` can be loaded at all.
    async fn probe(&self, url: &str) -> Result<bool> {
        Ok(self.get(url).await?.is_success())
    }
}

impl<F: Fetcher> Fetcher for Rc<F> {
    async fn get(&self, url: &str) -> Result<FetchResponse> {
        (**self).get(url).await
    }

    async fn probe(&self, url: &str) -> Result<bool> {
        (**self).probe(url).await
    }
}

/// Fetches a structure document: the path as given first, then once more
/// resolved against the page when the first answer is not a success.
pub async fn fetch_structure<F: Fetcher>(
    fetcher: &F,
    path: &str,
    base: Option<&Url>,
) -> Result<StructureDocument> {
    let first = fetcher
        .get(path)
        .await
        .map_err(|e| as_fetch_error(e, path, None))?;

    let body = if first.is_success() {
        first.body
    } else {
        let alt = resolve_url(path, base);
        debug!("{} answered {}, retrying as {}", path, first.status, alt);

        let second = fetcher
            .get(&alt)
            .await
            .map_err(|e| as_fetch_error(e, path, Some(&alt)))?;
        if !second.is_success() {
            return Err(Error::Fetch {
                path: path.to_string(),
                tried: Some(alt),
                reason: second.status.to_string(),
            });
        }
        second.body
    };

    StructureDocument::from_json(&body)
}

fn as_fetch_error(e: Error, path: &str, tried: Option<&str>) -> Error {
    let reason = match e {
        Error::Fetch { reason, .. } => reason,
        other => other.to_string(),
    };
    Error::Fetch {
        path: path.to_string(),
        tried: tried.map(String::from),
        reason,
    }
}

// --- HttpFetcher ---

/// Maps one origin onto a directory, like a static file server would.
#[derive(Clone, Debug)]
pub struct SiteRoot {
    pub origin: Url,
    pub dir: PathBuf,
}

/// reqwest-backed fetcher; URLs on the site origin are read from disk.
pub struct HttpFetcher {
    client: reqwest::Client,
    site: Option<SiteRoot>,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            site: None,
        }
    }

    pub fn with_site(origin: Url, dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            site: Some(SiteRoot { origin, dir: dir.into() }),
        }
    }

    fn absolute(&self, url: &str) -> Result<Option<Url>> {
        match Url::parse(url) {
            Ok(u) => Ok(Some(u)),
            // Relative paths are served from the site root
            Err(_) => match &self.site {
                Some(site) => site
                    .origin
                    .join(url)
                    .map(Some)
                    .map_err(|e| Error::Url(format!("{}: {}", url, e))),
                None => Ok(None),
            },
        }
    }

    fn local_path(&self, url: &Url) -> Option<PathBuf> {
        if url.scheme() == "file" {
            return url.to_file_path().ok();
        }
        let site = self.site.as_ref()?;
        if url.origin() != site.origin.origin() {
            return None;
        }
        let rel = url.path().trim_start_matches('/');
        Some(site.dir.join(rel))
    }

    fn read_local(path: PathBuf) -> Result<FetchResponse> {
        match fs::read_to_string(&path) {
            Ok(body) => Ok(FetchResponse::ok(body)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(FetchResponse::not_found()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse> {
        let Some(target) = self.absolute(url)? else {
            debug!("no site root to serve {}", url);
            return Ok(FetchResponse::not_found());
        };

        if let Some(path) = self.local_path(&target) {
            debug!("reading {} from {:?}", url, path);
            return Self::read_local(path);
        }

        let resp = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| Error::Fetch { path: url.to_string(), tried: None, reason: e.to_string() })?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Fetch { path: url.to_string(), tried: None, reason: e.to_string() })?;
        Ok(FetchResponse { status, body })
    }

    async fn probe(&self, url: &str) -> Result<bool> {
        let Some(target) = self.absolute(url)? else {
            return Ok(false);
        };

        if let Some(path) = self.local_path(&target) {
            return Ok(path.is_file());
        }

        let resp = self
            .client
            .head(target)
            .send()
            .await
            .map_err(|e| Error::ResourceLoad { src: url.to_string(), reason: e.to_string() })?;
        Ok(resp.status().is_success())
    }
}
