use std::{sync::Arc, time::Duration};

use cached::{Cached, TimedCache};
use log::debug;
use reqwest::{header::CONTENT_TYPE, Client};
use tokio::sync::Mutex;
use url::Url;

use crate::catalog::CatalogError;

const COVER_LIFESPAN_SECS: u64 = 600;

pub use binder::{CoverBinder, LoadedCover};

mod binder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cover {
    pub url: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Cover {
    /// File extension to store the cover under, from the content type first and
    /// the URL path second.
    pub fn extension(&self) -> &str {
        let from_type = match self.content_type.as_deref() {
            Some(t) if t.starts_with("image/jpeg") => Some("jpg"),
            Some(t) if t.starts_with("image/png") => Some("png"),
            Some(t) if t.starts_with("image/gif") => Some("gif"),
            Some(t) if t.starts_with("image/webp") => Some("webp"),
            _ => None,
        };
        from_type
            .or_else(|| {
                let name = self.url.rsplit('/').next()?;
                let name = name.split(['?', '#']).next()?;
                let (_, ext) = name.rsplit_once('.')?;
                (!ext.is_empty() && ext.len() <= 4).then_some(ext)
            })
            .unwrap_or("img")
    }
}

/// Downloads covers and keeps them in memory for a while.
///
/// Clones share one cache; separate loaders never see each other's covers.
#[derive(Clone)]
pub struct CoverLoader {
    client: Client,
    cache: Arc<Mutex<TimedCache<String, Cover>>>,
}

impl CoverLoader {
    pub fn new(timeout: Duration) -> Result<CoverLoader, CatalogError> {
        Ok(CoverLoader {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|err| CatalogError::NetworkError {
                    msg: format!("cannot create reqwest client: {}", err),
                })?,
            cache: Arc::new(Mutex::new(TimedCache::with_lifespan(COVER_LIFESPAN_SECS))),
        })
    }

    pub async fn fetch(&self, url: &str) -> Result<Cover, CatalogError> {
        let url = Url::parse(url).map_err(|err| CatalogError::MalformedResponse {
            msg: format!("invalid image url {:?}: {}", url, err),
        })?;

        let key = url.to_string();
        if let Some(cover) = self.cache.lock().await.cache_get(&key) {
            return Ok(cover.clone());
        }

        let cover = fetch_cover(&self.client, &url).await?;
        self.cache.lock().await.cache_set(key, cover.clone());
        Ok(cover)
    }
}

async fn fetch_cover(client: &Client, url: &Url) -> Result<Cover, CatalogError> {
    debug!("GET {}", url);
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|err| CatalogError::NetworkError {
            msg: format!("Failed to reach {}. {}", url, err),
        })?
        .error_for_status()
        .map_err(|err| CatalogError::NetworkError {
            msg: format!("Failed to load cover. {}", err),
        })?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let bytes = response
        .bytes()
        .await
        .map_err(|err| CatalogError::NetworkError {
            msg: format!("Failed to read cover body. {}", err),
        })?;

    Ok(Cover {
        url: url.to_string(),
        content_type,
        bytes: bytes.to_vec(),
    })
}
