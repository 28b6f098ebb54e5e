use std::time::Duration;

use log::debug;
use reqwest::Client;
use url::Url;

use super::parse::{parse_with, ModuleLocator};
use super::{BookRecord, Catalog, CatalogError};

const PREFIX: &str = "glose";

pub const FREE_BOOKS_URL: &str = "https://api.glose.com/v1/booklists/free-books?_version=20150601";

pub struct Glose {
    client: Client,
    url: Url,
    locator: ModuleLocator,
}

impl Glose {
    pub fn new(url: Url, timeout: Duration, locator: ModuleLocator) -> Result<Glose, CatalogError> {
        Ok(Glose {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|err| CatalogError::NetworkError {
                    msg: format!("cannot create reqwest client: {}", err),
                })?,
            url,
            locator,
        })
    }

    pub async fn fetch_raw(&self) -> Result<String, CatalogError> {
        debug!("GET {}", self.url);
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|err| CatalogError::NetworkError {
                msg: format!("Failed to reach {}. {}", PREFIX, err),
            })?
            .error_for_status()
            .map_err(|err| CatalogError::NetworkError {
                msg: format!("{} answered with an error. {}", PREFIX, err),
            })?;

        response
            .text()
            .await
            .map_err(|err| CatalogError::NetworkError {
                msg: format!("Failed to read response body. {}", err),
            })
    }
}

#[async_trait::async_trait]
impl Catalog for Glose {
    fn id(&self) -> String {
        PREFIX.to_owned()
    }

    async fn fetch_books(&self) -> Result<Vec<BookRecord>, CatalogError> {
        let raw = self.fetch_raw().await?;
        parse_with(&raw, self.locator)
    }
}
