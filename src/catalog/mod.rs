use serde::Serialize;
use thiserror::Error;

pub mod glose;
pub mod parse;

pub use parse::ModuleLocator;

/// One renderable row: the label shown in the list and the cover to load for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    display_label: String,
    image_url: String,
}

impl BookRecord {
    pub fn new(title: &str, author: &str, image_url: &str) -> BookRecord {
        BookRecord {
            display_label: format!("{} - {}", title, author),
            image_url: image_url.to_owned(),
        }
    }

    pub fn display_label(&self) -> &str {
        &self.display_label
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("network error: {msg}")]
    NetworkError { msg: String },
    #[error("malformed response: {msg}")]
    MalformedResponse { msg: String },
}

#[async_trait::async_trait]
pub trait Catalog {
    fn id(&self) -> String;
    async fn fetch_books(&self) -> Result<Vec<BookRecord>, CatalogError>;
}
