use std::{fmt, str::FromStr};

use serde::Deserialize;
use serde_json::Value;

use super::{BookRecord, CatalogError};

#[derive(Deserialize)]
struct CatalogResponse {
    modules: Vec<Value>,
}

#[derive(Deserialize)]
struct BooksModule {
    books: Vec<RawBook>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBook {
    title: String,
    #[serde(default)]
    authors: Option<Vec<Value>>,
    large_image: String,
}

/// Where the books module sits inside `modules`.
///
/// The catalog has always served the books as the second module, so
/// `Index(1)` is the default. `FirstWithBooks` picks the first module that
/// carries a `books` array instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleLocator {
    Index(usize),
    FirstWithBooks,
}

impl Default for ModuleLocator {
    fn default() -> Self {
        ModuleLocator::Index(1)
    }
}

impl FromStr for ModuleLocator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "auto" {
            return Ok(ModuleLocator::FirstWithBooks);
        }
        s.parse()
            .map(ModuleLocator::Index)
            .map_err(|_| format!("expected a module index or \"auto\", got {:?}", s))
    }
}

impl fmt::Display for ModuleLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleLocator::Index(i) => write!(f, "{}", i),
            ModuleLocator::FirstWithBooks => f.write_str("auto"),
        }
    }
}

#[allow(dead_code)]
pub fn parse(raw: &str) -> Result<Vec<BookRecord>, CatalogError> {
    parse_with(raw, ModuleLocator::default())
}

pub fn parse_with(raw: &str, locator: ModuleLocator) -> Result<Vec<BookRecord>, CatalogError> {
    let response = serde_json::from_str::<CatalogResponse>(raw).map_err(malformed)?;

    let module = match locator {
        ModuleLocator::Index(i) => response.modules.into_iter().nth(i).ok_or_else(|| {
            CatalogError::MalformedResponse {
                msg: format!("expected a module at index {}", i),
            }
        })?,
        ModuleLocator::FirstWithBooks => response
            .modules
            .into_iter()
            .find(|m| m.get("books").is_some_and(Value::is_array))
            .ok_or_else(|| CatalogError::MalformedResponse {
                msg: "no module carries a books list".to_owned(),
            })?,
    };

    let module = serde_json::from_value::<BooksModule>(module).map_err(malformed)?;

    module
        .books
        .into_iter()
        .map(|book| -> Result<BookRecord, CatalogError> {
            let author = match book.authors.as_deref() {
                // only the first author is read
                Some([first, ..]) => {
                    first
                        .get("name")
                        .and_then(Value::as_str)
                        .ok_or_else(|| CatalogError::MalformedResponse {
                            msg: format!("first author of {:?} has no name", book.title),
                        })?
                }
                _ => "",
            };
            Ok(BookRecord::new(&book.title, author, &book.large_image))
        })
        .collect()
}

fn malformed(err: serde_json::Error) -> CatalogError {
    CatalogError::MalformedResponse {
        msg: err.to_string(),
    }
}
