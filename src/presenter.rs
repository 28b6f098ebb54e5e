use log::{info, warn};

use crate::catalog::{BookRecord, Catalog, CatalogError};

pub const ERROR_MESSAGE: &str = "An error occurred while loading the books. Please try again later.";
pub const OPEN_PLACEHOLDER: &str = "TODO: Open the book when we click on it";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    Books(Vec<BookRecord>),
    Error,
}

pub struct Presenter<C> {
    catalog: C,
    state: ViewState,
}

impl<C: Catalog> Presenter<C> {
    pub fn new(catalog: C) -> Presenter<C> {
        Presenter {
            catalog,
            state: ViewState::Loading,
        }
    }

    #[allow(dead_code)]
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn records(&self) -> &[BookRecord] {
        match &self.state {
            ViewState::Books(books) => books,
            _ => &[],
        }
    }

    /// Fetches only when no records are held yet.
    pub async fn load(&mut self) -> Result<&ViewState, CatalogError> {
        if matches!(self.state, ViewState::Books(_)) {
            return Ok(&self.state);
        }
        self.refresh().await
    }

    /// Drops the current list and fetches a fresh one.
    ///
    /// On failure the view switches to the error state and the error is handed
    /// back so the caller can report it.
    pub async fn refresh(&mut self) -> Result<&ViewState, CatalogError> {
        self.state = ViewState::Loading;

        match self.catalog.fetch_books().await {
            Ok(books) => {
                info!("loaded {} books from {}", books.len(), self.catalog.id());
                self.state = ViewState::Books(books);
                Ok(&self.state)
            }
            Err(err) => {
                warn!("Failed to load books from {}: {}", self.catalog.id(), err);
                self.state = ViewState::Error;
                Err(err)
            }
        }
    }

    pub fn click(&self, position: usize) -> Option<&'static str> {
        self.records().get(position).map(|_| OPEN_PLACEHOLDER)
    }

    pub fn render(&self) -> String {
        match &self.state {
            ViewState::Loading => "Loading...".to_owned(),
            ViewState::Error => ERROR_MESSAGE.to_owned(),
            ViewState::Books(books) => books
                .iter()
                .enumerate()
                .map(|(i, b)| format!("{:>3}. {}\n     {}", i, b.display_label(), b.image_url()))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use super::*;

    struct Scripted {
        calls: AtomicUsize,
        responses: Mutex<Vec<Result<Vec<BookRecord>, CatalogError>>>,
    }

    impl Scripted {
        fn new(mut responses: Vec<Result<Vec<BookRecord>, CatalogError>>) -> Scripted {
            responses.reverse();
            Scripted {
                calls: AtomicUsize::new(0),
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait::async_trait]
    impl Catalog for Scripted {
        fn id(&self) -> String {
            "scripted".to_owned()
        }

        async fn fetch_books(&self) -> Result<Vec<BookRecord>, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses.lock().unwrap().pop().unwrap_or(Ok(vec![]))
        }
    }

    fn dune() -> BookRecord {
        BookRecord::new("Dune", "Herbert", "http://x/d.jpg")
    }

    fn emma() -> BookRecord {
        BookRecord::new("Emma", "", "http://x/e.jpg")
    }

    #[tokio::test]
    async fn starts_loading_then_shows_books() {
        let mut presenter = Presenter::new(Scripted::new(vec![Ok(vec![dune()])]));
        assert_eq!(presenter.state(), &ViewState::Loading);
        assert_eq!(presenter.render(), "Loading...");

        presenter.load().await.unwrap();
        assert_eq!(presenter.records(), &[dune()]);
        assert_eq!(
            presenter.render(),
            "  0. Dune - Herbert\n     http://x/d.jpg"
        );
    }

    #[tokio::test]
    async fn load_keeps_existing_records() {
        let mut presenter = Presenter::new(Scripted::new(vec![Ok(vec![dune()]), Ok(vec![emma()])]));
        presenter.load().await.unwrap();
        presenter.load().await.unwrap();
        assert_eq!(presenter.catalog.calls.load(Ordering::SeqCst), 1);
        assert_eq!(presenter.records(), &[dune()]);
    }

    #[tokio::test]
    async fn refresh_replaces_the_list() {
        let mut presenter =
            Presenter::new(Scripted::new(vec![Ok(vec![dune(), emma()]), Ok(vec![emma()])]));
        presenter.load().await.unwrap();
        presenter.refresh().await.unwrap();
        assert_eq!(presenter.records(), &[emma()]);
    }

    #[tokio::test]
    async fn failure_shows_error_without_records() {
        let mut presenter = Presenter::new(Scripted::new(vec![
            Ok(vec![dune()]),
            Err(CatalogError::MalformedResponse {
                msg: "no modules".to_owned(),
            }),
        ]));
        presenter.load().await.unwrap();
        assert!(presenter.refresh().await.is_err());
        assert_eq!(presenter.state(), &ViewState::Error);
        assert!(presenter.records().is_empty());
        assert_eq!(presenter.render(), ERROR_MESSAGE);
        assert_eq!(presenter.click(0), None);
    }

    #[tokio::test]
    async fn network_and_parse_failures_look_the_same() {
        let mut presenter = Presenter::new(Scripted::new(vec![Err(CatalogError::NetworkError {
            msg: "refused".to_owned(),
        })]));
        assert!(presenter.load().await.is_err());
        assert_eq!(presenter.render(), ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn click_on_existing_row_gives_placeholder() {
        let mut presenter = Presenter::new(Scripted::new(vec![Ok(vec![dune(), emma()])]));
        presenter.load().await.unwrap();
        assert_eq!(presenter.click(1), Some("TODO: Open the book when we click on it"));
        assert_eq!(presenter.click(2), None);
    }
}
