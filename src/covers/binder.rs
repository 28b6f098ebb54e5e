use std::{collections::HashMap, future::Future};

use log::debug;
use tokio::{
    sync::mpsc::{unbounded_channel, UnboundedSender},
    task::JoinHandle,
};
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};

use super::{Cover, CoverLoader};
use crate::catalog::CatalogError;

#[derive(Debug)]
pub struct LoadedCover {
    pub row: usize,
    pub result: Result<Cover, CatalogError>,
}

struct CoverEvent {
    row: usize,
    generation: u64,
    result: Result<Cover, CatalogError>,
}

/// Sends the row's outcome when dropped, so a load that panics or is
/// aborted still reports back instead of leaving the row pending.
struct Report {
    row: usize,
    generation: u64,
    tx: UnboundedSender<CoverEvent>,
    result: Option<Result<Cover, CatalogError>>,
}

impl Drop for Report {
    fn drop(&mut self) {
        let result = self.result.take().unwrap_or_else(|| {
            Err(CatalogError::NetworkError {
                msg: "cover load ended without a result".to_owned(),
            })
        });
        let _ = self.tx.send(CoverEvent {
            row: self.row,
            generation: self.generation,
            result,
        });
    }
}

struct Binding {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Keeps at most one cover load in flight per row.
///
/// Rebinding a row aborts the previous load, and a result that still slips
/// through from an older binding is dropped because its generation no longer
/// matches.
pub struct CoverBinder {
    loader: CoverLoader,
    rows: HashMap<usize, Binding>,
    next_generation: u64,
    tx: UnboundedSender<CoverEvent>,
    events: UnboundedReceiverStream<CoverEvent>,
}

impl CoverBinder {
    pub fn new(loader: CoverLoader) -> CoverBinder {
        let (tx, rx) = unbounded_channel();
        CoverBinder {
            loader,
            rows: HashMap::new(),
            next_generation: 0,
            tx,
            events: UnboundedReceiverStream::new(rx),
        }
    }

    pub fn bind(&mut self, row: usize, url: &str) {
        let loader = self.loader.clone();
        let url = url.to_owned();
        self.track(row, async move { loader.fetch(&url).await });
    }

    fn track<F>(&mut self, row: usize, load: F)
    where
        F: Future<Output = Result<Cover, CatalogError>> + Send + 'static,
    {
        self.unbind(row);

        self.next_generation += 1;
        let generation = self.next_generation;
        let mut report = Report {
            row,
            generation,
            tx: self.tx.clone(),
            result: None,
        };
        let handle = tokio::spawn(async move {
            report.result = Some(load.await);
        });

        self.rows.insert(row, Binding { generation, handle });
    }

    /// Cancels the load bound to `row`, if any.
    pub fn unbind(&mut self, row: usize) -> bool {
        match self.rows.remove(&row) {
            Some(binding) => {
                binding.handle.abort();
                debug!("cancelled cover load for row {}", row);
                true
            }
            None => false,
        }
    }

    pub fn pending(&self) -> usize {
        self.rows.len()
    }

    /// Next finished load of a current binding, or `None` once nothing is in flight.
    pub async fn next_loaded(&mut self) -> Option<LoadedCover> {
        while !self.rows.is_empty() {
            let event = self.events.next().await?;
            match self.rows.get(&event.row) {
                Some(binding) if binding.generation == event.generation => {
                    self.rows.remove(&event.row);
                    return Some(LoadedCover {
                        row: event.row,
                        result: event.result,
                    });
                }
                _ => debug!("dropping stale cover for row {}", event.row),
            }
        }
        None
    }
}

impl Drop for CoverBinder {
    fn drop(&mut self) {
        for binding in self.rows.values() {
            binding.handle.abort();
        }
    }
}
