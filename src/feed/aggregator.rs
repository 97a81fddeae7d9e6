use crate::classify::Classifier;
use crate::feed::fetcher::{fetch_source, FetchSettings};
use crate::feed::merge::merge;
use crate::types::{Item, Source};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;

/// Number of active sources fetched per cycle unless configured otherwise.
pub const DEFAULT_MAX_SOURCES: usize = 25;

#[derive(Debug, Error)]
pub enum AggregateError {
    /// Raised before any fetch when the source list has nothing active.
    /// Failed fetches never produce this.
    #[error("No active RSS feeds configured")]
    NoActiveSources,
}

/// Runs refresh cycles over an externally owned source list.
///
/// Holds no reference to the source list or the previous result between
/// cycles; both are passed into [`Aggregator::refresh`] each time.
#[derive(Debug, Clone)]
pub struct Aggregator {
    client: reqwest::Client,
    settings: FetchSettings,
    classifier: Classifier,
    max_sources: usize,
}

impl Aggregator {
    pub fn new(client: reqwest::Client, settings: FetchSettings) -> Self {
        Self {
            client,
            settings,
            classifier: Classifier::default(),
            max_sources: DEFAULT_MAX_SOURCES,
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Caps how many active sources a cycle fetches. Zero is treated as one.
    pub fn with_max_sources(mut self, max_sources: usize) -> Self {
        self.max_sources = max_sources.max(1);
        self
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Fetches the first `max_sources` active sources concurrently and
    /// merges them into one deduplicated, newest-first collection.
    ///
    /// `previous` is the collection this refresh replaces; favorite flags
    /// carry over for links present in both.
    ///
    /// # Errors
    ///
    /// [`AggregateError::NoActiveSources`] if `sources` has no active entry.
    /// Individual source failures only show up in the logs.
    pub async fn refresh(
        &self,
        sources: &[Source],
        previous: &[Item],
    ) -> Result<Vec<Item>, AggregateError> {
        self.refresh_with_progress(sources, previous, None).await
    }

    /// Same as [`Aggregator::refresh`], reporting `(completed, total)` after
    /// each source finishes.
    pub async fn refresh_with_progress(
        &self,
        sources: &[Source],
        previous: &[Item],
        progress_tx: Option<&mpsc::Sender<(usize, usize)>>,
    ) -> Result<Vec<Item>, AggregateError> {
        let active: Vec<&Source> = sources.iter().filter(|s| s.is_active).collect();
        if active.is_empty() {
            return Err(AggregateError::NoActiveSources);
        }

        let skipped = active.len().saturating_sub(self.max_sources);
        if skipped > 0 {
            tracing::info!(
                skipped = skipped,
                limit = self.max_sources,
                "Fetching a subset of active sources this cycle"
            );
        }

        let selected: Vec<&Source> = active.into_iter().take(self.max_sources).collect();
        let total = selected.len();
        let completed = AtomicUsize::new(0);

        // Every selected fetch runs at once; batches arrive in completion order.
        let batches: Vec<Vec<Item>> = stream::iter(selected)
            .map(|source| {
                let completed = &completed;
                async move {
                    let items =
                        fetch_source(&self.client, &self.settings, &self.classifier, source).await;

                    let done = completed.fetch_add(1, Ordering::Relaxed).saturating_add(1);
                    if let Some(tx) = progress_tx {
                        if let Err(e) = tx.send((done, total)).await {
                            tracing::warn!(error = %e, done = done, total = total, "Progress channel send failed (receiver dropped)");
                        }
                    }

                    items
                }
            })
            .buffer_unordered(total)
            .collect()
            .await;

        let empty_sources = batches.iter().filter(|b| b.is_empty()).count();
        let fetched_items: usize = batches.iter().map(Vec::len).sum();
        let items = merge(batches, previous);

        tracing::info!(
            sources = total,
            empty_sources = empty_sources,
            fetched = fetched_items,
            merged = items.len(),
            "Refresh cycle complete"
        );

        Ok(items)
    }
}
