use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::config::FeedConfig;
use crate::error::ApiError;
use crate::models::Confession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    /// First batch failed; the message is shown next to a retry action.
    Failed(String),
}

#[derive(Debug)]
pub enum Batch {
    First(Result<Vec<Confession>, ApiError>),
    Full(Result<Vec<Confession>, ApiError>),
}

/// Result of one load phase, tagged with the load it belongs to.
#[derive(Debug)]
pub struct FeedEvent {
    pub generation: u64,
    pub batch: Batch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageButton {
    Page(usize),
    Ellipsis,
}

/// Public confession feed: progressive load, search filter and page slicing.
#[derive(Debug)]
pub struct FeedViewModel {
    confessions: Vec<Confession>,
    query: String,
    page: usize,
    page_size: usize,
    state: LoadState,
    generation: u64,
}

impl FeedViewModel {
    pub fn new(page_size: usize) -> Self {
        Self {
            confessions: Vec::new(),
            query: String::new(),
            page: 1,
            page_size: page_size.max(1),
            state: LoadState::Idle,
            generation: 0,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    pub fn all(&self) -> &[Confession] {
        &self.confessions
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.page = 1;
    }

    /// Stores the page as given; callers only offer targets from `page_buttons`.
    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// Current page, clamped to the pages that exist.
    pub fn page(&self) -> usize {
        self.page.clamp(1, self.total_pages().max(1))
    }

    /// Whitespace-only queries match everything; any other query is matched as typed.
    pub fn filtered(&self) -> Vec<&Confession> {
        if self.query.trim().is_empty() {
            return self.confessions.iter().collect();
        }
        let needle = self.query.to_lowercase();
        self.confessions
            .iter()
            .filter(|confession| confession.matches(&needle))
            .collect()
    }

    pub fn total_pages(&self) -> usize {
        self.filtered().len().div_ceil(self.page_size)
    }

    pub fn visible(&self) -> Vec<&Confession> {
        let start = (self.page() - 1) * self.page_size;
        self.filtered()
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .collect()
    }

    pub fn has_prev(&self) -> bool {
        self.page() > 1
    }

    pub fn has_next(&self) -> bool {
        self.page() < self.total_pages()
    }

    /// Numbered controls: first, last, current±2, with an ellipsis at current±3.
    pub fn page_buttons(&self) -> Vec<PageButton> {
        let total = self.total_pages();
        if total <= 1 {
            return Vec::new();
        }
        let current = self.page();
        (1..=total)
            .filter_map(|n| {
                if n == 1 || n == total || n.abs_diff(current) <= 2 {
                    Some(PageButton::Page(n))
                } else if n.abs_diff(current) == 3 {
                    Some(PageButton::Ellipsis)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Marks a new load as started and returns its generation.
    pub fn begin_load(&mut self) -> u64 {
        self.generation += 1;
        self.state = LoadState::Loading;
        self.generation
    }

    pub fn apply(&mut self, event: FeedEvent) {
        if event.generation != self.generation {
            debug!(
                stale = event.generation,
                current = self.generation,
                "ignoring batch from superseded load"
            );
            return;
        }
        match event.batch {
            Batch::First(Ok(confessions)) => {
                info!(count = confessions.len(), "first batch loaded");
                self.confessions = confessions;
                self.state = LoadState::Ready;
            }
            Batch::First(Err(err)) => {
                warn!(error = %err, "failed to load confessions");
                self.state = LoadState::Failed(err.user_message());
            }
            Batch::Full(Ok(confessions)) if confessions.len() > self.confessions.len() => {
                info!(
                    previous = self.confessions.len(),
                    count = confessions.len(),
                    "full batch replaces first batch"
                );
                self.confessions = confessions;
            }
            Batch::Full(Ok(confessions)) => {
                debug!(
                    count = confessions.len(),
                    kept = self.confessions.len(),
                    "full batch not larger, keeping first batch"
                );
            }
            Batch::Full(Err(err)) => {
                warn!(error = %err, "background batch failed, keeping first batch");
            }
        }
    }

    /// Runs both phases inline, applying each as it arrives.
    pub async fn load(&mut self, client: &ApiClient, config: &FeedConfig) {
        let generation = self.begin_load();
        let first = client.get_confessions(config.first_batch).await;
        let proceed = first.is_ok();
        self.apply(FeedEvent {
            generation,
            batch: Batch::First(first),
        });
        if !proceed {
            return;
        }
        let full = client.get_confessions(config.full_batch).await;
        self.apply(FeedEvent {
            generation,
            batch: Batch::Full(full),
        });
    }

    /// Starts a load in the background; results arrive on `updates` for `apply`.
    pub fn start_load(
        &mut self,
        client: ApiClient,
        config: FeedConfig,
        updates: mpsc::Sender<FeedEvent>,
    ) -> JoinHandle<()> {
        let generation = self.begin_load();
        spawn_feed_load(client, config, generation, updates)
    }
}

pub fn spawn_feed_load(
    client: ApiClient,
    config: FeedConfig,
    generation: u64,
    updates: mpsc::Sender<FeedEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let first = client.get_confessions(config.first_batch).await;
        let proceed = first.is_ok();
        let event = FeedEvent {
            generation,
            batch: Batch::First(first),
        };
        if updates.send(event).await.is_err() {
            warn!("feed receiver dropped");
            return;
        }
        if !proceed {
            return;
        }
        let full = client.get_confessions(config.full_batch).await;
        let event = FeedEvent {
            generation,
            batch: Batch::Full(full),
        };
        if updates.send(event).await.is_err() {
            warn!("feed receiver dropped");
        }
    })
}
