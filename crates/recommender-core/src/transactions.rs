//! ============================================================================
//! Transaction List
//! ============================================================================
//! One fetch per mount. While it runs the view is a skeleton; afterwards it
//! is the table, the empty message, or a retry prompt. Retrying throws the
//! whole list away and mounts a new one.
//! ============================================================================

use std::sync::Arc;

use tracing::{info, warn};

use crate::service::TransactionSource;
use crate::types::{Notice, Transaction};

pub const LOAD_ERROR: &str = "Failed to load transactions. Please try again later.";
pub const EMPTY_MESSAGE: &str = "No transaction history found.";
const LOAD_ERROR_NOTICE: &str = "Could not load transaction history";

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Loaded(Vec<Transaction>),
    Failed(String),
}

/// What the history page renders
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransactionView<'a> {
    Skeleton,
    Table(&'a [Transaction]),
    Empty,
    RetryPrompt(&'a str),
}

pub struct TransactionList {
    source: Arc<dyn TransactionSource>,
    state: LoadState,
    fetched: bool,
    notice: Option<Notice>,
}

impl TransactionList {
    /// A list that has not fetched yet
    pub fn new(source: Arc<dyn TransactionSource>) -> Self {
        Self {
            source,
            state: LoadState::Loading,
            fetched: false,
            notice: None,
        }
    }

    /// Create and run the single fetch
    pub async fn mount(source: Arc<dyn TransactionSource>) -> Self {
        let mut list = Self::new(source);
        list.load().await;
        list
    }

    /// Discard this view entirely and mount a fresh one
    pub async fn reload(self) -> Self {
        info!("Reloading transaction history");
        Self::mount(self.source).await
    }

    /// Run the fetch. Later calls on the same mount do nothing.
    pub async fn load(&mut self) {
        if self.fetched {
            return;
        }
        self.fetched = true;

        match self.source.fetch_transactions().await {
            Ok(rows) => {
                info!("Loaded {} transactions", rows.len());
                self.state = LoadState::Loaded(rows);
            }
            Err(e) => {
                warn!("Failed to fetch transactions: {}", e);
                self.state = LoadState::Failed(LOAD_ERROR.to_string());
                self.notice = Some(Notice::error(LOAD_ERROR_NOTICE));
            }
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Notification raised by the fetch, taken once
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub fn view(&self) -> TransactionView<'_> {
        match &self.state {
            LoadState::Loading => TransactionView::Skeleton,
            LoadState::Loaded(rows) if rows.is_empty() => TransactionView::Empty,
            LoadState::Loaded(rows) => TransactionView::Table(rows),
            LoadState::Failed(message) => TransactionView::RetryPrompt(message),
        }
    }
}
