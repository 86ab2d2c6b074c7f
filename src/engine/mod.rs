//! Watch-progress engine.
//!
//! A [`ProgressLedger`] keeps the last reported playback position per media item.
//! Everything else is derived from a [`LedgerSnapshot`] on demand: the watch state
//! of an entry ([`Thresholds`]), the Continue Watching and Because You Watched
//! shelves ([`shelf`]) and next-episode resolution ([`series`]).

pub mod classify;
pub mod error;
pub mod ledger;
pub mod series;
pub mod shelf;
pub mod store;


use std::collections::HashMap;

pub use classify::{Thresholds, classify, progress_fraction};
pub use error::{ProgressError, StoreError};
pub use ledger::{DEFAULT_MAX_ENTRIES, LedgerOptions, ProgressLedger, SharedLedger};
pub use series::{
    NavMode, NextEpisode, NextReason, filter_series, resolve_next, season_filters, start_watching,
};
pub use shelf::{ShelfEntry, ShelfOptions, because_you_watched, continue_watching};
pub use store::{LedgerStore, MemoryStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchState {
    Unseen,
    InProgress,
    Completed,
}

impl WatchState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Unseen => "unseen",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
        }
    }
}

// `state` is computed when the snapshot is taken and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchHistoryEntry {
    pub media_id: String,
    pub series_id: Option<String>,
    pub position: f64,
    pub duration: f64,
    pub state: WatchState,
    /// Unix milliseconds, strictly increasing within one ledger.
    pub updated_at: i64,
}

impl WatchHistoryEntry {
    pub fn progress_fraction(&self) -> f64 {
        progress_fraction(self.position, self.duration)
    }
}

pub type LedgerSnapshot = HashMap<String, WatchHistoryEntry>;
