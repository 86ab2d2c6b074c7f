use std::collections::HashSet;

use super::{LedgerSnapshot, WatchHistoryEntry, WatchState};
use crate::catalog::{Catalog, MediaItem};

pub const DEFAULT_SHELF_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShelfOptions {
    pub limit: usize,
    pub one_per_series: bool,
}

impl Default for ShelfOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SHELF_LIMIT,
            one_per_series: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShelfEntry {
    pub entry: WatchHistoryEntry,
    pub item: MediaItem,
}

impl ShelfEntry {
    pub fn series_id(&self) -> Option<&str> {
        self.entry
            .series_id
            .as_deref()
            .or(self.item.series_id.as_deref())
    }
}

pub fn continue_watching<C: Catalog + ?Sized>(
    snapshot: &LedgerSnapshot,
    catalog: &C,
    options: &ShelfOptions,
) -> Vec<ShelfEntry> {
    build_shelf(snapshot, catalog, WatchState::InProgress, options)
}

/// Completed entries, most recently finished first. An item leaves this shelf
/// as soon as its own entry is no longer completed.
pub fn because_you_watched<C: Catalog + ?Sized>(
    snapshot: &LedgerSnapshot,
    catalog: &C,
    options: &ShelfOptions,
) -> Vec<ShelfEntry> {
    build_shelf(snapshot, catalog, WatchState::Completed, options)
}

fn build_shelf<C: Catalog + ?Sized>(
    snapshot: &LedgerSnapshot,
    catalog: &C,
    state: WatchState,
    options: &ShelfOptions,
) -> Vec<ShelfEntry> {
    let mut shelf: Vec<ShelfEntry> = snapshot
        .values()
        .filter(|entry| entry.state == state)
        .filter_map(|entry| {
            // Entries whose item left the catalog are skipped, not reported.
            let item = catalog.item(&entry.media_id)?;
            Some(ShelfEntry {
                entry: entry.clone(),
                item: item.clone(),
            })
        })
        .collect();

    shelf.sort_by(|left, right| {
        right
            .entry
            .updated_at
            .cmp(&left.entry.updated_at)
            .then_with(|| left.entry.media_id.cmp(&right.entry.media_id))
    });

    if options.one_per_series {
        let mut seen_series = HashSet::new();
        shelf.retain(|card| match card.series_id() {
            Some(series_id) => seen_series.insert(series_id.to_string()),
            None => true,
        });
    }

    shelf.truncate(options.limit);
    shelf
}
