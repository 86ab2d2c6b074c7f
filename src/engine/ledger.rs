use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::classify::{Thresholds, progress_fraction};
use super::error::ProgressError;
use super::store::{LedgerStore, ProgressRecord, decode_ledger, encode_ledger};
use super::{LedgerSnapshot, WatchHistoryEntry, WatchState};
use crate::catalog::Catalog;

pub const DEFAULT_MAX_ENTRIES: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerOptions {
    pub thresholds: Thresholds,
    /// Capacity; the least recently updated entry is evicted past it.
    pub max_entries: usize,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Last reported playback position per media item, written through to a
/// [`LedgerStore`] on every mutation.
#[derive(Debug)]
pub struct ProgressLedger<S> {
    store: S,
    options: LedgerOptions,
    entries: HashMap<String, ProgressRecord>,
    last_stamp: i64,
    in_memory_only: bool,
}

impl<S: LedgerStore> ProgressLedger<S> {
    /// Hydrates from `store`. Unreadable storage or a malformed payload yields an
    /// empty ledger; unreadable storage also disables persistence for the session.
    pub fn open(store: S, options: LedgerOptions) -> Self {
        let mut ledger = Self::empty(store, options);
        match ledger.store.load_ledger() {
            Ok(None) => debug!("no persisted watch history, starting empty"),
            Ok(Some(raw)) => match decode_ledger(&raw) {
                Ok(records) => ledger.hydrate(records),
                Err(err) => warn!("discarding persisted watch history: {err}"),
            },
            Err(err) => {
                warn!("{err}; watch history is in-memory only for this session");
                ledger.in_memory_only = true;
            }
        }
        ledger
    }

    /// Empty ledger that never reads or writes `store`, for when the durable
    /// store could not be opened at all.
    pub fn in_memory_only(store: S, options: LedgerOptions) -> Self {
        let mut ledger = Self::empty(store, options);
        ledger.in_memory_only = true;
        ledger
    }

    fn empty(store: S, options: LedgerOptions) -> Self {
        Self {
            store,
            options: LedgerOptions {
                max_entries: options.max_entries.max(1),
                ..options
            },
            entries: HashMap::new(),
            last_stamp: 0,
            in_memory_only: false,
        }
    }

    fn hydrate(&mut self, records: HashMap<String, ProgressRecord>) {
        let total = records.len();
        for (media_id, mut record) in records {
            if media_id.trim().is_empty()
                || !record.duration.is_finite()
                || record.duration <= 0.0
                || !record.position.is_finite()
                || record.position < 0.0
            {
                continue;
            }
            record.position = record.position.min(record.duration);
            if self.options.thresholds.classify(record.position, record.duration)
                == WatchState::Unseen
            {
                continue;
            }
            self.last_stamp = self.last_stamp.max(record.updated_at);
            self.entries.insert(media_id, record);
        }
        let evicted = self.evict_over_capacity();
        let dropped = total - self.entries.len() - evicted;
        if dropped > 0 {
            warn!("dropped {dropped} invalid or unseen persisted watch history entries");
        }
        debug!(entries = self.entries.len(), "hydrated watch history");
    }

    /// Stores the last reported position for `media_id`, overwriting any earlier one.
    ///
    /// A position past `duration` is clamped to it. A position below the minimum
    /// progress threshold removes the entry instead.
    pub fn record_progress(
        &mut self,
        media_id: &str,
        series_id: Option<&str>,
        position: f64,
        duration: f64,
    ) -> Result<WatchState, ProgressError> {
        if let Err(err) = validate(media_id, position, duration) {
            warn!("rejected progress event: {err}");
            return Err(err);
        }
        let position = position.min(duration);
        let state = self.options.thresholds.classify(position, duration);

        if state == WatchState::Unseen {
            if self.entries.remove(media_id).is_some() {
                debug!(media_id, "progress reset, entry removed");
                self.persist();
            }
            return Ok(state);
        }

        let updated_at = self.next_stamp();
        let previous_series = self
            .entries
            .get(media_id)
            .and_then(|record| record.series_id.clone());
        self.entries.insert(
            media_id.to_string(),
            ProgressRecord {
                series_id: series_id.map(str::to_string).or(previous_series),
                position,
                duration,
                updated_at,
            },
        );
        self.evict_over_capacity();
        self.persist();
        Ok(state)
    }

    pub fn remove(&mut self, media_id: &str) -> bool {
        if self.entries.remove(media_id).is_none() {
            return false;
        }
        self.persist();
        true
    }

    pub fn reconcile<C: Catalog + ?Sized>(&mut self, catalog: &C) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|media_id, _| catalog.item(media_id).is_some());
        let pruned = before - self.entries.len();
        if pruned > 0 {
            info!(pruned, "pruned watch history entries missing from the catalog");
            self.persist();
        }
        pruned
    }

    pub fn get(&self, media_id: &str) -> Option<WatchHistoryEntry> {
        self.entries
            .get(media_id)
            .map(|record| self.entry(media_id, record))
    }

    pub fn dictionary(&self) -> LedgerSnapshot {
        self.entries
            .iter()
            .map(|(media_id, record)| (media_id.clone(), self.entry(media_id, record)))
            .collect()
    }

    pub fn progress_dictionary(&self) -> HashMap<String, f64> {
        self.entries
            .iter()
            .map(|(media_id, record)| {
                (
                    media_id.clone(),
                    progress_fraction(record.position, record.duration),
                )
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn options(&self) -> &LedgerOptions {
        &self.options
    }

    pub fn is_in_memory_only(&self) -> bool {
        self.in_memory_only
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn entry(&self, media_id: &str, record: &ProgressRecord) -> WatchHistoryEntry {
        WatchHistoryEntry {
            media_id: media_id.to_string(),
            series_id: record.series_id.clone(),
            position: record.position,
            duration: record.duration,
            state: self
                .options
                .thresholds
                .classify(record.position, record.duration),
            updated_at: record.updated_at,
        }
    }

    fn next_stamp(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last_stamp = now.max(self.last_stamp.saturating_add(1));
        self.last_stamp
    }

    fn evict_over_capacity(&mut self) -> usize {
        let mut evicted = 0;
        while self.entries.len() > self.options.max_entries {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by(|(left_id, left), (right_id, right)| {
                    left.updated_at
                        .cmp(&right.updated_at)
                        .then_with(|| left_id.cmp(right_id))
                })
                .map(|(media_id, _)| media_id.clone())
            else {
                break;
            };
            self.entries.remove(&oldest);
            debug!(media_id = %oldest, "evicted least recently updated entry");
            evicted += 1;
        }
        evicted
    }

    fn persist(&mut self) {
        if self.in_memory_only {
            return;
        }
        let payload = match encode_ledger(&self.entries) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("failed to serialize watch history: {err}");
                return;
            }
        };
        if let Err(err) = self.store.save_ledger(&payload) {
            warn!("{err}; watch history is in-memory only for this session");
            self.in_memory_only = true;
        }
    }
}

fn validate(media_id: &str, position: f64, duration: f64) -> Result<(), ProgressError> {
    if media_id.trim().is_empty() {
        return Err(ProgressError::invalid(media_id, "media id is empty"));
    }
    if !duration.is_finite() || duration <= 0.0 {
        return Err(ProgressError::invalid(
            media_id,
            format!("duration must be positive, got {duration}"),
        ));
    }
    if !position.is_finite() || position < 0.0 {
        return Err(ProgressError::invalid(
            media_id,
            format!("position must be zero or more, got {position}"),
        ));
    }
    Ok(())
}

/// Ledger behind one whole-ledger lock, for callers on more than one thread.
#[derive(Debug)]
pub struct SharedLedger<S> {
    inner: Arc<Mutex<ProgressLedger<S>>>,
}

impl<S> Clone for SharedLedger<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: LedgerStore> SharedLedger<S> {
    pub fn new(ledger: ProgressLedger<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    pub fn record_progress(
        &self,
        media_id: &str,
        series_id: Option<&str>,
        position: f64,
        duration: f64,
    ) -> Result<WatchState, ProgressError> {
        self.lock()
            .record_progress(media_id, series_id, position, duration)
    }

    pub fn remove(&self, media_id: &str) -> bool {
        self.lock().remove(media_id)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.lock().dictionary()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut ProgressLedger<S>) -> R) -> R {
        f(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, ProgressLedger<S>> {
        // A panic mid-update leaves a whole, if stale, map behind.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
