use std::collections::BTreeSet;

use super::{LedgerSnapshot, WatchHistoryEntry, WatchState};
use crate::catalog::MediaItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavMode {
    #[default]
    Forward,
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NextReason {
    ResumeInProgress,
    FirstUnwatched,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NextEpisode {
    pub media_id: String,
    pub reason: NextReason,
    pub resume_position: Option<f64>,
}

fn ordered_episodes(episodes: &[MediaItem]) -> Vec<&MediaItem> {
    let mut ordered: Vec<&MediaItem> = episodes.iter().collect();
    ordered.sort_by_key(|episode| episode.ordering_key());
    ordered
}

fn most_recent_with_state<'a>(
    ordered: &[&MediaItem],
    snapshot: &'a LedgerSnapshot,
    state: WatchState,
    exclude: Option<&str>,
) -> Option<&'a WatchHistoryEntry> {
    ordered
        .iter()
        .filter(|episode| Some(episode.media_id.as_str()) != exclude)
        .filter_map(|episode| snapshot.get(&episode.media_id))
        .filter(|entry| entry.state == state)
        .max_by_key(|entry| entry.updated_at)
}

/// Episode to play after `current_id`, or `None` at the end of the series or
/// when `current_id` is not part of `episodes`. Never wraps around.
pub fn resolve_next(
    current_id: &str,
    episodes: &[MediaItem],
    snapshot: &LedgerSnapshot,
    mode: NavMode,
) -> Option<String> {
    let ordered = ordered_episodes(episodes);
    let idx = ordered
        .iter()
        .position(|episode| episode.media_id == current_id)?;
    let successor = ordered.get(idx + 1)?;

    if mode == NavMode::Resume
        && let Some(entry) =
            most_recent_with_state(&ordered, snapshot, WatchState::InProgress, Some(current_id))
    {
        return Some(entry.media_id.clone());
    }
    Some(successor.media_id.clone())
}

/// Where "start watching" on a series lands: the most recently touched
/// in-progress episode, else the episode after the last one finished, else the
/// first episode. `None` once the final episode was the last one finished.
pub fn start_watching(episodes: &[MediaItem], snapshot: &LedgerSnapshot) -> Option<NextEpisode> {
    let ordered = ordered_episodes(episodes);
    let first = ordered.first()?;

    if let Some(entry) = most_recent_with_state(&ordered, snapshot, WatchState::InProgress, None) {
        return Some(NextEpisode {
            media_id: entry.media_id.clone(),
            reason: NextReason::ResumeInProgress,
            resume_position: Some(entry.position),
        });
    }

    let media_id = match most_recent_with_state(&ordered, snapshot, WatchState::Completed, None) {
        Some(finished) => {
            let idx = ordered
                .iter()
                .position(|episode| episode.media_id == finished.media_id)?;
            ordered.get(idx + 1)?.media_id.clone()
        }
        None => first.media_id.clone(),
    };
    Some(NextEpisode {
        media_id,
        reason: NextReason::FirstUnwatched,
        resume_position: None,
    })
}

/// Episodes of one season in their given order, or all of them for `None`.
/// Display only; navigation always uses the unfiltered list.
pub fn filter_series(episodes: &[MediaItem], season: Option<u32>) -> Vec<&MediaItem> {
    episodes
        .iter()
        .filter(|episode| season.is_none() || episode.season_number == season)
        .collect()
}

pub fn season_filters(episodes: &[MediaItem]) -> Vec<u32> {
    episodes
        .iter()
        .filter_map(|episode| episode.season_number)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
