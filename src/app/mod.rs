mod format;

#[cfg(test)]
mod tests;

use std::fmt::Write as _;

use anyhow::Result;
use tracing::warn;

use watchshelf::catalog::{Catalog, StaticCatalog};
use watchshelf::config::EngineConfig;
use watchshelf::db::Database;
use watchshelf::engine::{
    LedgerStore, MemoryStore, NavMode, ProgressLedger, ShelfEntry, WatchState,
    because_you_watched, continue_watching, filter_series, resolve_next, season_filters,
    start_watching,
};

use crate::cli::{Cli, Command};

use self::format::{
    format_percent, format_progress, format_seconds, format_updated_at, next_reason_label,
    progress_badge, truncate,
};

type Ledger = ProgressLedger<Box<dyn LedgerStore>>;

pub fn run(cli: Cli) -> Result<()> {
    let mut config = EngineConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = Some(db);
    }
    if let Some(catalog) = cli.catalog {
        config.catalog_path = Some(catalog);
    }

    let mut ledger = open_ledger(&config);
    let output = dispatch(cli.command, &mut ledger, &config);
    println!("{output}");
    Ok(())
}

// The catalog is only loaded by commands that read it.
fn dispatch<S: LedgerStore>(
    command: Option<Command>,
    ledger: &mut ProgressLedger<S>,
    config: &EngineConfig,
) -> String {
    match command {
        Some(Command::Record {
            media_id,
            position,
            duration,
            series,
        }) => run_record(ledger, &media_id, series.as_deref(), position, duration),
        Some(Command::Remove { media_id }) => run_remove(ledger, &media_id),
        Some(Command::Continue) => run_continue(ledger, open_catalog(config).as_ref(), config),
        Some(Command::Because) => run_because(ledger, open_catalog(config).as_ref(), config),
        Some(Command::Next { media_id, resume }) => {
            run_next(ledger, &open_catalog(config).unwrap_or_default(), &media_id, resume)
        }
        Some(Command::Start { series_id }) => {
            run_start(ledger, &open_catalog(config).unwrap_or_default(), &series_id)
        }
        Some(Command::Episodes { series_id, season }) => run_episodes(
            ledger,
            &open_catalog(config).unwrap_or_default(),
            &series_id,
            season,
        ),
        Some(Command::Seasons { series_id }) => {
            run_seasons(&open_catalog(config).unwrap_or_default(), &series_id)
        }
        Some(Command::List) | None => run_list(ledger),
    }
}

fn open_ledger(config: &EngineConfig) -> Ledger {
    let opened = config
        .resolved_db_path()
        .and_then(|db_path| Database::open(&db_path))
        .and_then(|db| db.migrate().map(|_| db));
    match opened {
        Ok(db) => ProgressLedger::open(Box::new(db), config.ledger),
        Err(err) => {
            warn!("{err:#}; watch history is in-memory only for this session");
            ProgressLedger::in_memory_only(Box::new(MemoryStore::default()), config.ledger)
        }
    }
}

/// `None` when the catalog is missing or unreadable. Callers must not treat
/// that as every item having been deleted.
fn open_catalog(config: &EngineConfig) -> Option<StaticCatalog> {
    let path = match config.resolved_catalog_path() {
        Ok(path) => path,
        Err(err) => {
            warn!("{err:#}; shelves and navigation will be empty");
            return None;
        }
    };
    if !path.exists() {
        warn!(
            "no catalog at {}; shelves and navigation will be empty",
            path.display()
        );
        return None;
    }
    match StaticCatalog::load(&path) {
        Ok(catalog) => Some(catalog),
        Err(err) => {
            warn!("{err:#}; shelves and navigation will be empty");
            None
        }
    }
}

/// Reconciles against `catalog` only when one was actually loaded.
fn shelf_catalog<'a, S: LedgerStore>(
    ledger: &mut ProgressLedger<S>,
    catalog: Option<&'a StaticCatalog>,
    fallback: &'a StaticCatalog,
) -> &'a StaticCatalog {
    match catalog {
        Some(catalog) => {
            ledger.reconcile(catalog);
            catalog
        }
        None => fallback,
    }
}

fn storage_notice<S: LedgerStore>(ledger: &ProgressLedger<S>) -> &'static str {
    if ledger.is_in_memory_only() {
        "\nWarning: storage unavailable, progress is kept for this session only."
    } else {
        ""
    }
}

fn run_record<S: LedgerStore>(
    ledger: &mut ProgressLedger<S>,
    media_id: &str,
    series_id: Option<&str>,
    position: f64,
    duration: f64,
) -> String {
    match ledger.record_progress(media_id, series_id, position, duration) {
        Ok(WatchState::Unseen) => format!(
            "No meaningful progress for {media_id}; nothing stored.{}",
            storage_notice(ledger)
        ),
        Ok(state) => {
            let stored = ledger
                .get(media_id)
                .map(|entry| format_progress(&entry))
                .unwrap_or_default();
            format!(
                "Recorded {media_id}: {stored} ({}){}",
                state.label(),
                storage_notice(ledger)
            )
        }
        Err(err) => format!("Progress rejected: {err}. Ledger unchanged."),
    }
}

fn run_remove<S: LedgerStore>(ledger: &mut ProgressLedger<S>, media_id: &str) -> String {
    if ledger.remove(media_id) {
        format!("Removed {media_id} from watch history.{}", storage_notice(ledger))
    } else {
        format!("{media_id} has no watch history.")
    }
}

fn shelf_table(shelf: &[ShelfEntry]) -> String {
    let mut out = format!(
        "{:<20} {:<40} {:<24} {:<28}",
        "MEDIA ID", "TITLE", "PROGRESS", "LAST WATCHED"
    );
    for card in shelf {
        let _ = write!(
            out,
            "\n{:<20} {:<40} {:<24} {:<28}",
            truncate(&card.entry.media_id, 20),
            truncate(card.item.display_title(), 40),
            format_progress(&card.entry),
            format_updated_at(card.entry.updated_at)
        );
    }
    out
}

fn run_continue<S: LedgerStore>(
    ledger: &mut ProgressLedger<S>,
    catalog: Option<&StaticCatalog>,
    config: &EngineConfig,
) -> String {
    if !config.enable_continue_watching {
        return "Continue Watching is disabled (WATCHSHELF_CONTINUE_WATCHING).".to_string();
    }
    let fallback = StaticCatalog::default();
    let catalog = shelf_catalog(ledger, catalog, &fallback);
    let shelf = continue_watching(&ledger.dictionary(), catalog, &config.continue_watching);
    if shelf.is_empty() {
        return "Nothing to continue watching.".to_string();
    }
    format!("Continue watching\n{}", shelf_table(&shelf))
}

fn run_because<S: LedgerStore>(
    ledger: &mut ProgressLedger<S>,
    catalog: Option<&StaticCatalog>,
    config: &EngineConfig,
) -> String {
    let fallback = StaticCatalog::default();
    let catalog = shelf_catalog(ledger, catalog, &fallback);
    let shelf = because_you_watched(&ledger.dictionary(), catalog, &config.because_you_watched);
    match shelf.first() {
        Some(latest) => format!(
            "Because you watched {}\n{}",
            latest.item.display_title(),
            shelf_table(&shelf)
        ),
        None => "Nothing finished yet.".to_string(),
    }
}

fn run_next<S: LedgerStore>(
    ledger: &ProgressLedger<S>,
    catalog: &StaticCatalog,
    media_id: &str,
    resume: bool,
) -> String {
    let series_id = catalog
        .item(media_id)
        .and_then(|item| item.series_id.clone())
        .or_else(|| ledger.get(media_id).and_then(|entry| entry.series_id));
    let Some(series_id) = series_id else {
        return format!("{media_id} is not part of a known series.");
    };

    let episodes = catalog.series_episodes(&series_id);
    let mode = if resume {
        NavMode::Resume
    } else {
        NavMode::Forward
    };
    match resolve_next(media_id, &episodes, &ledger.dictionary(), mode) {
        Some(next_id) => {
            let title = catalog
                .item(&next_id)
                .map(|item| item.display_title().to_string())
                .unwrap_or_else(|| next_id.clone());
            format!("Next: {next_id} ({title})")
        }
        None => format!("No episode after {media_id} in {series_id}."),
    }
}

fn run_start<S: LedgerStore>(
    ledger: &ProgressLedger<S>,
    catalog: &StaticCatalog,
    series_id: &str,
) -> String {
    let episodes = catalog.series_episodes(series_id);
    if episodes.is_empty() {
        return format!("No episodes known for {series_id}.");
    }
    match start_watching(&episodes, &ledger.dictionary()) {
        Some(next) => {
            let at = next
                .resume_position
                .map(|position| format!(" at {}", format_seconds(position)))
                .unwrap_or_default();
            format!(
                "{}: {}{at}",
                next_reason_label(next.reason),
                next.media_id
            )
        }
        None => format!("Every episode of {series_id} has been watched."),
    }
}

fn run_episodes<S: LedgerStore>(
    ledger: &ProgressLedger<S>,
    catalog: &StaticCatalog,
    series_id: &str,
    season: Option<u32>,
) -> String {
    let episodes = catalog.series_episodes(series_id);
    let visible = filter_series(&episodes, season);
    if visible.is_empty() {
        return format!("No episodes to show for {series_id}.");
    }

    let snapshot = ledger.dictionary();
    let mut out = match catalog.series_title(series_id) {
        Some(title) => format!("{title}\n"),
        None => String::new(),
    };
    let _ = write!(
        out,
        "{:<8} {:<20} {:<40} {:<16}",
        "S/E", "MEDIA ID", "TITLE", "PROGRESS"
    );
    for episode in visible {
        let label = match (episode.season_number, episode.episode_number) {
            (Some(season), Some(number)) => format!("S{season}E{number}"),
            (None, Some(number)) => format!("E{number}"),
            _ => "-".to_string(),
        };
        let _ = write!(
            out,
            "\n{:<8} {:<20} {:<40} {:<16}",
            label,
            truncate(&episode.media_id, 20),
            truncate(episode.display_title(), 40),
            progress_badge(snapshot.get(&episode.media_id))
        );
    }
    out
}

fn run_seasons(catalog: &StaticCatalog, series_id: &str) -> String {
    let seasons = season_filters(&catalog.series_episodes(series_id));
    if seasons.is_empty() {
        return format!("No seasons known for {series_id}.");
    }
    seasons
        .iter()
        .map(|season| format!("Season {season}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn run_list<S: LedgerStore>(ledger: &ProgressLedger<S>) -> String {
    let mut entries: Vec<_> = ledger.dictionary().into_values().collect();
    if entries.is_empty() {
        return "No tracked entries yet. Run `watchshelf record` first.".to_string();
    }
    entries.sort_by(|left, right| right.updated_at.cmp(&left.updated_at));

    let mut out = format!(
        "{:<20} {:<20} {:<12} {:<6} {:<28}",
        "MEDIA ID", "SERIES", "STATE", "DONE", "UPDATED"
    );
    for entry in entries {
        let _ = write!(
            out,
            "\n{:<20} {:<20} {:<12} {:<6} {:<28}",
            truncate(&entry.media_id, 20),
            truncate(entry.series_id.as_deref().unwrap_or("-"), 20),
            entry.state.label(),
            format_percent(entry.progress_fraction()),
            format_updated_at(entry.updated_at)
        );
    }
    out
}
