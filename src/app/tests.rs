use std::fs;

use watchshelf::catalog::{MediaItem, StaticCatalog};
use watchshelf::config::EngineConfig;
use watchshelf::engine::{LedgerOptions, MemoryStore, ProgressLedger};

use super::format::*;
use super::*;
use crate::cli::Command;

fn catalog() -> StaticCatalog {
    StaticCatalog::from_json(
        r#"{
            "items": [
                {"mediaId": "agent327", "title": "Agent 327", "duration": 230},
                {"mediaId": "caminandes1", "title": "Caminandes 1: Llama Drama", "duration": 90},
                {"mediaId": "s1e1", "title": "Pilot", "duration": 1200},
                {"mediaId": "s1e2", "title": "Second", "duration": 1200},
                {"mediaId": "s2e1", "title": "Return", "duration": 1200}
            ],
            "series": [
                {"seriesId": "show", "title": "The Show", "episodes": [
                    {"mediaId": "s1e1", "seasonNumber": 1, "episodeNumber": 1},
                    {"mediaId": "s1e2", "seasonNumber": 1, "episodeNumber": 2},
                    {"mediaId": "s2e1", "seasonNumber": 2, "episodeNumber": 1}
                ]}
            ]
        }"#,
    )
    .expect("catalog should parse")
}

fn ledger() -> ProgressLedger<MemoryStore> {
    ProgressLedger::open(MemoryStore::default(), LedgerOptions::default())
}

#[test]
fn truncate_adds_ellipsis_past_limit() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("Caminandes 1: Llama Drama", 10), "Caminan...");
}

#[test]
fn format_seconds_switches_to_hours() {
    assert_eq!(format_seconds(229.4), "3:49");
    assert_eq!(format_seconds(3725.0), "1:02:05");
    assert_eq!(format_seconds(-4.0), "0:00");
    assert_eq!(format_seconds(f64::NAN), "0:00");
}

#[test]
fn format_percent_never_rounds_up_to_done() {
    assert_eq!(format_percent(100.0 / 230.0), "43%");
    assert_eq!(format_percent(0.999), "99%");
    assert_eq!(format_percent(1.4), "100%");
}

#[test]
fn build_progress_bar_is_clamped_to_width() {
    assert_eq!(build_progress_bar(0.5, 10), "[#####-----]");
    assert_eq!(build_progress_bar(2.0, 4), "[####]");
    assert_eq!(build_progress_bar(-1.0, 4), "[----]");
}

#[test]
fn progress_badge_reflects_state() {
    let mut ledger = ledger();
    ledger
        .record_progress("a", None, 50.0, 100.0)
        .expect("progress should be accepted");
    ledger
        .record_progress("b", None, 100.0, 100.0)
        .expect("progress should be accepted");
    assert_eq!(
        progress_badge(ledger.get("a").as_ref()),
        "[#####-----] 50%"
    );
    assert_eq!(progress_badge(ledger.get("b").as_ref()), "watched");
    assert_eq!(progress_badge(None), "");
}

#[test]
fn format_updated_at_falls_back_to_raw_value() {
    assert_eq!(format_updated_at(i64::MAX), i64::MAX.to_string());
    assert!(format_updated_at(1_700_000_000_000).starts_with("2023-11-"));
}

#[test]
fn record_reports_state_and_rejections() {
    let mut ledger = ledger();
    let message = run_record(&mut ledger, "agent327", None, 100.0, 230.0);
    assert_eq!(message, "Recorded agent327: 43% 1:40 / 3:50 (in progress)");

    let message = run_record(&mut ledger, "agent327", None, 229.0, 230.0);
    assert!(message.ends_with("(completed)"), "{message}");

    let message = run_record(&mut ledger, "agent327", None, 10.0, 0.0);
    assert!(message.starts_with("Progress rejected:"), "{message}");

    let message = run_record(&mut ledger, "other", None, 1.0, 230.0);
    assert!(message.starts_with("No meaningful progress"), "{message}");
}

#[test]
fn because_you_watched_heading_names_latest_finished_item() {
    let catalog = catalog();
    let config = EngineConfig::default();
    let mut ledger = ledger();
    assert_eq!(
        run_because(&mut ledger, Some(&catalog), &config),
        "Nothing finished yet."
    );

    ledger
        .record_progress("caminandes1", None, 90.0, 90.0)
        .expect("progress should be accepted");
    let report = run_because(&mut ledger, Some(&catalog), &config);
    assert!(report.starts_with("Because you watched Caminandes 1: Llama Drama\n"));

    ledger
        .record_progress("caminandes1", None, 45.0, 90.0)
        .expect("progress should be accepted");
    assert_eq!(
        run_because(&mut ledger, Some(&catalog), &config),
        "Nothing finished yet."
    );
    assert!(run_continue(&mut ledger, Some(&catalog), &config).contains("caminandes1"));
}

#[test]
fn continue_report_honors_feature_flag_and_prunes_unknown_items() {
    let catalog = catalog();
    let mut ledger = ledger();
    ledger
        .record_progress("retired", None, 50.0, 100.0)
        .expect("progress should be accepted");

    let disabled = EngineConfig {
        enable_continue_watching: false,
        ..EngineConfig::default()
    };
    assert!(run_continue(&mut ledger, Some(&catalog), &disabled).contains("disabled"));
    assert!(ledger.get("retired").is_some());

    let report = run_continue(&mut ledger, Some(&catalog), &EngineConfig::default());
    assert_eq!(report, "Nothing to continue watching.");
    assert!(ledger.get("retired").is_none());
}

#[test]
fn next_and_start_follow_series_order() {
    let catalog = catalog();
    let mut ledger = ledger();
    assert_eq!(
        run_next(&ledger, &catalog, "s1e2", false),
        "Next: s2e1 (Return)"
    );
    assert_eq!(
        run_next(&ledger, &catalog, "s2e1", false),
        "No episode after s2e1 in show."
    );
    assert_eq!(
        run_next(&ledger, &catalog, "agent327", false),
        "agent327 is not part of a known series."
    );

    assert_eq!(run_start(&ledger, &catalog, "show"), "start: s1e1");
    ledger
        .record_progress("s1e2", Some("show"), 90.0, 1200.0)
        .expect("progress should be accepted");
    assert_eq!(run_start(&ledger, &catalog, "show"), "resume: s1e2 at 1:30");
    assert_eq!(
        run_next(&ledger, &catalog, "s2e1", true),
        "No episode after s2e1 in show."
    );
    assert_eq!(
        run_next(&ledger, &catalog, "s1e1", true),
        "Next: s1e2 (Second)"
    );
    assert_eq!(
        run_start(&ledger, &catalog, "missing"),
        "No episodes known for missing."
    );
}

#[test]
fn episodes_and_seasons_use_catalog_order() {
    let catalog = catalog();
    let mut ledger = ledger();
    ledger
        .record_progress("s1e1", Some("show"), 1200.0, 1200.0)
        .expect("progress should be accepted");

    let report = run_episodes(&ledger, &catalog, "show", Some(1));
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines[0], "The Show");
    assert_eq!(lines.len(), 4);
    assert!(lines[2].starts_with("S1E1"));
    assert!(lines[2].contains("watched"));
    assert!(lines[3].starts_with("S1E2"));

    assert_eq!(run_seasons(&catalog, "show"), "Season 1\nSeason 2");
    assert_eq!(
        run_seasons(&catalog, "nope"),
        "No seasons known for nope."
    );
}

#[test]
fn list_orders_most_recent_first() {
    let mut ledger = ledger();
    assert!(run_list(&ledger).starts_with("No tracked entries yet."));
    ledger
        .record_progress("first", None, 50.0, 100.0)
        .expect("progress should be accepted");
    ledger
        .record_progress("second", Some("show"), 100.0, 100.0)
        .expect("progress should be accepted");

    let report = run_list(&ledger);
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("second"));
    assert!(lines[1].contains("completed"));
    assert!(lines[2].starts_with("first"));
    assert!(lines[2].contains("-"));
}

#[test]
fn remove_reports_missing_entries() {
    let mut ledger = ledger();
    ledger
        .record_progress("agent327", None, 100.0, 230.0)
        .expect("progress should be accepted");
    assert_eq!(
        run_remove(&mut ledger, "agent327"),
        "Removed agent327 from watch history."
    );
    assert_eq!(
        run_remove(&mut ledger, "agent327"),
        "agent327 has no watch history."
    );
}

#[test]
fn display_title_falls_back_to_media_id() {
    let item = MediaItem {
        media_id: "untitled".to_string(),
        title: "  ".to_string(),
        series_id: None,
        duration: 10.0,
        season_number: None,
        episode_number: None,
    };
    assert_eq!(item.display_title(), "untitled");
}

#[test]
fn shelves_without_a_loaded_catalog_keep_history() {
    let config = EngineConfig::default();
    let mut ledger = ledger();
    ledger
        .record_progress("x", None, 100.0, 230.0)
        .expect("progress should be accepted");
    ledger
        .record_progress("y", None, 229.0, 230.0)
        .expect("progress should be accepted");
    let saves = ledger.store().saves();

    assert_eq!(
        run_continue(&mut ledger, None, &config),
        "Nothing to continue watching."
    );
    assert_eq!(run_because(&mut ledger, None, &config), "Nothing finished yet.");
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.store().saves(), saves);
}

#[test]
fn ledger_commands_ignore_an_unreadable_catalog() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let bad_catalog = dir.path().join("bad.json");
    fs::write(&bad_catalog, "garbage").expect("catalog should be written");
    let config = EngineConfig {
        catalog_path: Some(bad_catalog),
        ..EngineConfig::default()
    };
    let mut ledger = ledger();

    let record = Command::Record {
        media_id: "z".to_string(),
        position: 50.0,
        duration: 230.0,
        series: None,
    };
    let message = dispatch(Some(record), &mut ledger, &config);
    assert!(message.starts_with("Recorded z:"), "{message}");
    assert!(dispatch(None, &mut ledger, &config).contains("in progress"));

    assert_eq!(
        dispatch(Some(Command::Continue), &mut ledger, &config),
        "Nothing to continue watching."
    );
    assert_eq!(ledger.len(), 1);
    assert!(open_catalog(&config).is_none());

    let missing = EngineConfig {
        catalog_path: Some(dir.path().join("nope.json")),
        ..EngineConfig::default()
    };
    dispatch(Some(Command::Because), &mut ledger, &missing);
    assert_eq!(ledger.len(), 1);
}

#[test]
fn unopenable_database_degrades_and_warns_on_record() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "file").expect("blocker should be written");
    let config = EngineConfig {
        db_path: Some(blocker.join("watchshelf.db")),
        ..EngineConfig::default()
    };

    let mut ledger = open_ledger(&config);
    assert!(ledger.is_in_memory_only());
    let message = run_record(&mut ledger, "agent327", None, 100.0, 230.0);
    assert!(message.starts_with("Recorded agent327:"), "{message}");
    assert!(message.contains("storage unavailable"), "{message}");
    assert_eq!(ledger.len(), 1);
}
