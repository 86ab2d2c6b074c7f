//! Read-only catalog collaborator: media metadata and series membership.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub media_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub series_id: Option<String>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub season_number: Option<u32>,
    #[serde(default)]
    pub episode_number: Option<u32>,
}

impl MediaItem {
    /// `(season, episode)`; missing numbers sort first.
    pub fn ordering_key(&self) -> (u32, u32) {
        (
            self.season_number.unwrap_or(0),
            self.episode_number.unwrap_or(0),
        )
    }

    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.media_id
        } else {
            &self.title
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeSlot {
    pub media_id: String,
    #[serde(default)]
    pub season_number: Option<u32>,
    #[serde(default)]
    pub episode_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesDefinition {
    pub series_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub episodes: Vec<EpisodeSlot>,
}

pub trait Catalog {
    fn item(&self, media_id: &str) -> Option<&MediaItem>;
    fn series_episodes(&self, series_id: &str) -> Vec<MediaItem>;
}

/// Fills season/episode numbers and the parent series id from `series` into the
/// matching `items`. Items outside the series are returned unchanged.
pub fn enrich_episodes(series: &SeriesDefinition, items: &[MediaItem]) -> Vec<MediaItem> {
    let slots: HashMap<&str, &EpisodeSlot> = series
        .episodes
        .iter()
        .map(|slot| (slot.media_id.as_str(), slot))
        .collect();

    items
        .iter()
        .map(|item| {
            let mut enriched = item.clone();
            if let Some(slot) = slots.get(item.media_id.as_str()) {
                enriched.series_id = Some(series.series_id.clone());
                if slot.season_number.is_some() {
                    enriched.season_number = slot.season_number;
                }
                if slot.episode_number.is_some() {
                    enriched.episode_number = slot.episode_number;
                }
            }
            enriched
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    items: Vec<MediaItem>,
    #[serde(default)]
    series: Vec<SeriesDefinition>,
}

/// Catalog held fully in memory, usually loaded from a JSON file of the form
/// `{"items": [...], "series": [...]}`.
#[derive(Debug, Default, Clone)]
pub struct StaticCatalog {
    items: HashMap<String, MediaItem>,
    series: HashMap<String, SeriesDefinition>,
}

impl StaticCatalog {
    pub fn new(items: Vec<MediaItem>, series: Vec<SeriesDefinition>) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|item| (item.media_id.clone(), item))
                .collect(),
            series: series
                .into_iter()
                .map(|definition| (definition.series_id.clone(), definition))
                .collect(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(raw).context("catalog is not valid JSON")?;
        Ok(Self::new(file.items, file.series))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog at {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("failed to parse catalog at {}", path.display()))
    }

    pub fn series_title(&self, series_id: &str) -> Option<&str> {
        self.series
            .get(series_id)
            .map(|definition| definition.title.as_str())
            .filter(|title| !title.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Catalog for StaticCatalog {
    fn item(&self, media_id: &str) -> Option<&MediaItem> {
        self.items.get(media_id)
    }

    fn series_episodes(&self, series_id: &str) -> Vec<MediaItem> {
        let mut episodes = match self.series.get(series_id) {
            Some(definition) => {
                let members: Vec<MediaItem> = definition
                    .episodes
                    .iter()
                    .filter_map(|slot| self.items.get(&slot.media_id).cloned())
                    .collect();
                enrich_episodes(definition, &members)
            }
            None => {
                let mut members: Vec<MediaItem> = self
                    .items
                    .values()
                    .filter(|item| item.series_id.as_deref() == Some(series_id))
                    .cloned()
                    .collect();
                members.sort_by(|left, right| left.media_id.cmp(&right.media_id));
                members
            }
        };
        episodes.sort_by_key(MediaItem::ordering_key);
        episodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "items": [
            {"mediaId": "s1e2", "title": "Second", "duration": 1200},
            {"mediaId": "s1e1", "title": "First", "duration": 1200},
            {"mediaId": "s2e1", "title": "Return", "duration": 1300},
            {"mediaId": "movie", "title": "Agent 327", "duration": 230},
            {"mediaId": "loose-b", "seriesId": "loose", "duration": 60, "episodeNumber": 2},
            {"mediaId": "loose-a", "seriesId": "loose", "duration": 60, "episodeNumber": 1}
        ],
        "series": [
            {"seriesId": "show", "title": "The Show", "episodes": [
                {"mediaId": "s2e1", "seasonNumber": 2, "episodeNumber": 1},
                {"mediaId": "s1e2", "seasonNumber": 1, "episodeNumber": 2},
                {"mediaId": "gone", "seasonNumber": 1, "episodeNumber": 3},
                {"mediaId": "s1e1", "seasonNumber": 1, "episodeNumber": 1}
            ]}
        ]
    }"#;

    #[test]
    fn series_episodes_are_enriched_and_ordered() {
        let catalog = StaticCatalog::from_json(CATALOG).expect("catalog should parse");
        let episodes = catalog.series_episodes("show");
        let ids: Vec<&str> = episodes.iter().map(|item| item.media_id.as_str()).collect();
        assert_eq!(ids, vec!["s1e1", "s1e2", "s2e1"]);
        assert!(
            episodes
                .iter()
                .all(|item| item.series_id.as_deref() == Some("show"))
        );
        assert_eq!(episodes[2].season_number, Some(2));
    }

    #[test]
    fn series_without_definition_falls_back_to_item_series_ids() {
        let catalog = StaticCatalog::from_json(CATALOG).expect("catalog should parse");
        let ids: Vec<String> = catalog
            .series_episodes("loose")
            .into_iter()
            .map(|item| item.media_id)
            .collect();
        assert_eq!(ids, vec!["loose-a", "loose-b"]);
        assert!(catalog.series_episodes("unknown").is_empty());
    }

    #[test]
    fn enrich_episodes_leaves_foreign_items_untouched() {
        let series = SeriesDefinition {
            series_id: "show".to_string(),
            title: String::new(),
            episodes: vec![EpisodeSlot {
                media_id: "a".to_string(),
                season_number: Some(3),
                episode_number: None,
            }],
        };
        let items = vec![
            MediaItem {
                media_id: "a".to_string(),
                title: String::new(),
                series_id: None,
                duration: 10.0,
                season_number: None,
                episode_number: Some(4),
            },
            MediaItem {
                media_id: "b".to_string(),
                title: String::new(),
                series_id: None,
                duration: 10.0,
                season_number: None,
                episode_number: None,
            },
        ];
        let enriched = enrich_episodes(&series, &items);
        assert_eq!(enriched[0].ordering_key(), (3, 4));
        assert_eq!(enriched[0].series_id.as_deref(), Some("show"));
        assert_eq!(enriched[1], items[1]);
    }

    #[test]
    fn load_reads_catalog_file() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("catalog.json");
        fs::write(&path, CATALOG).expect("catalog should be written");
        let catalog = StaticCatalog::load(&path).expect("catalog should load");
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog.series_title("show"), Some("The Show"));
        assert_eq!(
            catalog.item("movie").map(MediaItem::display_title),
            Some("Agent 327")
        );
        assert!(StaticCatalog::load(&dir.path().join("missing.json")).is_err());
    }
}
