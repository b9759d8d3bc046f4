// Trail catalog: the in-memory dataset the dialogue selects from.
//
// Records are validated once at load time; after that the catalog is
// read-only shared state and needs no synchronization. Per-request ranking
// annotations live on `planner::Candidate`, never here.

use serde::de::{Deserializer, Error as DeError};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Ordinal difficulty levels, easiest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Difficulty {
    VeryEasy,
    Easy,
    Moderate,
    Hard,
    VeryHard,
}

impl Difficulty {
    /// All levels in ordinal order.
    pub const ALL: [Difficulty; 5] = [
        Difficulty::VeryEasy,
        Difficulty::Easy,
        Difficulty::Moderate,
        Difficulty::Hard,
        Difficulty::VeryHard,
    ];

    /// Lowercase label used for matching and serialization.
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::VeryEasy => "very easy",
            Difficulty::Easy => "easy",
            Difficulty::Moderate => "moderate",
            Difficulty::Hard => "hard",
            Difficulty::VeryHard => "very hard",
        }
    }

    /// Human-facing label for prompts.
    pub fn title(&self) -> &'static str {
        match self {
            Difficulty::VeryEasy => "Very Easy",
            Difficulty::Easy => "Easy",
            Difficulty::Moderate => "Moderate",
            Difficulty::Hard => "Hard",
            Difficulty::VeryHard => "Very Hard",
        }
    }

    /// Find a level mentioned anywhere in an utterance, case-insensitively.
    /// Two-word labels are checked first so "very easy" is never read as
    /// "easy" and "very hard" is never read as "hard".
    pub fn scan(utterance: &str) -> Option<Difficulty> {
        const SCAN_ORDER: [Difficulty; 5] = [
            Difficulty::VeryEasy,
            Difficulty::VeryHard,
            Difficulty::Moderate,
            Difficulty::Easy,
            Difficulty::Hard,
        ];
        let lowered = utterance.to_lowercase().replace(['-', '_'], " ");
        SCAN_ORDER
            .iter()
            .copied()
            .find(|level| lowered.contains(level.label()))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown difficulty '{0}'")]
pub struct ParseDifficultyError(String);

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .to_lowercase()
            .replace(['-', '_'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        Difficulty::ALL
            .iter()
            .copied()
            .find(|level| level.label() == normalized)
            .ok_or_else(|| ParseDifficultyError(s.to_string()))
    }
}

impl Serialize for Difficulty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(DeError::custom)
    }
}

/// One row of the catalog. Immutable for the lifetime of the process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trail {
    /// Unique key within the catalog
    pub name: String,
    pub difficulty: Difficulty,
    /// Total length in kilometers
    pub distance_km: f64,
    /// Free-form route shape, e.g. loop / out-and-back / ridge
    #[serde(default)]
    pub route: String,
    /// Total ascent in meters
    pub elevation_gain_m: f64,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub region: String,
}

/// Tags arrive either as a list or as one comma-separated string, depending
/// on how the dataset was exported.
fn deserialize_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TagsField {
        List(Vec<String>),
        Joined(String),
    }

    match Option::<TagsField>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(TagsField::List(tags)) => Ok(tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()),
        Some(TagsField::Joined(joined)) => Ok(joined
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid trail record '{name}': {reason}")]
    InvalidRecord { name: String, reason: String },
}

/// The loaded catalog. Built once, shared read-only, replaced only by a
/// full reload.
#[derive(Clone, Debug, Default)]
pub struct TrailCatalog {
    trails: Vec<Trail>,
}

impl TrailCatalog {
    /// Build from records already validated by the loader.
    pub fn new(trails: Vec<Trail>) -> Self {
        Self { trails }
    }

    /// Load a JSON array of trail records, validating numeric fields.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let trails: Vec<Trail> = serde_json::from_str(&raw)?;
        for trail in &trails {
            validate_trail(trail)?;
        }
        tracing::debug!(count = trails.len(), "trail catalog loaded");
        Ok(Self { trails })
    }

    /// Exact-match lookup by the unique trail name.
    pub fn get(&self, name: &str) -> Option<&Trail> {
        self.trails.iter().find(|t| t.name == name)
    }

    /// All trails in insertion order.
    pub fn trails(&self) -> &[Trail] {
        &self.trails
    }

    pub fn len(&self) -> usize {
        self.trails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }
}

fn validate_trail(trail: &Trail) -> Result<(), CatalogError> {
    if trail.name.trim().is_empty() {
        return Err(CatalogError::InvalidRecord {
            name: trail.name.clone(),
            reason: "empty name".to_string(),
        });
    }
    if !trail.distance_km.is_finite() || trail.distance_km < 0.0 {
        return Err(CatalogError::InvalidRecord {
            name: trail.name.clone(),
            reason: format!("distance_km must be non-negative, got {}", trail.distance_km),
        });
    }
    if !trail.elevation_gain_m.is_finite() || trail.elevation_gain_m < 0.0 {
        return Err(CatalogError::InvalidRecord {
            name: trail.name.clone(),
            reason: format!(
                "elevation_gain_m must be non-negative, got {}",
                trail.elevation_gain_m
            ),
        });
    }
    Ok(())
}
