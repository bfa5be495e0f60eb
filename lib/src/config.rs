use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::WheelMode;

/// Default spin animation length.
pub const DEFAULT_SPIN_DURATION_MS: u64 = 4500;
/// Default number of full rotations before landing.
pub const DEFAULT_SPIN_TURNS: u32 = 8;

pub const MIN_SPIN_DURATION_MS: u64 = 1500;
pub const MAX_SPIN_DURATION_MS: u64 = 20_000;
pub const MIN_SPIN_TURNS: u32 = 3;
pub const MAX_SPIN_TURNS: u32 = 30;

/// Console filter value meaning "no filter".
pub const CONSOLE_FILTER_ALL: &str = "All";

/// How titles tagged as bonus content (`~Hack~`, `[Subset - ...]`, ...) are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusMode {
    Include,
    #[default]
    Exclude,
    Only,
}

impl fmt::Display for BonusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Include => write!(f, "include"),
            Self::Exclude => write!(f, "exclude"),
            Self::Only => write!(f, "only"),
        }
    }
}

/// Bonus content tag found in a library title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusCategory {
    Subset,
    Hack,
    Prototype,
    Demo,
    Homebrew,
    Unlicensed,
}

impl BonusCategory {
    pub const ALL: [BonusCategory; 6] = [
        Self::Subset,
        Self::Hack,
        Self::Prototype,
        Self::Demo,
        Self::Homebrew,
        Self::Unlicensed,
    ];
}

impl fmt::Display for BonusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subset => write!(f, "subset"),
            Self::Hack => write!(f, "hack"),
            Self::Prototype => write!(f, "prototype"),
            Self::Demo => write!(f, "demo"),
            Self::Homebrew => write!(f, "homebrew"),
            Self::Unlicensed => write!(f, "unlicensed"),
        }
    }
}

/// Where the server picks the winner from.
///
/// `Pool` draws the winner from the full eligible pool and builds a display
/// sample around it. `Sample` picks among the currently visible wedges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinSource {
    #[default]
    Pool,
    Sample,
}

impl fmt::Display for SpinSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pool => write!(f, "pool"),
            Self::Sample => write!(f, "sample"),
        }
    }
}

/// Filter inputs consumed by future idle samples and spins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSettings {
    #[serde(default)]
    pub include_suggestions: bool,
    #[serde(default = "default_console_filter")]
    pub console_filter: String,
    #[serde(default)]
    pub bonus_mode: BonusMode,
    /// Categories dropped in `Exclude` mode. `None` drops every bonus title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_exclusions: Option<BTreeSet<BonusCategory>>,
    #[serde(default)]
    pub spin_source: SpinSource,
    #[serde(default = "default_duration")]
    pub spin_duration_ms: u64,
    #[serde(default = "default_turns")]
    pub spin_turns: u32,
}

fn default_console_filter() -> String {
    CONSOLE_FILTER_ALL.into()
}

fn default_duration() -> u64 {
    DEFAULT_SPIN_DURATION_MS
}

fn default_turns() -> u32 {
    DEFAULT_SPIN_TURNS
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            include_suggestions: false,
            console_filter: default_console_filter(),
            bonus_mode: BonusMode::default(),
            bonus_exclusions: None,
            spin_source: SpinSource::default(),
            spin_duration_ms: DEFAULT_SPIN_DURATION_MS,
            spin_turns: DEFAULT_SPIN_TURNS,
        }
    }
}

impl FilterSettings {
    /// `None` when the filter is "All" (or blank).
    pub fn console_filter(&self) -> Option<&str> {
        let cf = self.console_filter.trim();
        if cf.is_empty() || cf.eq_ignore_ascii_case(CONSOLE_FILTER_ALL) {
            None
        } else {
            Some(cf)
        }
    }

    /// Whether a title carrying `categories` is dropped in `Exclude` mode.
    pub fn excludes_bonus(&self, categories: &[BonusCategory]) -> bool {
        if categories.is_empty() {
            return false;
        }
        match &self.bonus_exclusions {
            None => true,
            Some(set) => categories.iter().any(|c| set.contains(c)),
        }
    }

    /// Merge a partial update. Durations and turns are clamped.
    pub fn apply(&mut self, update: &SettingsUpdate) {
        if let Some(v) = update.include_suggestions {
            self.include_suggestions = v;
        }
        if let Some(v) = &update.console_filter {
            self.console_filter = v.clone();
        }
        if let Some(v) = update.bonus_mode {
            self.bonus_mode = v;
        }
        if let Some(v) = &update.bonus_exclusions {
            self.bonus_exclusions = Some(v.clone());
        }
        if let Some(v) = update.spin_source {
            self.spin_source = v;
        }
        if let Some(v) = update.spin_duration_ms {
            self.spin_duration_ms = clamp_duration(v);
        }
        if let Some(v) = update.spin_turns {
            self.spin_turns = clamp_turns(v);
        }
    }
}

pub fn clamp_duration(ms: u64) -> u64 {
    ms.clamp(MIN_SPIN_DURATION_MS, MAX_SPIN_DURATION_MS)
}

pub fn clamp_turns(turns: u32) -> u32 {
    turns.clamp(MIN_SPIN_TURNS, MAX_SPIN_TURNS)
}

/// Partial settings update (POST /wheel/settings body). Absent fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_suggestions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_mode: Option<BonusMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_exclusions: Option<BTreeSet<BonusCategory>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spin_source: Option<SpinSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spin_duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spin_turns: Option<u32>,
}

// ---------------------------------------------------------------------------
// Persisted config types (shared between app and UI)
// ---------------------------------------------------------------------------

/// Top-level persisted config (`config.toml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamewheelConfig {
    /// Directory holding the built WASM viewer (index.html + glue + wasm).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_dir: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub webserver: HashMap<String, WebserverSection>,
    #[serde(default)]
    pub library: LibrarySection,
    #[serde(default)]
    pub wheel: WheelSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebserverSection {
    #[serde(default)]
    pub name: String,
    pub bind: String,
}

/// Candidate library location. The library itself is maintained elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Authoritative wheel mode and filters, persisted across restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelSection {
    #[serde(default)]
    pub mode: WheelMode,
    #[serde(default)]
    pub settings: FilterSettings,
}

impl Default for GamewheelConfig {
    fn default() -> Self {
        let mut webserver = HashMap::new();
        webserver.insert(
            "0".into(),
            WebserverSection {
                name: "Web Server".into(),
                bind: "0.0.0.0:8787".into(),
            },
        );
        Self {
            ui_dir: None,
            webserver,
            library: LibrarySection::default(),
            wheel: WheelSection::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_update_keeps_other_fields() {
        let mut s = FilterSettings::default();
        s.apply(&SettingsUpdate {
            console_filter: Some("SNES".into()),
            ..Default::default()
        });
        assert_eq!(s.console_filter(), Some("SNES"));
        assert_eq!(s.bonus_mode, BonusMode::Exclude);
        assert_eq!(s.spin_turns, DEFAULT_SPIN_TURNS);
    }

    #[test]
    fn update_clamps_timing() {
        let mut s = FilterSettings::default();
        s.apply(&SettingsUpdate {
            spin_duration_ms: Some(60_000),
            spin_turns: Some(1),
            ..Default::default()
        });
        assert_eq!(s.spin_duration_ms, MAX_SPIN_DURATION_MS);
        assert_eq!(s.spin_turns, MIN_SPIN_TURNS);
    }

    #[test]
    fn all_filter_means_none() {
        let mut s = FilterSettings::default();
        assert_eq!(s.console_filter(), None);
        s.console_filter = " all ".into();
        assert_eq!(s.console_filter(), None);
    }

    #[test]
    fn settings_wire_is_camel_case() {
        let v = serde_json::to_value(FilterSettings::default()).unwrap();
        assert_eq!(v["consoleFilter"], "All");
        assert_eq!(v["bonusMode"], "exclude");
        assert_eq!(v["includeSuggestions"], false);
        assert!(v.get("bonusExclusions").is_none());
    }

    #[test]
    fn settings_can_key_a_hash_set() {
        let mut seen = std::collections::HashSet::new();
        seen.insert(FilterSettings::default());
        let mut other = FilterSettings::default();
        other.spin_source = SpinSource::Sample;
        assert!(seen.insert(other.clone()));
        other.bonus_exclusions = Some(BTreeSet::from([BonusCategory::Hack]));
        assert!(seen.insert(other));
        assert!(!seen.insert(FilterSettings::default()));
    }

    #[test]
    fn exclusions_narrow_the_bonus_filter() {
        let mut s = FilterSettings::default();
        assert!(s.excludes_bonus(&[BonusCategory::Demo]));
        assert!(!s.excludes_bonus(&[]));

        let update: SettingsUpdate =
            serde_json::from_str(r#"{"bonusExclusions": ["hack", "subset"]}"#).unwrap();
        s.apply(&update);
        assert!(s.excludes_bonus(&[BonusCategory::Hack]));
        assert!(s.excludes_bonus(&[BonusCategory::Demo, BonusCategory::Subset]));
        assert!(!s.excludes_bonus(&[BonusCategory::Demo]));

        s.apply(&SettingsUpdate {
            bonus_exclusions: Some(BTreeSet::new()),
            ..Default::default()
        });
        assert!(!s.excludes_bonus(&[BonusCategory::Hack]));
    }
}
