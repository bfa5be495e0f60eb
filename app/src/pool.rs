//! Candidate pool building: library + mode + filters → eligible entities.

use std::collections::BTreeSet;

use gamewheel::{BonusCategory, BonusMode, CandidateEntity, EntityKind, FilterSettings, WheelMode};

use crate::library::{Library, LibraryGame};

const TILDE_TAGS: [(&str, BonusCategory); 5] = [
    ("hack", BonusCategory::Hack),
    ("prototype", BonusCategory::Prototype),
    ("demo", BonusCategory::Demo),
    ("homebrew", BonusCategory::Homebrew),
    ("unlicensed", BonusCategory::Unlicensed),
];

/// Bonus content tags found in a title (`~Hack~`, `[Subset - Bonus]`, ...).
pub fn bonus_categories(title: &str) -> Vec<BonusCategory> {
    let mut found = Vec::new();

    let is_subset = title.split('[').skip(1).any(|rest| {
        rest.split_once(']')
            .is_some_and(|(inside, _)| inside.trim_start().to_lowercase().starts_with("subset"))
    });
    if is_subset {
        found.push(BonusCategory::Subset);
    }

    // Text between any two consecutive tildes.
    let parts: Vec<&str> = title.split('~').collect();
    if parts.len() > 2 {
        for inner in &parts[1..parts.len() - 1] {
            let tag = inner.trim().to_lowercase();
            if let Some((_, cat)) = TILDE_TAGS.iter().find(|(name, _)| *name == tag)
                && !found.contains(cat)
            {
                found.push(*cat);
            }
        }
    }
    found
}

pub fn is_bonus(title: &str) -> bool {
    !bonus_categories(title).is_empty()
}

/// Canonical console key so `ps2`, `PS2` and `Sony PlayStation 2` compare equal.
pub fn normalize_console_key(value: &str) -> String {
    let mut base = value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    if let Some(rest) = base.strip_prefix("sony ")
        && rest.starts_with("playstation")
    {
        base = rest.to_string();
    }
    let alias = match base.as_str() {
        "ps1" | "psx" | "playstation 1" | "psone" => "playstation",
        "ps2" => "playstation 2",
        "ps3" => "playstation 3",
        "ps4" => "playstation 4",
        "ps5" => "playstation 5",
        "psp" => "playstation portable",
        "vita" => "playstation vita",
        "psn" => "playstation network",
        _ => return base,
    };
    alias.to_string()
}

fn console_matches(game: &LibraryGame, key: &str) -> bool {
    game.console
        .as_deref()
        .is_some_and(|c| normalize_console_key(c) == key)
        || game
            .console_id
            .as_deref()
            .is_some_and(|c| normalize_console_key(c) == key)
}

fn game_entity(game: &LibraryGame) -> CandidateEntity {
    CandidateEntity {
        id: game.id.clone(),
        title: game.title.clone(),
        console_name: game.console.clone().or_else(|| game.console_id.clone()),
        image_url: game.image_url.clone(),
        kind: EntityKind::Game,
    }
}

/// Build the eligible pool for `mode` under `settings`.
///
/// Console mode yields one entity per distinct console, sorted by name.
/// Game mode applies the console filter, then the bonus filter, then appends
/// open suggestions when enabled. `Exclude` drops only the configured
/// categories, or every bonus title when none are configured.
pub fn build_pool(library: &Library, mode: WheelMode, settings: &FilterSettings) -> Vec<CandidateEntity> {
    match mode {
        WheelMode::Console => console_pool(library),
        WheelMode::Game => game_pool(library, settings),
    }
}

fn console_pool(library: &Library) -> Vec<CandidateEntity> {
    let consoles: BTreeSet<&str> = library
        .games
        .iter()
        .filter_map(|g| g.console.as_deref().or(g.console_id.as_deref()))
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    consoles.into_iter().map(CandidateEntity::console).collect()
}

fn game_pool(library: &Library, settings: &FilterSettings) -> Vec<CandidateEntity> {
    let filter_key = settings.console_filter().map(normalize_console_key);

    let mut pool: Vec<CandidateEntity> = library
        .games
        .iter()
        .filter(|g| filter_key.as_deref().is_none_or(|key| console_matches(g, key)))
        .filter(|g| match settings.bonus_mode {
            BonusMode::Include => true,
            BonusMode::Exclude => !settings.excludes_bonus(&bonus_categories(&g.title)),
            BonusMode::Only => is_bonus(&g.title),
        })
        .map(game_entity)
        .collect();

    if settings.include_suggestions {
        pool.extend(
            library
                .open_suggestions()
                .filter(|s| match (&filter_key, s.console.as_deref()) {
                    (Some(key), Some(console)) => normalize_console_key(console) == *key,
                    _ => true,
                })
                .map(|s| CandidateEntity {
                    id: format!("suggestion-{}", s.id),
                    title: s.title.clone(),
                    console_name: s.console.clone(),
                    image_url: None,
                    kind: EntityKind::Suggestion,
                }),
        );
    }
    pool
}
