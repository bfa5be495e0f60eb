//! Candidate entities and the fixed-length wheel sample.
//!
//! A `Sample` always holds exactly `SLOT_COUNT` slots. Short inputs are
//! right-padded with `SlotState::Empty` and long inputs are truncated, both
//! when constructed in code and when deserialized from the wire.

use serde::{Deserialize, Serialize};

/// Number of wedges on the wheel.
pub const SLOT_COUNT: usize = 16;

/// What a candidate represents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    #[default]
    Game,
    Console,
    Suggestion,
}

/// A game, console, or viewer suggestion that can land on the wheel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateEntity {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub kind: EntityKind,
}

impl CandidateEntity {
    pub fn game(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            console_name: None,
            image_url: None,
            kind: EntityKind::Game,
        }
    }

    /// Console entities use `console-<name>` ids so they never collide with games.
    pub fn console(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: format!("console-{name}"),
            title: name.clone(),
            console_name: Some(name),
            image_url: None,
            kind: EntityKind::Console,
        }
    }

    pub fn with_console(mut self, console: impl Into<String>) -> Self {
        self.console_name = Some(console.into());
        self
    }
}

/// One wedge of the wheel. Serializes as `null` or the entity object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<CandidateEntity>", into = "Option<CandidateEntity>")]
pub enum SlotState {
    #[default]
    Empty,
    Occupied(CandidateEntity),
}

impl SlotState {
    pub fn entity(&self) -> Option<&CandidateEntity> {
        match self {
            SlotState::Empty => None,
            SlotState::Occupied(e) => Some(e),
        }
    }

    pub fn is_occupied(&self) -> bool {
        matches!(self, SlotState::Occupied(_))
    }
}

impl From<Option<CandidateEntity>> for SlotState {
    fn from(value: Option<CandidateEntity>) -> Self {
        match value {
            Some(e) => SlotState::Occupied(e),
            None => SlotState::Empty,
        }
    }
}

impl From<SlotState> for Option<CandidateEntity> {
    fn from(value: SlotState) -> Self {
        match value {
            SlotState::Occupied(e) => Some(e),
            SlotState::Empty => None,
        }
    }
}

/// Ordered, fixed-length set of slots rendered as wedges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SlotState>", into = "Vec<SlotState>")]
pub struct Sample {
    slots: Vec<SlotState>,
}

impl Sample {
    /// All-`Empty` sample.
    pub fn empty() -> Self {
        Self {
            slots: vec![SlotState::Empty; SLOT_COUNT],
        }
    }

    /// Build from arbitrary slots, padding or truncating to `SLOT_COUNT`.
    pub fn from_slots(mut slots: Vec<SlotState>) -> Self {
        slots.truncate(SLOT_COUNT);
        slots.resize(SLOT_COUNT, SlotState::Empty);
        Self { slots }
    }

    /// Occupy slots in order with `entities`, then pad with `Empty`.
    pub fn from_entities(entities: impl IntoIterator<Item = CandidateEntity>) -> Self {
        Self::from_slots(entities.into_iter().map(SlotState::Occupied).collect())
    }

    pub fn slots(&self) -> &[SlotState] {
        &self.slots
    }

    pub fn get(&self, idx: usize) -> Option<&SlotState> {
        self.slots.get(idx)
    }

    /// The entity at `idx`, if the slot exists and is occupied.
    pub fn entity(&self, idx: usize) -> Option<&CandidateEntity> {
        self.slots.get(idx).and_then(SlotState::entity)
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_occupied()).count()
    }

    pub fn is_all_empty(&self) -> bool {
        self.occupied_count() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlotState> {
        self.slots.iter()
    }
}

impl Default for Sample {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<SlotState>> for Sample {
    fn from(slots: Vec<SlotState>) -> Self {
        Self::from_slots(slots)
    }
}

impl From<Sample> for Vec<SlotState> {
    fn from(sample: Sample) -> Self {
        sample.slots
    }
}
