//! Sample content addressing for idempotent change detection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Sample, SlotState};

const EMPTY_SENTINEL: &str = "-";
const SEPARATOR: char = '|';
const ESCAPE: char = '\\';

/// Order-sensitive digest of a sample's slot ids: `"g1|g7|-|-|..."`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleHash(String);

impl SampleHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ids are escaped so that no id, or run of ids, can spell the separator
/// or the empty-slot sentinel: `\` and `|` get a backslash, as does a
/// leading `-`.
pub fn sample_hash(sample: &Sample) -> SampleHash {
    let mut out = String::new();
    for (i, slot) in sample.iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        match slot {
            SlotState::Empty => out.push_str(EMPTY_SENTINEL),
            SlotState::Occupied(e) => push_escaped(&mut out, &e.id),
        }
    }
    SampleHash(out)
}

fn push_escaped(out: &mut String, id: &str) {
    if id.starts_with('-') {
        out.push(ESCAPE);
    }
    for c in id.chars() {
        if c == SEPARATOR || c == ESCAPE {
            out.push(ESCAPE);
        }
        out.push(c);
    }
}
