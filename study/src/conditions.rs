//! Study conditions and their per-pass shuffling.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One combination shown to a participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    pub marker: String,
    pub scenario: String,
    pub framerate: u32,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "marker={} scenario={} framerate={}Hz",
            self.marker, self.scenario, self.framerate
        )
    }
}

/// The values each condition dimension can take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionLists {
    pub framerates: Vec<u32>,
    pub markers: Vec<String>,
    pub scenarios: Vec<String>,
}

impl Default for ConditionLists {
    fn default() -> Self {
        Self {
            framerates: vec![60, 120, 144, 240],
            markers: ["qr", "aruco", "point"].map(String::from).to_vec(),
            scenarios: ["text_w", "text_d", "image"].map(String::from).to_vec(),
        }
    }
}

impl ConditionLists {
    /// Number of conditions in one pass.
    pub fn combinations(&self) -> usize {
        self.framerates.len() * self.markers.len() * self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations() == 0
    }

    /// Independent uniform permutation of every list.
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let mut lists = self.clone();
        lists.framerates.shuffle(rng);
        lists.markers.shuffle(rng);
        lists.scenarios.shuffle(rng);
        lists
    }
}
