//! Walk over all conditions, pass by pass.
//!
//! Within a pass the shuffled lists are combined like an odometer: the marker
//! changes fastest, then the scenario, then the framerate. Every pass starts
//! from a fresh shuffle.

use rand::Rng;

use crate::conditions::{Condition, ConditionLists};

/// One trial of the schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub condition: Condition,
    /// Refresh rate to switch the display to before showing this trial
    pub switch_rate: Option<u32>,
    /// Zero-based pass number
    pub pass: usize,
    /// Zero-based trial number across all passes
    pub trial: usize,
}

pub struct Schedule<R: Rng> {
    base: ConditionLists,
    current: ConditionLists,
    rng: R,
    passes: usize,
    pass: usize,
    index: usize,
    trial: usize,
}

impl<R: Rng> Schedule<R> {
    pub fn new(lists: ConditionLists, passes: usize, rng: R) -> Self {
        Self {
            current: lists.clone(),
            base: lists,
            rng,
            passes,
            pass: 0,
            index: 0,
            trial: 0,
        }
    }

    /// Trials over all passes.
    pub fn total_trials(&self) -> usize {
        self.passes * self.base.combinations()
    }

    pub fn remaining(&self) -> usize {
        self.total_trials() - self.trial
    }

    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }

    /// Lists of the pass in progress.
    pub fn current_lists(&self) -> &ConditionLists {
        &self.current
    }
}

impl<R: Rng> Iterator for Schedule<R> {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        if self.is_finished() {
            return None;
        }

        if self.index == 0 {
            self.current = self.base.shuffled(&mut self.rng);
        }

        let markers = self.current.markers.len();
        let per_framerate = markers * self.current.scenarios.len();
        let m = self.index % markers;
        let s = (self.index / markers) % self.current.scenarios.len();
        let f = self.index / per_framerate;

        let condition = Condition {
            marker: self.current.markers[m].clone(),
            scenario: self.current.scenarios[s].clone(),
            framerate: self.current.framerates[f],
        };
        let switch_rate = (self.index % per_framerate == 0).then_some(condition.framerate);

        let step = Step {
            condition,
            switch_rate,
            pass: self.pass,
            trial: self.trial,
        };

        self.trial += 1;
        self.index += 1;
        if self.index == self.base.combinations() {
            self.index = 0;
            self.pass += 1;
        }

        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining(), Some(self.remaining()))
    }
}

impl<R: Rng> ExactSizeIterator for Schedule<R> {}
