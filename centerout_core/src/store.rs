//! Parameter store: the active `Params` plus everything derived from it.
//!
//! `reload` builds the replacement completely before swapping, so a failed
//! reload leaves the previous configuration, layout and deadlines in place.

use crate::error::CoreError;
use crate::geometry::Point;
use crate::layout::TargetSet;
use crate::util::secs_to_duration;
use centerout_config::{HoldRange, ParamTable, Params};
use std::time::Duration;

/// Per-state deadline policy derived from `Params`.
///
/// The two first-target holds are ranges sampled on each entry; the rest are
/// fixed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateDeadlines {
    pub hold_t1_short: HoldRange,
    pub hold_t1_long: HoldRange,
    pub go: Duration,
    pub move_: Duration,
    pub hold_t2: Duration,
    pub overshoot: Duration,
    pub reward: Duration,
}

impl From<&Params> for StateDeadlines {
    fn from(p: &Params) -> Self {
        Self {
            hold_t1_short: p.hold_t1_short,
            hold_t1_long: p.hold_t1_long,
            go: secs_to_duration(p.go_limit),
            move_: secs_to_duration(p.move_limit),
            hold_t2: secs_to_duration(p.hold_t2_limit),
            overshoot: secs_to_duration(p.overshoot_limit),
            reward: secs_to_duration(p.reward_delay),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParameterStore {
    params: Params,
    center: Point,
    layout: TargetSet,
    deadlines: StateDeadlines,
}

impl ParameterStore {
    /// Build a store for a canvas centered at `center`.
    pub fn new(params: Params, center: Point) -> Self {
        let layout = Self::layout_for(&params, center);
        let deadlines = StateDeadlines::from(&params);
        Self {
            params,
            center,
            layout,
            deadlines,
        }
    }

    pub fn from_table(table: &ParamTable, center: Point) -> Result<Self, CoreError> {
        let params = Params::from_table(table)?;
        Ok(Self::new(params, center))
    }

    fn layout_for(params: &Params, center: Point) -> TargetSet {
        TargetSet::generate(
            params.n_targets,
            params.ring_radius,
            params.angle_offset_deg.to_radians(),
            center,
        )
    }

    /// Replace the configuration atomically. `sequence` is the target
    /// sequence currently in use; a table whose target count cannot address
    /// every index in it is rejected.
    pub fn reload(&mut self, table: &ParamTable, sequence: &[usize]) -> Result<(), CoreError> {
        let next = Self::new(Params::from_table(table)?, self.center);
        next.check_sequence(sequence)?;
        *self = next;
        Ok(())
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn layout(&self) -> &TargetSet {
        &self.layout
    }

    pub fn deadlines(&self) -> &StateDeadlines {
        &self.deadlines
    }

    #[inline]
    pub fn tolerance(&self) -> f64 {
        self.params.tolerance()
    }

    /// Check a target sequence against the current target count.
    pub fn check_sequence(&self, sequence: &[usize]) -> Result<(), CoreError> {
        match sequence.iter().find(|&&i| i >= self.params.n_targets) {
            Some(&bad) => Err(CoreError::TargetOutOfRange {
                index: bad,
                n_targets: self.params.n_targets,
            }),
            None => Ok(()),
        }
    }
}
