//! The trial state machine.
//!
//! States and triggers are plain enums; `transition` is the whole table
//! (source x trigger -> destination + ordered effects) and `Machine::fire` is
//! the single dispatcher that applies it. Triggers that have no row for the
//! current state are ignored.
//!
//! Every state entry bumps a generation counter. Timeouts are delivered as
//! `(state, generation)` pairs and only fire when both still match, so a
//! timeout that lost the race against a geometric trigger is dropped.

use crate::geometry::{Point, contains, randomized_duration};
use crate::layout::Role;
use crate::sequencer::TargetSequencer;
use crate::store::{ParameterStore, StateDeadlines};
use crate::util::{duration_ms, secs_to_duration};
use centerout_config::{HoldRange, TrialBlocks};
use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrialState {
    Idle,
    PreTarget1,
    HoldTarget1Short,
    HoldTarget1Long,
    Go,
    Move,
    HoldTarget2,
    Overshoot,
    Reward,
}

impl TrialState {
    pub const ALL: [TrialState; 9] = [
        TrialState::Idle,
        TrialState::PreTarget1,
        TrialState::HoldTarget1Short,
        TrialState::HoldTarget1Long,
        TrialState::Go,
        TrialState::Move,
        TrialState::HoldTarget2,
        TrialState::Overshoot,
        TrialState::Reward,
    ];

    /// Name used in outbound snapshots and logs.
    pub fn wire_name(self) -> &'static str {
        match self {
            TrialState::Idle => "idle",
            TrialState::PreTarget1 => "t1_pre",
            TrialState::HoldTarget1Short => "t1_hold_1",
            TrialState::HoldTarget1Long => "t1_hold_2",
            TrialState::Go => "go",
            TrialState::Move => "move",
            TrialState::HoldTarget2 => "t2_hold_1",
            TrialState::Overshoot => "overshoot",
            TrialState::Reward => "reward",
        }
    }

    /// Trigger fired when the state's deadline elapses, if it has one.
    pub fn timeout_trigger(self) -> Option<Trigger> {
        match self {
            TrialState::Idle | TrialState::PreTarget1 => None,
            TrialState::HoldTarget1Short => Some(Trigger::Instruct),
            TrialState::HoldTarget1Long => Some(Trigger::Cue),
            TrialState::Go | TrialState::Move | TrialState::Overshoot => Some(Trigger::Fail),
            TrialState::HoldTarget2 => Some(Trigger::Succeed),
            TrialState::Reward => Some(Trigger::Advance),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Start,
    Resume,
    Pause,
    Stop,
    Reset,
    EnterT1,
    LeaveT1,
    Instruct,
    Cue,
    React,
    Fail,
    EnterT2,
    Overshoot,
    Succeed,
    Advance,
}

impl Trigger {
    pub fn name(self) -> &'static str {
        match self {
            Trigger::Start => "start",
            Trigger::Resume => "resume",
            Trigger::Pause => "pause",
            Trigger::Stop => "stop",
            Trigger::Reset => "reset",
            Trigger::EnterT1 => "enter_t1",
            Trigger::LeaveT1 => "leave_t1",
            Trigger::Instruct => "instruct",
            Trigger::Cue => "cue",
            Trigger::React => "react",
            Trigger::Fail => "fail",
            Trigger::EnterT2 => "enter_t2",
            Trigger::Overshoot => "overshoot",
            Trigger::Succeed => "succeed",
            Trigger::Advance => "advance",
        }
    }
}

/// Side effect attached to a transition, applied in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Zero every counter, overshoots included.
    ClearCounters,
    /// unsuccessful += 1, total += 1, overshoots = 0.
    CountFailure,
    /// overshoots += 1.
    CountOvershoot,
    /// Ask the reward dispenser to fire.
    SignalReward,
    /// successful += 1, total += 1, overshoots = 0, then flip the pairing
    /// and advance the target sequence on even successes.
    CountSuccess,
}

/// The transition table.
pub fn transition(from: TrialState, trigger: Trigger) -> Option<(TrialState, &'static [Effect])> {
    use TrialState::*;
    match (from, trigger) {
        (Idle, Trigger::Start | Trigger::Resume) => Some((PreTarget1, &[])),
        (_, Trigger::Pause | Trigger::Stop) => Some((Idle, &[])),
        (_, Trigger::Reset) => Some((PreTarget1, &[Effect::ClearCounters])),
        (PreTarget1, Trigger::EnterT1) => Some((HoldTarget1Short, &[])),
        (HoldTarget1Short, Trigger::LeaveT1) => Some((PreTarget1, &[])),
        (HoldTarget1Short, Trigger::Instruct) => Some((HoldTarget1Long, &[])),
        (HoldTarget1Long, Trigger::Cue) => Some((Go, &[])),
        (Go, Trigger::React) => Some((Move, &[])),
        (_, Trigger::Fail) => Some((PreTarget1, &[Effect::CountFailure])),
        (Move | Overshoot, Trigger::EnterT2) => Some((HoldTarget2, &[])),
        (HoldTarget2, Trigger::Overshoot) => Some((Overshoot, &[Effect::CountOvershoot])),
        (HoldTarget2, Trigger::Succeed) => Some((Reward, &[Effect::SignalReward])),
        (Reward, Trigger::Advance) => Some((PreTarget1, &[Effect::CountSuccess])),
        _ => None,
    }
}

/// Which ring holds the first and second target of the trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Inner first, then outer (center-out).
    #[default]
    Default,
    /// Outer first, then inner (out-center).
    Alternate,
}

impl Direction {
    pub fn primary(self) -> Role {
        match self {
            Direction::Default => Role::Inner,
            Direction::Alternate => Role::Outer,
        }
    }

    pub fn secondary(self) -> Role {
        match self {
            Direction::Default => Role::Outer,
            Direction::Alternate => Role::Inner,
        }
    }

    pub fn wire_name(self) -> &'static str {
        self.secondary().wire_name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrialCounters {
    pub total: u64,
    pub successful: u64,
    pub unsuccessful: u64,
    pub overshoots: u64,
}

/// Experiment block a trial number falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Baseline,
    Perturbation,
    Washout,
    Complete,
}

impl Block {
    pub fn for_trial(total: u64, blocks: &TrialBlocks) -> Self {
        let baseline = u64::from(blocks.baseline);
        let perturbation = baseline + u64::from(blocks.perturbation);
        let washout = perturbation + u64::from(blocks.washout);
        if total < baseline {
            Block::Baseline
        } else if total < perturbation {
            Block::Perturbation
        } else if total < washout {
            Block::Washout
        } else {
            Block::Complete
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            Block::Baseline => "baseline",
            Block::Perturbation => "perturbation",
            Block::Washout => "washout",
            Block::Complete => "complete",
        }
    }
}

/// Result of a trigger that matched a table row.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub trigger: Trigger,
    pub from: TrialState,
    pub to: TrialState,
    /// Generation of the state just entered.
    pub generation: u64,
    /// Deadline armed for the state just entered.
    pub deadline: Option<Duration>,
    pub effects: &'static [Effect],
    /// The target sequence advanced past its last index and started over.
    pub wrapped: bool,
}

impl Transition {
    pub fn has(&self, effect: Effect) -> bool {
        self.effects.contains(&effect)
    }
}

pub struct Machine<R: Rng> {
    state: TrialState,
    generation: u64,
    direction: Direction,
    counters: TrialCounters,
    sequencer: TargetSequencer,
    deadline: Option<Duration>,
    hold_spread: f64,
    rng: R,
}

impl<R: Rng> core::fmt::Debug for Machine<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Machine")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("direction", &self.direction)
            .field("counters", &self.counters)
            .field("target", &self.sequencer.current())
            .finish()
    }
}

impl<R: Rng> Machine<R> {
    /// A machine in `Idle`. `hold_spread` is the K constant used when
    /// sampling the first-target hold deadlines.
    pub fn new(sequencer: TargetSequencer, hold_spread: f64, rng: R) -> Self {
        Self {
            state: TrialState::Idle,
            generation: 0,
            direction: Direction::Default,
            counters: TrialCounters::default(),
            sequencer,
            deadline: None,
            hold_spread,
            rng,
        }
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn counters(&self) -> TrialCounters {
        self.counters
    }

    /// Deadline armed for the current state.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Index of the current target.
    pub fn target(&self) -> usize {
        self.sequencer.current()
    }

    pub fn sequencer(&self) -> &TargetSequencer {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut TargetSequencer {
        &mut self.sequencer
    }

    /// Apply `trigger` if the table has a row for it in the current state.
    pub fn fire(&mut self, trigger: Trigger, store: &ParameterStore) -> Option<Transition> {
        let from = self.state;
        let Some((to, effects)) = transition(from, trigger) else {
            tracing::debug!(state = from.wire_name(), trigger = trigger.name(), "ignoring trigger");
            return None;
        };

        tracing::info!(state = from.wire_name(), trigger = trigger.name(), "left state");
        let mut wrapped = false;
        for effect in effects {
            wrapped |= self.apply(*effect);
        }

        self.state = to;
        self.generation = self.generation.wrapping_add(1);
        self.deadline = self.sample_deadline(to, store.deadlines());

        tracing::info!(
            state = to.wire_name(),
            generation = self.generation,
            deadline_ms = self.deadline.map(duration_ms),
            total = self.counters.total,
            successful = self.counters.successful,
            "entered state"
        );

        Some(Transition {
            trigger,
            from,
            to,
            generation: self.generation,
            deadline: self.deadline,
            effects,
            wrapped,
        })
    }

    /// Fire the timeout trigger of `state` if the machine is still in the
    /// same entry of that state; otherwise the timeout is stale and dropped.
    pub fn on_timeout(
        &mut self,
        state: TrialState,
        generation: u64,
        store: &ParameterStore,
    ) -> Option<Transition> {
        if state != self.state || generation != self.generation {
            tracing::debug!(
                timeout_state = state.wire_name(),
                timeout_generation = generation,
                state = self.state.wire_name(),
                generation = self.generation,
                "discarding stale timeout"
            );
            return None;
        }
        let trigger = state.timeout_trigger()?;
        self.fire(trigger, store)
    }

    /// Evaluate geometric conditions for the current state against a
    /// smoothed cursor position and fire at most one trigger.
    pub fn on_sample(&mut self, cursor: Point, store: &ParameterStore) -> Option<Transition> {
        let trigger = match self.state {
            TrialState::Idle | TrialState::Reward => None,
            TrialState::PreTarget1 => self.in_primary(cursor, store).then_some(Trigger::EnterT1),
            TrialState::HoldTarget1Short => {
                (!self.in_primary(cursor, store)).then_some(Trigger::LeaveT1)
            }
            TrialState::HoldTarget1Long => {
                (!self.in_primary(cursor, store)).then_some(Trigger::Fail)
            }
            TrialState::Go => (!self.in_primary(cursor, store)).then_some(Trigger::React),
            TrialState::Move => self.in_secondary(cursor, store).then_some(Trigger::EnterT2),
            TrialState::HoldTarget2 => {
                (!self.in_secondary(cursor, store)).then_some(Trigger::Overshoot)
            }
            TrialState::Overshoot => self.in_secondary(cursor, store).then_some(Trigger::EnterT2),
        }?;
        self.fire(trigger, store)
    }

    pub fn in_primary(&self, cursor: Point, store: &ParameterStore) -> bool {
        self.in_role(self.direction.primary(), cursor, store)
    }

    pub fn in_secondary(&self, cursor: Point, store: &ParameterStore) -> bool {
        self.in_role(self.direction.secondary(), cursor, store)
    }

    fn in_role(&self, role: Role, cursor: Point, store: &ParameterStore) -> bool {
        store
            .layout()
            .get(role, self.sequencer.current())
            .is_some_and(|target| contains(target, cursor, store.tolerance()))
    }

    /// Returns true when the effect wrapped the target sequence.
    fn apply(&mut self, effect: Effect) -> bool {
        let n = &mut self.counters;
        match effect {
            Effect::ClearCounters => {
                *n = TrialCounters::default();
                tracing::info!("counters reset");
            }
            Effect::CountFailure => {
                n.unsuccessful += 1;
                n.total += 1;
                n.overshoots = 0;
            }
            Effect::CountOvershoot => {
                n.overshoots += 1;
                tracing::info!(overshoots = n.overshoots, "overshoot");
            }
            Effect::SignalReward => {
                tracing::info!(successful = n.successful, "reward signal");
            }
            Effect::CountSuccess => {
                n.successful += 1;
                n.total += 1;
                n.overshoots = 0;
                if n.successful % 2 == 0 {
                    self.direction = Direction::Default;
                    let next = self.sequencer.advance();
                    tracing::debug!(target_index = next, "advanced target");
                    return self.sequencer.at_start();
                }
                self.direction = Direction::Alternate;
            }
        }
        false
    }

    fn sample_deadline(&mut self, state: TrialState, d: &StateDeadlines) -> Option<Duration> {
        match state {
            TrialState::Idle | TrialState::PreTarget1 => None,
            TrialState::HoldTarget1Short => Some(self.sample_hold(d.hold_t1_short)),
            TrialState::HoldTarget1Long => Some(self.sample_hold(d.hold_t1_long)),
            TrialState::Go => Some(d.go),
            TrialState::Move => Some(d.move_),
            TrialState::HoldTarget2 => Some(d.hold_t2),
            TrialState::Overshoot => Some(d.overshoot),
            TrialState::Reward => Some(d.reward),
        }
    }

    fn sample_hold(&mut self, range: HoldRange) -> Duration {
        secs_to_duration(randomized_duration(
            range.min,
            range.max,
            self.hold_spread,
            &mut self.rng,
        ))
    }
}
