//! Machine-level trial walks driven without threads: timeouts are delivered
//! by hand as `(state, generation)` pairs.

use centerout_config::ParamValue;
use centerout_core::geometry::Point;
use centerout_core::machine::{Direction, Effect, Machine, TrialCounters, TrialState, Trigger};
use centerout_core::mocks::fast_table;
use centerout_core::sequencer::TargetSequencer;
use centerout_core::store::ParameterStore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rstest::rstest;
use std::time::Duration;

const CENTER: Point = Point::new(600.0, 400.0);
/// Far from the center and from every outer target.
const AWAY: Point = Point::new(650.0, 200.0);

fn store() -> ParameterStore {
    ParameterStore::from_table(&fast_table(), CENTER).unwrap()
}

fn machine(seq: Vec<usize>) -> Machine<StdRng> {
    Machine::new(
        TargetSequencer::new(seq, None).unwrap(),
        5.0,
        StdRng::seed_from_u64(7),
    )
}

fn primary(m: &Machine<StdRng>, s: &ParameterStore) -> Point {
    s.layout().get(m.direction().primary(), m.target()).unwrap()
}

fn secondary(m: &Machine<StdRng>, s: &ParameterStore) -> Point {
    s.layout().get(m.direction().secondary(), m.target()).unwrap()
}

fn time_out(m: &mut Machine<StdRng>, s: &ParameterStore) {
    let (state, generation) = (m.state(), m.generation());
    m.on_timeout(state, generation, s).expect("timeout applies");
}

/// Advance one step along Idle -> ... -> HoldTarget2 -> {Overshoot, Reward}.
fn step_towards(m: &mut Machine<StdRng>, s: &ParameterStore, goal: TrialState) {
    match m.state() {
        TrialState::Idle => {
            m.fire(Trigger::Start, s).unwrap();
        }
        TrialState::PreTarget1 => {
            m.on_sample(primary(m, s), s).unwrap();
        }
        TrialState::HoldTarget1Short | TrialState::HoldTarget1Long => time_out(m, s),
        TrialState::Go => {
            m.on_sample(AWAY, s).unwrap();
        }
        TrialState::Move => {
            m.on_sample(secondary(m, s), s).unwrap();
        }
        TrialState::HoldTarget2 if goal == TrialState::Overshoot => {
            m.on_sample(AWAY, s).unwrap();
        }
        TrialState::HoldTarget2 | TrialState::Reward => time_out(m, s),
        TrialState::Overshoot => {
            m.on_sample(secondary(m, s), s).unwrap();
        }
    }
}

fn drive_to(m: &mut Machine<StdRng>, s: &ParameterStore, goal: TrialState) {
    for _ in 0..16 {
        if m.state() == goal {
            return;
        }
        step_towards(m, s, goal);
    }
    panic!("could not reach {goal:?}, stuck in {:?}", m.state());
}

/// Run one successful trial starting from PreTarget1.
fn succeed_trial(m: &mut Machine<StdRng>, s: &ParameterStore) {
    drive_to(m, s, TrialState::Reward);
    time_out(m, s);
    assert_eq!(m.state(), TrialState::PreTarget1);
}

#[test]
fn full_trial_walks_every_state_in_order() {
    let s = store();
    let mut m = machine(vec![0, 1]);
    let mut visited = vec![m.state()];
    while m.state() != TrialState::Reward {
        step_towards(&mut m, &s, TrialState::Reward);
        visited.push(m.state());
    }
    assert_eq!(
        visited,
        vec![
            TrialState::Idle,
            TrialState::PreTarget1,
            TrialState::HoldTarget1Short,
            TrialState::HoldTarget1Long,
            TrialState::Go,
            TrialState::Move,
            TrialState::HoldTarget2,
            TrialState::Reward,
        ]
    );
    let t = m.on_timeout(m.state(), m.generation(), &s).unwrap();
    assert_eq!(t.trigger, Trigger::Advance);
    assert!(t.has(Effect::CountSuccess));
    let n = m.counters();
    assert_eq!((n.total, n.successful, n.unsuccessful), (1, 1, 0));
}

#[test]
fn reward_entry_carries_reward_signal() {
    let s = store();
    let mut m = machine(vec![0]);
    drive_to(&mut m, &s, TrialState::HoldTarget2);
    let t = m.on_timeout(m.state(), m.generation(), &s).unwrap();
    assert_eq!(t.to, TrialState::Reward);
    assert_eq!(t.effects, &[Effect::SignalReward]);
}

#[test]
fn pairing_alternates_and_sequence_advances_on_even_successes() {
    let s = store();
    let mut m = machine(vec![2, 5, 7]);
    drive_to(&mut m, &s, TrialState::PreTarget1);

    let mut pairing = Vec::new();
    let mut targets = Vec::new();
    for _ in 0..6 {
        succeed_trial(&mut m, &s);
        pairing.push(m.direction());
        targets.push(m.target());
    }
    use Direction::{Alternate, Default};
    assert_eq!(
        pairing,
        vec![Alternate, Default, Alternate, Default, Alternate, Default]
    );
    assert_eq!(targets, vec![2, 5, 5, 7, 7, 2]);
}

#[test]
fn wrap_is_reported_on_the_advancing_transition() {
    let s = store();
    let mut m = machine(vec![0]);
    drive_to(&mut m, &s, TrialState::Reward);
    let first = m.on_timeout(m.state(), m.generation(), &s).unwrap();
    assert!(!first.wrapped, "odd success does not advance");
    drive_to(&mut m, &s, TrialState::Reward);
    let second = m.on_timeout(m.state(), m.generation(), &s).unwrap();
    assert!(second.wrapped);
}

#[test]
fn alternate_pairing_starts_on_the_outer_target() {
    let s = store();
    let mut m = machine(vec![0]);
    drive_to(&mut m, &s, TrialState::PreTarget1);
    succeed_trial(&mut m, &s);
    assert_eq!(m.direction(), Direction::Alternate);

    // the center no longer starts a trial
    assert!(m.on_sample(CENTER, &s).is_none());
    let t = m.on_sample(Point::new(700.0, 400.0), &s).unwrap();
    assert_eq!(t.to, TrialState::HoldTarget1Short);
}

#[test]
fn overshoots_count_up_and_clear_on_failure() {
    let s = store();
    let mut m = machine(vec![0]);
    drive_to(&mut m, &s, TrialState::Overshoot);
    assert_eq!(m.counters().overshoots, 1);

    m.on_sample(secondary(&m, &s), &s).unwrap();
    assert_eq!(m.state(), TrialState::HoldTarget2);
    m.on_sample(AWAY, &s).unwrap();
    assert_eq!(m.counters().overshoots, 2);

    let t = m.on_timeout(m.state(), m.generation(), &s).unwrap();
    assert_eq!(t.trigger, Trigger::Fail);
    let n = m.counters();
    assert_eq!((n.overshoots, n.unsuccessful, n.total), (0, 1, 1));
}

#[test]
fn overshoots_clear_on_advance() {
    let s = store();
    let mut m = machine(vec![0]);
    drive_to(&mut m, &s, TrialState::Overshoot);
    m.on_sample(secondary(&m, &s), &s).unwrap();
    time_out(&mut m, &s); // succeed
    time_out(&mut m, &s); // advance
    assert_eq!(m.counters().overshoots, 0);
    assert_eq!(m.counters().successful, 1);
}

#[rstest]
#[case(TrialState::Idle)]
#[case(TrialState::PreTarget1)]
#[case(TrialState::HoldTarget1Short)]
#[case(TrialState::HoldTarget1Long)]
#[case(TrialState::Go)]
#[case(TrialState::Move)]
#[case(TrialState::HoldTarget2)]
#[case(TrialState::Overshoot)]
#[case(TrialState::Reward)]
fn reset_from_any_state_zeroes_counters(#[case] from: TrialState) {
    let s = store();
    let mut m = machine(vec![0, 1]);
    // build up some history first
    drive_to(&mut m, &s, TrialState::PreTarget1);
    succeed_trial(&mut m, &s);
    drive_to(&mut m, &s, TrialState::Go);
    m.fire(Trigger::Fail, &s).unwrap();
    assert_eq!(m.counters().total, 2);

    m.fire(Trigger::Stop, &s).unwrap();
    drive_to(&mut m, &s, from);
    let t = m.fire(Trigger::Reset, &s).unwrap();
    assert_eq!(t.to, TrialState::PreTarget1);
    assert_eq!(m.counters(), TrialCounters::default());
}

#[test]
fn pause_and_stop_return_to_idle_from_anywhere() {
    let s = store();
    let mut m = machine(vec![0]);
    drive_to(&mut m, &s, TrialState::Move);
    let t = m.fire(Trigger::Pause, &s).unwrap();
    assert_eq!(t.to, TrialState::Idle);
    assert_eq!(t.deadline, None);
    m.fire(Trigger::Resume, &s).unwrap();
    assert_eq!(m.state(), TrialState::PreTarget1);
    assert_eq!(m.fire(Trigger::Stop, &s).unwrap().to, TrialState::Idle);
}

#[test]
fn stale_timeout_is_discarded() {
    let s = store();
    let mut m = machine(vec![0]);
    drive_to(&mut m, &s, TrialState::HoldTarget1Short);
    let stale = (m.state(), m.generation());

    // geometric trigger wins the race
    m.on_sample(AWAY, &s).unwrap();
    assert_eq!(m.state(), TrialState::PreTarget1);
    assert!(m.on_timeout(stale.0, stale.1, &s).is_none());
    assert_eq!(m.state(), TrialState::PreTarget1);

    // same state again, but a newer entry
    m.on_sample(CENTER, &s).unwrap();
    assert_eq!(m.state(), TrialState::HoldTarget1Short);
    let generation = m.generation();
    assert!(m.on_timeout(stale.0, stale.1, &s).is_none());
    assert_eq!(m.generation(), generation);
    assert!(m.on_timeout(TrialState::HoldTarget1Short, generation, &s).is_some());
}

#[test]
fn invalid_triggers_are_ignored() {
    let s = store();
    let mut m = machine(vec![0]);
    drive_to(&mut m, &s, TrialState::PreTarget1);
    let generation = m.generation();
    for trigger in [Trigger::Start, Trigger::Cue, Trigger::Advance, Trigger::Succeed] {
        assert!(m.fire(trigger, &s).is_none(), "{trigger:?}");
    }
    assert_eq!(m.state(), TrialState::PreTarget1);
    assert_eq!(m.generation(), generation);
}

#[test]
fn idle_and_reward_ignore_samples() {
    let s = store();
    let mut m = machine(vec![0]);
    assert!(m.on_sample(CENTER, &s).is_none());
    drive_to(&mut m, &s, TrialState::Reward);
    assert!(m.on_sample(AWAY, &s).is_none());
    assert!(m.on_sample(CENTER, &s).is_none());
}

#[test]
fn leaving_the_first_hold_is_not_a_failure() {
    let s = store();
    let mut m = machine(vec![0]);
    drive_to(&mut m, &s, TrialState::HoldTarget1Short);
    let t = m.on_sample(AWAY, &s).unwrap();
    assert_eq!(t.trigger, Trigger::LeaveT1);
    assert_eq!(m.counters().total, 0);
}

#[test]
fn holds_are_resampled_within_range_on_every_entry() {
    let mut table = fast_table();
    table.insert("Min T1_HOLD_1 Time", ParamValue::Number(0.5));
    table.insert("Max T1_HOLD_1 Time", ParamValue::Number(1.0));
    let s = ParameterStore::from_table(&table, CENTER).unwrap();
    let mut m = machine(vec![0]);
    drive_to(&mut m, &s, TrialState::PreTarget1);

    let mut seen = std::collections::BTreeSet::new();
    for _ in 0..50 {
        let t = m.on_sample(CENTER, &s).unwrap();
        let d = t.deadline.unwrap();
        assert!(
            (Duration::from_millis(500)..=Duration::from_secs(1)).contains(&d),
            "{d:?}"
        );
        seen.insert(d.as_nanos());
        m.on_sample(AWAY, &s).unwrap();
    }
    assert!(seen.len() > 1, "deadline should be re-sampled");
}

#[test]
fn degenerate_hold_uses_minimum_exactly() {
    let mut table = fast_table();
    table.insert("Min T1_HOLD_1 Time", ParamValue::Number(0.5));
    table.insert("Max T1_HOLD_1 Time", ParamValue::Text("None".into()));
    let s = ParameterStore::from_table(&table, CENTER).unwrap();
    let mut m = machine(vec![0]);
    drive_to(&mut m, &s, TrialState::HoldTarget1Short);
    assert_eq!(m.deadline(), Some(Duration::from_millis(500)));
}

#[test]
fn fixed_deadlines_come_from_params() {
    let s = store();
    let mut m = machine(vec![0]);
    drive_to(&mut m, &s, TrialState::Go);
    assert_eq!(m.deadline(), Some(Duration::from_millis(200)));
    drive_to(&mut m, &s, TrialState::Move);
    assert_eq!(m.deadline(), Some(Duration::from_millis(500)));
    drive_to(&mut m, &s, TrialState::HoldTarget2);
    assert_eq!(m.deadline(), Some(Duration::from_millis(30)));
}
