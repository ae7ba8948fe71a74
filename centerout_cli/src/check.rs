//! `check`: load both sources exactly as `run` would, then report what the
//! controller would use.

use centerout_core::controller::SourceLoader;
use centerout_core::geometry::Point;
use centerout_core::layout::Role;
use centerout_core::util::duration_ms;
use centerout_core::{FsSources, ParameterStore};
use centerout_config::HoldRange;
use serde_json::json;

pub fn check(center: (f64, f64), params: &str, targets: &str, as_json: bool) -> eyre::Result<()> {
    let table = FsSources.load_params(params)?;
    let sequence = FsSources.load_targets(targets)?;
    let store = ParameterStore::from_table(&table, Point::new(center.0, center.1))?;
    store.check_sequence(&sequence)?;

    let p = store.params();
    let layout = store.layout();
    let d = store.deadlines();

    if as_json {
        let targets_json: Vec<_> = (0..layout.outer().len())
            .filter_map(|i| {
                let inner = layout.get(Role::Inner, i)?;
                let outer = layout.get(Role::Outer, i)?;
                Some(json!({ "index": i, "inner": [inner.x, inner.y], "outer": [outer.x, outer.y] }))
            })
            .collect();
        let out = json!({
            "subject": p.subject,
            "mode": p.mode,
            "n_targets": p.n_targets,
            "sequence_len": sequence.len(),
            "tolerance": store.tolerance(),
            "targets": targets_json,
            "deadlines_ms": {
                "go": duration_ms(d.go),
                "move": duration_ms(d.move_),
                "t2_hold_1": duration_ms(d.hold_t2),
                "overshoot": duration_ms(d.overshoot),
                "reward": duration_ms(d.reward),
            },
        });
        println!("{out}");
        return Ok(());
    }

    println!("subject: {}  mode: {}", p.subject, p.mode);
    println!(
        "targets: {} positions, sequence of {} from {targets}",
        p.n_targets,
        sequence.len()
    );
    println!("tolerance: {}", store.tolerance());
    for i in 0..layout.outer().len() {
        if let (Some(inner), Some(outer)) = (layout.get(Role::Inner, i), layout.get(Role::Outer, i)) {
            println!(
                "  [{i}] inner ({}, {})  outer ({}, {})",
                inner.x, inner.y, outer.x, outer.y
            );
        }
    }
    println!("t1_hold_1: {}", hold_text(d.hold_t1_short));
    println!("t1_hold_2: {}", hold_text(d.hold_t1_long));
    println!(
        "go: {} ms  move: {} ms  t2_hold_1: {} ms  overshoot: {} ms  reward: {} ms",
        duration_ms(d.go),
        duration_ms(d.move_),
        duration_ms(d.hold_t2),
        duration_ms(d.overshoot),
        duration_ms(d.reward)
    );
    Ok(())
}

fn hold_text(h: HoldRange) -> String {
    match h.max {
        Some(max) if max > h.min => format!("{:.3}..{:.3} s", h.min, max),
        _ => format!("{:.3} s", h.min),
    }
}
