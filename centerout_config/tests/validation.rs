use centerout_config::{MAX_TARGETS, ParamError, ParamValue, Params, load_params, load_toml};
use rstest::rstest;

#[test]
fn rejects_zero_canvas_width() {
    let toml = r#"
[canvas]
width = 0
height = 800
"#;

    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject width=0");
    assert!(
        format!("{err}")
            .to_lowercase()
            .contains("canvas.width must be > 0")
    );
}

#[test]
fn rejects_non_positive_hold_spread() {
    let toml = r#"
[timing]
hold_spread = 0.0
"#;

    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject spread=0");
    assert!(format!("{err}").contains("hold_spread"));
}

#[test]
fn rejects_unknown_rotation() {
    let toml = r#"
[logging]
rotation = "weekly"
"#;

    let cfg = load_toml(toml).expect("parse TOML");
    assert!(cfg.validate().is_err());
}

#[test]
fn empty_config_uses_defaults() {
    let cfg = load_toml("").expect("parse TOML");
    cfg.validate().expect("defaults should pass");
    assert_eq!(cfg.canvas.width, 1200);
    assert_eq!(cfg.canvas.height, 800);
    assert_eq!(cfg.timing.hold_spread, 5.0);
    assert!(cfg.sources.params.is_none());
}

#[test]
fn shipped_config_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../config/centerout.toml");
    let text = std::fs::read_to_string(path).expect("read shipped config");
    let cfg = load_toml(&text).expect("parse TOML");
    cfg.validate().expect("shipped config should pass");
    assert_eq!(cfg.sources.targets.as_deref(), Some("config/targets.txt"));
}

#[rstest]
#[case(1e19)]
#[case(4097.0)]
#[case(f64::from(u32::MAX))]
fn rejects_target_counts_above_the_limit(#[case] n: f64) {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../config/params.tsv");
    let mut table = load_params(std::path::Path::new(path)).expect("load shipped params");
    table.insert("N Targets", ParamValue::Number(n));
    match Params::from_table(&table) {
        Err(ParamError::Invalid { key, reason }) => {
            assert_eq!(key, "N Targets");
            assert!(reason.contains("at most"), "{reason}");
        }
        other => panic!("expected N Targets to be rejected, got {other:?}"),
    }

    table.insert("N Targets", ParamValue::Number(MAX_TARGETS as f64));
    assert_eq!(Params::from_table(&table).expect("limit itself is accepted").n_targets, MAX_TARGETS);
}
