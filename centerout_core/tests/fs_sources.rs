//! Loading and reloading from real files through `FsSources`.

use centerout_core::controller::{Controller, ControllerSettings, FsSources, SourceLoader};
use centerout_core::error::CoreError;
use centerout_core::mocks::{FAST_PARAMS, NoopDispenser};
use std::fs;
use tempfile::tempdir;

#[test]
fn file_sources_load_and_reload() {
    let dir = tempdir().unwrap();
    let params = dir.path().join("params.tsv");
    let targets = dir.path().join("targets.txt");
    fs::write(&params, FAST_PARAMS).unwrap();
    fs::write(&targets, "3\n1\n\n4\n").unwrap();

    let p = params.to_str().unwrap();
    let t = targets.to_str().unwrap();
    assert_eq!(FsSources.load_targets(t).unwrap(), vec![3, 1, 4]);

    let handle = Controller::load(ControllerSettings::default(), p, t, NoopDispenser, FsSources)
        .unwrap()
        .spawn();
    assert_eq!(handle.status().unwrap().target, 3);

    fs::write(&targets, "6\n2\n").unwrap();
    handle.reload_targets(t).unwrap();
    assert_eq!(handle.status().unwrap().target, 6);

    fs::write(&params, FAST_PARAMS.replace("EMA Alpha\t1", "EMA Alpha\t0.5")).unwrap();
    handle.reload_params(p).unwrap();
}

#[test]
fn unreadable_files_are_source_errors() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.tsv");
    let err = FsSources
        .load_params(missing.to_str().unwrap())
        .unwrap_err();
    assert!(matches!(err, CoreError::Source(ref m) if m.contains("nope.tsv")), "{err:?}");

    let bad = dir.path().join("targets.txt");
    fs::write(&bad, "1\n-2\n").unwrap();
    let err = FsSources.load_targets(bad.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, CoreError::Source(ref m) if m.contains("line 2")), "{err:?}");
}
