#![no_main]
use centerout_config::{MAX_TARGETS, ParamTable, Params};
use centerout_core::geometry::Point;
use centerout_core::store::ParameterStore;
use libfuzzer_sys::fuzz_target;

// Any accepted table must also build a store without panicking.
fuzz_target!(|data: &str| {
    let Ok(table) = ParamTable::parse(data) else {
        return;
    };
    let Ok(params) = Params::from_table(&table) else {
        return;
    };
    assert!((1..=MAX_TARGETS).contains(&params.n_targets));
    assert!(params.ema_alpha > 0.0 && params.ema_alpha <= 1.0);
    assert!(params.tolerance() >= 0.0);

    let store = ParameterStore::new(params, Point::new(600.0, 400.0));
    assert_eq!(store.layout().outer().len(), store.params().n_targets);
    let last = store.params().n_targets - 1;
    assert!(store.check_sequence(&[0, last]).is_ok());
    assert!(store.check_sequence(&[last + 1]).is_err());
});
