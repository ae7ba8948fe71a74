//! Test doubles and fixtures: reward dispensers, an in-memory source loader
//! and a parameter table with short deadlines.

use crate::controller::SourceLoader;
use crate::error::CoreError;
use centerout_config::ParamTable;
use centerout_traits::RewardDispenser;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Dispenser that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDispenser;

impl RewardDispenser for NoopDispenser {
    fn dispense(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// Dispenser that counts calls; clones share the counter.
#[derive(Debug, Default, Clone)]
pub struct CountingDispenser {
    calls: Arc<AtomicUsize>,
}

impl CountingDispenser {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RewardDispenser for CountingDispenser {
    fn dispense(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Dispenser whose every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingDispenser;

impl RewardDispenser for FailingDispenser {
    fn dispense(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err("dispenser offline".into())
    }
}

/// Named sources held in memory. Clones share the same map, so a test can
/// rewrite a source while a controller is running.
#[derive(Debug, Default, Clone)]
pub struct MemorySources {
    texts: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, name: &str, text: &str) -> Self {
        self.set(name, text);
        self
    }

    pub fn set(&self, name: &str, text: &str) {
        if let Ok(mut map) = self.texts.lock() {
            map.insert(name.to_string(), text.to_string());
        }
    }

    pub fn remove(&self, name: &str) {
        if let Ok(mut map) = self.texts.lock() {
            map.remove(name);
        }
    }

    fn text(&self, name: &str) -> Result<String, CoreError> {
        let map = self
            .texts
            .lock()
            .map_err(|_| CoreError::Source("source map poisoned".into()))?;
        map.get(name)
            .cloned()
            .ok_or_else(|| CoreError::Source(format!("no such source {name:?}")))
    }
}

impl SourceLoader for MemorySources {
    fn load_params(&self, source: &str) -> Result<ParamTable, CoreError> {
        Ok(ParamTable::parse(&self.text(source)?)?)
    }

    fn load_targets(&self, source: &str) -> Result<Vec<usize>, CoreError> {
        centerout_config::parse_targets(&self.text(source)?)
            .map_err(|e| CoreError::Source(e.to_string()))
    }
}

/// A complete parameter table with millisecond-scale deadlines.
///
/// ADC bounds match a 1200x800 canvas and alpha is 1, so raw cursor samples
/// land on the canvas unchanged. Targets: 8 on a ring of radius 100, tolerance 15.
pub const FAST_PARAMS: &str = "\
Subject\tfixture\tNone
N Targets\t8\tfloat
Outer Target Circle Radius\t100\tfloat
Target Angle Offset\t0\tfloat
Target Size\t10\tfloat
Cursor Size\t5\tfloat
Min T1_HOLD_1 Time\t0.02\tfloat
Max T1_HOLD_1 Time\tNone\tNone
Min T1_HOLD_2 Time\t0.02\tfloat
Fixed GO Limit\t0.2\tfloat
Fixed MOVE Limit\t0.5\tfloat
Fixed T2_HOLD_1 Limit\t0.03\tfloat
Fixed OVERSHOOT Limit\t0.2\tfloat
Fixed REWARD Delay\t0.02\tfloat
EMA Alpha\t1\tfloat
ADC Left\t0\tfloat
ADC Right\t1200\tfloat
ADC Top\t800\tfloat
ADC Bottom\t0\tfloat
N Trials Baseline\t2\tfloat
N Trials Perturbation\t2\tfloat
N Trials Washout\t2\tfloat
VMR Rotation Angle\t0\tfloat
";

pub fn fast_table() -> ParamTable {
    ParamTable::parse(FAST_PARAMS).unwrap_or_default()
}
