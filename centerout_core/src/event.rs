//! Wire records exchanged with the transport layer.
//!
//! Inbound events are tagged by `event`; outbound snapshots are tagged by
//! `type` and carry `"event": "none"` so clients written against the
//! websocket protocol can keep dispatching on either key.

use crate::machine::{Block, Direction, TrialState};
use centerout_config::Params;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Normalized inbound event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Event {
    Cursor { x: f64, y: f64 },
    Params { filename: String },
    Targets { filename: String },
    Start,
    Pause,
    Stop,
    Reset,
    Resume,
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Event {
    pub fn parse(line: &str) -> Result<Self, EventError> {
        Ok(serde_json::from_str(line)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CursorSnapshot {
    pub x: i64,
    pub y: i64,
    pub target: usize,
    pub state: &'static str,
    pub direction: &'static str,
    pub block: &'static str,
}

impl CursorSnapshot {
    /// Coordinates are truncated toward zero.
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(
        x: f64,
        y: f64,
        target: usize,
        state: TrialState,
        direction: Direction,
        block: Block,
    ) -> Self {
        Self {
            x: x.trunc() as i64,
            y: y.trunc() as i64,
            target,
            state: state.wire_name(),
            direction: direction.wire_name(),
            block: block.wire_name(),
        }
    }
}

/// Every configuration field a display client renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamsSnapshot {
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "BaselineTrials")]
    pub baseline_trials: u32,
    // Key spelling is part of the client protocol.
    #[serde(rename = "PeturbationTrials")]
    pub perturbation_trials: u32,
    #[serde(rename = "WashoutTrials")]
    pub washout_trials: u32,
    #[serde(rename = "VMR_Rotation")]
    pub vmr_rotation: f64,
    #[serde(rename = "Mode")]
    pub mode: String,
    #[serde(rename = "NTargets")]
    pub n_targets: usize,
    #[serde(rename = "TargetRingRadius")]
    pub target_ring_radius: f64,
    #[serde(rename = "TargetAngleOffset")]
    pub target_angle_offset: f64,
    #[serde(rename = "TargetSize")]
    pub target_size: f64,
    #[serde(rename = "CursorSize")]
    pub cursor_size: f64,
    #[serde(rename = "JitterAngularVar")]
    pub jitter_angular_var: f64,
    #[serde(rename = "Alpha")]
    pub alpha: f64,
    #[serde(rename = "ADCLeft")]
    pub adc_left: f64,
    #[serde(rename = "ADCRight")]
    pub adc_right: f64,
    #[serde(rename = "ADCTop")]
    pub adc_top: f64,
    #[serde(rename = "ADCBottom")]
    pub adc_bottom: f64,
}

impl From<&Params> for ParamsSnapshot {
    fn from(p: &Params) -> Self {
        Self {
            subject: p.subject.clone(),
            baseline_trials: p.trials.baseline,
            perturbation_trials: p.trials.perturbation,
            washout_trials: p.trials.washout,
            vmr_rotation: p.vmr_rotation_deg,
            mode: p.mode.clone(),
            n_targets: p.n_targets,
            target_ring_radius: p.ring_radius,
            target_angle_offset: p.angle_offset_deg,
            target_size: p.target_size,
            cursor_size: p.cursor_size,
            jitter_angular_var: p.jitter_angular_variance,
            alpha: p.ema_alpha,
            adc_left: p.adc.left,
            adc_right: p.adc.right,
            adc_top: p.adc.top,
            adc_bottom: p.adc.bottom,
        }
    }
}

/// Outbound snapshot body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Snapshot {
    Users { count: usize },
    Cursor(CursorSnapshot),
    Params(ParamsSnapshot),
}

#[derive(Serialize)]
struct Envelope<'a> {
    event: &'static str,
    #[serde(flatten)]
    body: &'a Snapshot,
}

impl Snapshot {
    /// Serialize once for fan-out.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&Envelope {
            event: "none",
            body: self,
        })
    }
}
