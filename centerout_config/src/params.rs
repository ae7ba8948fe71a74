//! Experiment parameter table and its validated record.
//!
//! Source format: one record per line, `key \t value \t type_tag`, where the
//! tag selects decoding: `None` keeps the raw string, `bool` compares against
//! `True`, anything else parses as a number.
use serde::Serialize;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParamError {
    #[error("record {line}: expected `key<TAB>value<TAB>type`, got {fields} field(s)")]
    Malformed { line: usize, fields: usize },
    #[error("record {line}: {key:?} value {value:?} is not a number")]
    NotNumeric {
        line: usize,
        key: String,
        value: String,
    },
    #[error("missing parameter {0:?}")]
    Missing(&'static str),
    #[error("parameter {0:?} must be numeric")]
    WrongType(&'static str),
    #[error("invalid parameter {key:?}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("read error: {0}")]
    Read(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Bool(bool),
    Number(f64),
}

impl ParamValue {
    fn decode(value: &str, tag: &str) -> Option<Self> {
        match tag {
            "None" => Some(Self::Text(value.to_string())),
            "bool" => Some(Self::Bool(value == "True")),
            _ => value.trim().parse::<f64>().ok().map(Self::Number),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }
}

/// Ordered typed key/value table. Later records override earlier ones with
/// the same key while keeping the original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamTable {
    entries: Vec<(String, ParamValue)>,
}

impl ParamTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn from_reader<R: Read>(mut rdr: csv::Reader<R>) -> Result<Self, ParamError> {
        let mut table = Self::new();
        for (idx, rec) in rdr.records().enumerate() {
            let line = idx + 1;
            let rec = rec.map_err(|e| ParamError::Read(e.to_string()))?;
            if rec.len() < 3 {
                return Err(ParamError::Malformed {
                    line,
                    fields: rec.len(),
                });
            }
            let (key, value, tag) = (&rec[0], &rec[1], &rec[2]);
            let decoded = ParamValue::decode(value, tag).ok_or_else(|| ParamError::NotNumeric {
                line,
                key: key.to_string(),
                value: value.to_string(),
            })?;
            table.insert(key, decoded);
        }
        Ok(table)
    }

    /// Parse tab-separated parameter text held in memory.
    pub fn parse(text: &str) -> Result<Self, ParamError> {
        let rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        Self::from_reader(rdr)
    }

    fn number(&self, key: &'static str) -> Result<f64, ParamError> {
        match self.get(key) {
            None => Err(ParamError::Missing(key)),
            Some(v) => v.as_number().ok_or(ParamError::WrongType(key)),
        }
    }

    fn number_or(&self, key: &'static str, default: f64) -> Result<f64, ParamError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.as_number().ok_or(ParamError::WrongType(key)),
        }
    }

    /// Absent or non-numeric (e.g. a `None`-tagged "None") means "no value".
    fn optional_number(&self, key: &'static str) -> Option<f64> {
        self.get(key).and_then(ParamValue::as_number)
    }

    fn text_or(&self, key: &'static str, default: &str) -> String {
        match self.get(key) {
            Some(ParamValue::Text(s)) => s.clone(),
            Some(ParamValue::Number(v)) => v.to_string(),
            Some(ParamValue::Bool(b)) => b.to_string(),
            None => default.to_string(),
        }
    }
}

/// Minimum hold and optional maximum, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HoldRange {
    pub min: f64,
    pub max: Option<f64>,
}

/// Raw sensor bounds mapped onto the canvas extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdcBounds {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrialBlocks {
    pub baseline: u32,
    pub perturbation: u32,
    pub washout: u32,
}

/// Validated, immutable experiment configuration.
///
/// Durations are in seconds. `angle_offset_deg` is converted to radians only
/// at layout time.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub subject: String,
    pub mode: String,
    pub n_targets: usize,
    pub ring_radius: f64,
    pub angle_offset_deg: f64,
    pub target_size: f64,
    pub cursor_size: f64,
    pub hold_t1_short: HoldRange,
    pub hold_t1_long: HoldRange,
    pub go_limit: f64,
    pub move_limit: f64,
    pub hold_t2_limit: f64,
    pub overshoot_limit: f64,
    pub reward_delay: f64,
    pub ema_alpha: f64,
    pub adc: AdcBounds,
    pub trials: TrialBlocks,
    pub vmr_rotation_deg: f64,
    pub jitter_angular_variance: f64,
}

const DEFAULT_OVERSHOOT_LIMIT_S: f64 = 0.25;

/// Largest accepted `N Targets`; the layout allocates two points per target.
pub const MAX_TARGETS: usize = 4096;

fn invalid(key: &'static str, reason: impl Into<String>) -> ParamError {
    ParamError::Invalid {
        key,
        reason: reason.into(),
    }
}

fn non_negative(key: &'static str, v: f64) -> Result<f64, ParamError> {
    if v.is_finite() && v >= 0.0 {
        Ok(v)
    } else {
        Err(invalid(key, format!("must be finite and >= 0, got {v}")))
    }
}

fn count(key: &'static str, v: f64) -> Result<u32, ParamError> {
    let v = non_negative(key, v)?;
    if v.fract() != 0.0 || v > f64::from(u32::MAX) {
        return Err(invalid(key, format!("must be a whole number, got {v}")));
    }
    Ok(v as u32)
}

fn hold(
    table: &ParamTable,
    min_key: &'static str,
    max_key: &'static str,
) -> Result<HoldRange, ParamError> {
    let min = non_negative(min_key, table.number(min_key)?)?;
    let max = match table.optional_number(max_key) {
        Some(v) => Some(non_negative(max_key, v)?),
        None => None,
    };
    Ok(HoldRange { min, max })
}

impl Params {
    /// Build the validated record from a table; nothing is returned unless
    /// every required key is present and in range.
    pub fn from_table(table: &ParamTable) -> Result<Self, ParamError> {
        let n = table.number("N Targets")?;
        if !(n.is_finite() && n >= 1.0 && n.fract() == 0.0) {
            return Err(invalid("N Targets", format!("must be a whole number >= 1, got {n}")));
        }
        if n > MAX_TARGETS as f64 {
            return Err(invalid("N Targets", format!("must be at most {MAX_TARGETS}, got {n}")));
        }

        let ema_alpha = table.number("EMA Alpha")?;
        if !(ema_alpha > 0.0 && ema_alpha <= 1.0) {
            return Err(invalid("EMA Alpha", format!("must be in (0.0, 1.0], got {ema_alpha}")));
        }

        let adc = AdcBounds {
            left: table.number("ADC Left")?,
            right: table.number("ADC Right")?,
            top: table.number("ADC Top")?,
            bottom: table.number("ADC Bottom")?,
        };
        if !(adc.left.is_finite() && adc.right.is_finite()) || adc.left == adc.right {
            return Err(invalid("ADC Left", "ADC Left and ADC Right must differ"));
        }
        if !(adc.top.is_finite() && adc.bottom.is_finite()) || adc.top == adc.bottom {
            return Err(invalid("ADC Top", "ADC Top and ADC Bottom must differ"));
        }

        let offset = table.number("Target Angle Offset")?;
        if !offset.is_finite() {
            return Err(invalid("Target Angle Offset", "must be finite"));
        }
        let rotation = table.number("VMR Rotation Angle")?;
        if !rotation.is_finite() {
            return Err(invalid("VMR Rotation Angle", "must be finite"));
        }

        Ok(Self {
            subject: table.text_or("Subject", "Unknown"),
            mode: table.text_or("Mode", "standard"),
            n_targets: n as usize,
            ring_radius: non_negative(
                "Outer Target Circle Radius",
                table.number("Outer Target Circle Radius")?,
            )?,
            angle_offset_deg: offset,
            target_size: non_negative("Target Size", table.number("Target Size")?)?,
            cursor_size: non_negative("Cursor Size", table.number("Cursor Size")?)?,
            hold_t1_short: hold(table, "Min T1_HOLD_1 Time", "Max T1_HOLD_1 Time")?,
            hold_t1_long: hold(table, "Min T1_HOLD_2 Time", "Max T1_HOLD_2 Time")?,
            go_limit: non_negative("Fixed GO Limit", table.number("Fixed GO Limit")?)?,
            move_limit: non_negative("Fixed MOVE Limit", table.number("Fixed MOVE Limit")?)?,
            hold_t2_limit: non_negative(
                "Fixed T2_HOLD_1 Limit",
                table.number("Fixed T2_HOLD_1 Limit")?,
            )?,
            overshoot_limit: non_negative(
                "Fixed OVERSHOOT Limit",
                table.number_or("Fixed OVERSHOOT Limit", DEFAULT_OVERSHOOT_LIMIT_S)?,
            )?,
            reward_delay: non_negative("Fixed REWARD Delay", table.number("Fixed REWARD Delay")?)?,
            ema_alpha,
            adc,
            trials: TrialBlocks {
                baseline: count("N Trials Baseline", table.number("N Trials Baseline")?)?,
                perturbation: count(
                    "N Trials Perturbation",
                    table.number("N Trials Perturbation")?,
                )?,
                washout: count("N Trials Washout", table.number("N Trials Washout")?)?,
            },
            vmr_rotation_deg: rotation,
            jitter_angular_variance: non_negative(
                "Jitter Angular Variance",
                table.number_or("Jitter Angular Variance", 0.0)?,
            )?,
        })
    }

    /// Containment tolerance: target radius plus cursor radius.
    #[inline]
    pub fn tolerance(&self) -> f64 {
        self.target_size + self.cursor_size
    }
}
