#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and source parsing for the center-out controller.
//!
//! - `Config` holds process-level settings deserialized from TOML and validated.
//! - `ParamTable` is the typed key/value experiment table read from a
//!   tab-separated parameter file; `Params::from_table` turns it into a
//!   validated immutable record.
//! - `load_targets` reads the target-index sequence file.
use serde::Deserialize;
use std::path::Path;

pub mod params;

pub use params::{
    AdcBounds, HoldRange, MAX_TARGETS, ParamError, ParamTable, ParamValue, Params, TrialBlocks,
};

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Canvas {
    /// Canvas width in display units; the x axis maps onto `[0, width]`.
    pub width: u32,
    /// Canvas height in display units; the y axis maps onto `[0, height]`.
    pub height: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
        }
    }
}

impl Canvas {
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Spread constant K for randomized holds: scale = (max - min) / K.
    /// The default of 5 keeps ~99.3% of the unclipped mass inside the window.
    pub hold_spread: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Self { hold_spread: 5.0 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Sources {
    /// Tab-separated parameter table loaded at startup.
    pub params: Option<String>,
    /// Target index sequence loaded at startup.
    pub targets: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub canvas: Canvas,
    pub timing: Timing,
    pub sources: Sources,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Canvas
        if self.canvas.width == 0 {
            eyre::bail!("canvas.width must be > 0");
        }
        if self.canvas.height == 0 {
            eyre::bail!("canvas.height must be > 0");
        }

        // Timing
        if !(self.timing.hold_spread.is_finite() && self.timing.hold_spread > 0.0) {
            eyre::bail!("timing.hold_spread must be a finite value > 0");
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !matches!(rotation, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rotation:?}");
        }

        Ok(())
    }
}

/// Parse a target sequence: one non-negative integer index per line.
/// Blank lines are skipped; anything else is an error naming the line.
pub fn parse_targets(text: &str) -> eyre::Result<Vec<usize>> {
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed.parse::<usize>() {
            Ok(v) => out.push(v),
            Err(e) => eyre::bail!("invalid target index on line {}: {trimmed:?} ({e})", idx + 1),
        }
    }
    if out.is_empty() {
        eyre::bail!("target sequence is empty");
    }
    Ok(out)
}

pub fn load_targets(path: &Path) -> eyre::Result<Vec<usize>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("open target file {:?}: {}", path, e))?;
    parse_targets(&text).map_err(|e| eyre::eyre!("target file {:?}: {}", path, e))
}

pub fn load_params(path: &Path) -> eyre::Result<ParamTable> {
    let rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open parameter file {:?}: {}", path, e))?;
    ParamTable::from_reader(rdr).map_err(|e| eyre::eyre!("parameter file {:?}: {}", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_targets_skips_blank_lines() {
        let seq = parse_targets("3\n\n 5 \n0\n").expect("parse");
        assert_eq!(seq, vec![3, 5, 0]);
    }

    #[test]
    fn parse_targets_names_bad_line() {
        let err = parse_targets("1\n-2\n").expect_err("negative index");
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn parse_targets_rejects_empty() {
        assert!(parse_targets("\n\n").is_err());
    }

    #[test]
    fn canvas_center_is_half_extent() {
        assert_eq!(Canvas::default().center(), (600.0, 400.0));
    }
}
