//! Cursor smoothing: raw sensor sample -> canvas position.

use crate::geometry::{Point, ema, linear_map};
use centerout_config::Params;

/// Smoothed cursor position, in canvas units.
///
/// x maps `[ADC Left, ADC Right] -> [0, width]`, y maps
/// `[ADC Bottom, ADC Top] -> [0, height]`, then each axis is passed through
/// one EMA step against the previous position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pos: Point,
    width: f64,
    height: f64,
}

impl Cursor {
    /// A cursor resting at the canvas center.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            pos: Point::new(width / 2.0, height / 2.0),
            width,
            height,
        }
    }

    #[inline]
    pub fn position(&self) -> Point {
        self.pos
    }

    /// Fold one raw sample into the smoothed position and return it.
    pub fn update(&mut self, raw_x: f64, raw_y: f64, params: &Params) -> Point {
        let adc = &params.adc;
        let mx = linear_map(raw_x, adc.left, adc.right, 0.0, self.width);
        let my = linear_map(raw_y, adc.bottom, adc.top, 0.0, self.height);
        let next = Point::new(
            ema(params.ema_alpha, mx, self.pos.x),
            ema(params.ema_alpha, my, self.pos.y),
        );
        if next.x.is_finite() && next.y.is_finite() {
            self.pos = next;
        } else {
            tracing::warn!(raw_x, raw_y, "dropping non-finite cursor sample");
        }
        self.pos
    }
}
