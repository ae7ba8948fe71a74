//! Target layout: inner (center) and outer (ring) target coordinates.
//!
//! Outer targets are spaced by `pi / N`, so the ring covers a half circle
//! starting at the angular offset. Coordinates are rounded half-to-even to
//! whole canvas units.

use crate::geometry::Point;
use std::f64::consts::PI;

/// Which ring a target belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Inner,
    Outer,
}

impl Role {
    /// Wire name of the role when it is the secondary target.
    pub fn wire_name(self) -> &'static str {
        match self {
            Role::Inner => "in",
            Role::Outer => "out",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetSet {
    inner: Vec<Point>,
    outer: Vec<Point>,
}

impl TargetSet {
    /// Compute the layout for `n` targets on a ring of `radius` around `center`.
    /// `offset_rad` rotates the whole ring.
    pub fn generate(n: usize, radius: f64, offset_rad: f64, center: Point) -> Self {
        let inner = vec![center; n];
        let outer = (0..n)
            .map(|i| {
                let theta = (i as f64) * PI / (n as f64) + offset_rad;
                Point::new(
                    center.x + (radius * theta.cos()).round_ties_even(),
                    center.y + (radius * theta.sin()).round_ties_even(),
                )
            })
            .collect();
        Self { inner, outer }
    }

    pub fn get(&self, role: Role, index: usize) -> Option<Point> {
        match role {
            Role::Inner => self.inner.get(index).copied(),
            Role::Outer => self.outer.get(index).copied(),
        }
    }

    pub fn outer(&self) -> &[Point] {
        &self.outer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: Point = Point::new(600.0, 400.0);

    #[test]
    fn first_outer_target_lies_on_offset_axis() {
        let set = TargetSet::generate(8, 100.0, 0.0, CENTER);
        assert_eq!(set.get(Role::Outer, 0), Some(Point::new(700.0, 400.0)));
    }

    #[test]
    fn ring_spans_a_half_circle() {
        let set = TargetSet::generate(8, 100.0, 0.0, CENTER);
        // Step is pi/8: index 4 sits at pi/2, not at pi.
        assert_eq!(set.get(Role::Outer, 4), Some(Point::new(600.0, 500.0)));
        assert_eq!(set.get(Role::Outer, 2), Some(Point::new(671.0, 471.0)));
        // Every target is on the +y half; none reaches the opposite side of index 0.
        assert!(set.outer().iter().all(|p| p.y >= CENTER.y));
        assert!(set.outer().iter().all(|p| p.x > 500.0));
    }

    #[test]
    fn inner_targets_are_all_center() {
        let set = TargetSet::generate(5, 150.0, 0.3, CENTER);
        assert_eq!(set.outer().len(), 5);
        for i in 0..5 {
            assert_eq!(set.get(Role::Inner, i), Some(CENTER));
        }
        assert_eq!(set.get(Role::Inner, 5), None);
    }

    #[test]
    fn zero_radius_collapses_ring_onto_center() {
        let set = TargetSet::generate(4, 0.0, 1.0, CENTER);
        assert!(set.outer().iter().all(|p| *p == CENTER));
    }

    #[test]
    fn offset_rotates_ring() {
        let set = TargetSet::generate(8, 100.0, PI / 2.0, CENTER);
        assert_eq!(set.get(Role::Outer, 0), Some(Point::new(600.0, 500.0)));
    }
}
