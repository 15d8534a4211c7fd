/*
Parameter Automation
====================

A time-stamped schedule for one scalar control (an amplitude). The control
side writes points into the future; the render side evaluates the value at
each sample's clock time.

Vocabulary
----------

  set    Jump to `value` at `time` and hold.
  ramp   Arrive at `value` at `time`, moving linearly from the previous
         point. The ramp starts wherever the previous point left the value.
  cancel Drop every point at or after a time. Points already in the past
         stay, so the value "falls back" to what the earlier points imply.


The Shape
---------

  set(0.0, t0)  ramp(1.0, t1)  ramp(0.7, t2)

    1.0 ┤        ╱╲
        │       ╱  ╲______________  (holds after the last point)
    0.7 ┤      ╱
        │     ╱
    0.0 ┼────╱────────────────────→ time
            t0  t1  t2

Because cancel falls back rather than holding, an envelope that wants to
interrupt a ramp smoothly must read the current value first, cancel, then
`set` that value at "now" before issuing the new ramp. That sequence is the
backend's `Automate::Hold` step, applied without rendering in between.
*/

#[derive(Debug, Clone, Copy, PartialEq)]
enum PointKind {
    Set,
    Ramp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    time: f64,
    value: f32,
    kind: PointKind,
}

#[derive(Debug, Clone)]
pub struct Automation {
    /// Value before the first point.
    initial: f32,
    /// Sorted by time; equal times keep insertion order.
    points: Vec<Point>,
}

impl Automation {
    pub fn new(initial: f32) -> Self {
        Self {
            initial,
            points: Vec::with_capacity(4),
        }
    }

    pub fn set_value_at(&mut self, value: f32, time: f64) {
        self.insert(Point {
            time,
            value,
            kind: PointKind::Set,
        });
    }

    pub fn linear_ramp_to(&mut self, value: f32, end_time: f64) {
        self.insert(Point {
            time: end_time,
            value,
            kind: PointKind::Ramp,
        });
    }

    /// Remove every point at or after `time`.
    pub fn cancel_from(&mut self, time: f64) {
        self.points.retain(|p| p.time < time);
    }

    /// Number of scheduled points (for tests and diagnostics).
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True once nothing after `time` would change the value.
    pub fn is_settled(&self, time: f64) -> bool {
        self.points.last().map_or(true, |p| p.time <= time)
    }

    pub fn value_at(&self, time: f64) -> f32 {
        // index of the first point strictly after `time`
        let next = self.points.partition_point(|p| p.time <= time);

        let (start_time, start_value) = match next.checked_sub(1) {
            Some(prev) => (self.points[prev].time, self.points[prev].value),
            None => (f64::NEG_INFINITY, self.initial),
        };

        match self.points.get(next) {
            Some(p) if p.kind == PointKind::Ramp => {
                // a ramp with no earlier point starts from the initial value at t = 0
                let anchor = if start_time.is_finite() { start_time } else { 0.0 };
                interpolate(anchor, start_value, p.time, p.value, time)
            }
            _ => start_value,
        }
    }

    /// Fold points that lie entirely before `time` into the initial value.
    ///
    /// Keeps the schedule short on long-running controls. The value at or
    /// after `time` is unchanged.
    pub fn prune_before(&mut self, time: f64) {
        let settled = self.points.partition_point(|p| p.time <= time);
        if settled < 2 {
            return;
        }
        // keep the last settled point: it anchors any ramp that follows
        let drop = settled - 1;
        // the point just before the anchor becomes the fallback, which is what
        // the full schedule reverts to if a later cancel removes the anchor
        self.initial = self.points[drop - 1].value;
        self.points.drain(..drop);
    }

    fn insert(&mut self, point: Point) {
        let idx = self.points.partition_point(|p| p.time <= point.time);
        self.points.insert(idx, point);
    }
}

#[inline]
fn interpolate(t0: f64, v0: f32, t1: f64, v1: f32, time: f64) -> f32 {
    if time <= t0 {
        return v0;
    }
    if time >= t1 || t1 <= t0 {
        return v1;
    }
    let progress = ((time - t0) / (t1 - t0)) as f32;
    v0 + (v1 - v0) * progress
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn holds_initial_value_without_points() {
        let auto = Automation::new(0.25);
        assert_eq!(auto.value_at(0.0), 0.25);
        assert_eq!(auto.value_at(100.0), 0.25);
        assert!(auto.is_settled(0.0));
    }

    #[test]
    fn attack_decay_shape() {
        let mut auto = Automation::new(0.0);
        auto.set_value_at(0.0, 1.0);
        auto.linear_ramp_to(1.0, 2.0);
        auto.linear_ramp_to(0.5, 3.0);

        assert!(close(auto.value_at(0.5), 0.0));
        assert!(close(auto.value_at(1.5), 0.5));
        assert!(close(auto.value_at(2.0), 1.0));
        assert!(close(auto.value_at(2.5), 0.75));
        assert!(close(auto.value_at(10.0), 0.5));
        assert!(!auto.is_settled(2.5));
        assert!(auto.is_settled(3.0));
    }

    #[test]
    fn cancel_falls_back_to_earlier_points() {
        let mut auto = Automation::new(0.0);
        auto.set_value_at(0.0, 0.0);
        auto.linear_ramp_to(1.0, 1.0);
        auto.cancel_from(0.5);

        // the ramp is gone, the value reverts to the set point
        assert!(close(auto.value_at(0.75), 0.0));
        assert_eq!(auto.len(), 1);
    }

    #[test]
    fn hold_then_ramp_starts_from_held_value() {
        let mut auto = Automation::new(0.0);
        auto.set_value_at(0.0, 0.0);
        auto.linear_ramp_to(1.0, 1.0);

        // interrupt at 0.5 the way the envelope scheduler does
        let held = auto.value_at(0.5);
        auto.cancel_from(0.5);
        auto.set_value_at(held, 0.5);
        auto.linear_ramp_to(0.0, 1.5);

        assert!(close(auto.value_at(0.5), 0.5));
        assert!(close(auto.value_at(1.0), 0.25));
        assert!(close(auto.value_at(2.0), 0.0));
    }

    #[test]
    fn zero_length_ramp_jumps() {
        let mut auto = Automation::new(0.0);
        auto.set_value_at(0.0, 1.0);
        auto.linear_ramp_to(1.0, 1.0);
        assert!(close(auto.value_at(1.0), 1.0));
        assert!(close(auto.value_at(0.999), 0.0));
    }

    #[test]
    fn prune_keeps_future_values() {
        let mut auto = Automation::new(0.0);
        auto.set_value_at(0.0, 0.0);
        auto.linear_ramp_to(1.0, 1.0);
        auto.linear_ramp_to(0.5, 2.0);
        auto.linear_ramp_to(0.0, 4.0);

        let before: Vec<f32> = [2.5, 3.0, 3.5, 5.0].iter().map(|t| auto.value_at(*t)).collect();
        auto.prune_before(2.5);
        let after: Vec<f32> = [2.5, 3.0, 3.5, 5.0].iter().map(|t| auto.value_at(*t)).collect();

        assert_eq!(before, after);
        assert_eq!(auto.len(), 2);
    }

    #[test]
    fn cancel_after_prune_falls_back_like_the_full_schedule() {
        let build = || {
            let mut auto = Automation::new(0.0);
            auto.set_value_at(0.2, 0.0);
            auto.set_value_at(0.7, 1.0);
            auto.set_value_at(0.9, 2.0);
            auto
        };
        let mut full = build();
        let mut pruned = build();
        pruned.prune_before(2.5);

        full.cancel_from(1.5);
        pruned.cancel_from(1.5);
        assert_eq!(pruned.value_at(3.0), full.value_at(3.0));
        assert!(close(pruned.value_at(3.0), 0.7));
    }
}
