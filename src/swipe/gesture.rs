use serde::{Deserialize, Serialize};

use crate::ui::dom::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeThresholds {
    pub distance: f64,
    pub velocity_floor: f64,
    /// px/ms
    pub velocity: f64,
    pub dead_zone: f64,
    pub rotation_per_px: f64,
    pub scale_per_px: f64,
    pub min_scale: f64,
    pub glow_max_distance: f64,
    /// Added to the viewport width when flinging the card off-screen.
    pub exit_margin: f64,
    pub exit_rotation: f64,
}

impl SwipeThresholds {
    pub fn pointer() -> Self {
        Self {
            distance: 120.0,
            velocity_floor: 50.0,
            velocity: 0.5,
            dead_zone: 8.0,
            rotation_per_px: 0.1,
            scale_per_px: 0.0005,
            min_scale: 0.9,
            glow_max_distance: 150.0,
            exit_margin: 200.0,
            exit_rotation: 30.0,
        }
    }

    pub fn touch() -> Self {
        Self {
            distance: 100.0,
            ..Self::pointer()
        }
    }
}

impl Default for SwipeThresholds {
    fn default() -> Self {
        Self::pointer()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDecision {
    Liked,
    Disliked,
    Cancelled,
}

impl SwipeDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeDecision::Liked => "liked",
            SwipeDecision::Disliked => "disliked",
            SwipeDecision::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<SwipeDecision> {
        match s {
            "liked" => Some(SwipeDecision::Liked),
            "disliked" => Some(SwipeDecision::Disliked),
            "cancelled" => Some(SwipeDecision::Cancelled),
            _ => None,
        }
    }
}

/// Either trigger suffices: long travel, or a fast flick past the floor.
pub fn classify(dx: f64, velocity: f64, t: &SwipeThresholds) -> SwipeDecision {
    let distance = dx.abs();
    let swiped = distance > t.distance || (distance > t.velocity_floor && velocity > t.velocity);
    if !swiped {
        SwipeDecision::Cancelled
    } else if dx > 0.0 {
        SwipeDecision::Liked
    } else {
        SwipeDecision::Disliked
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureLock {
    Pending,
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeGestureState {
    pub origin: Point,
    pub offset: Point,
    pub started_at_ms: f64,
    pub dragging: bool,
    pub lock: GestureLock,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardTransform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub rotate_deg: f64,
    pub scale: f64,
}

impl CardTransform {
    pub fn neutral() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            rotate_deg: 0.0,
            scale: 1.0,
        }
    }

    pub fn to_css(&self) -> String {
        format!(
            "translate({:.1}px, {:.1}px) rotate({:.2}deg) scale({:.3})",
            self.translate_x, self.translate_y, self.rotate_deg, self.scale
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureUpdate {
    Pending,
    /// Vertical movement won; tracking stopped and the card should snap back.
    Aborted,
    Moved {
        offset: Point,
        transform: CardTransform,
        intensity: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureOutcome {
    pub decision: SwipeDecision,
    pub offset_x: f64,
    pub velocity: f64,
    /// Off-screen for a swipe, neutral for a cancel.
    pub transform: CardTransform,
}

#[derive(Debug, Clone)]
pub struct GestureTracker {
    thresholds: SwipeThresholds,
    viewport_width: f64,
    active: Option<SwipeGestureState>,
}

impl GestureTracker {
    pub fn new(thresholds: SwipeThresholds, viewport_width: f64) -> Self {
        Self {
            thresholds,
            viewport_width,
            active: None,
        }
    }

    pub fn thresholds(&self) -> &SwipeThresholds {
        &self.thresholds
    }

    pub fn state(&self) -> Option<&SwipeGestureState> {
        self.active.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some_and(|s| s.dragging)
    }

    pub fn start(&mut self, at: Point, now_ms: f64) {
        self.active = Some(SwipeGestureState {
            origin: at,
            offset: Point::new(0.0, 0.0),
            started_at_ms: now_ms,
            dragging: true,
            lock: GestureLock::Pending,
        });
    }

    pub fn update(&mut self, at: Point, _now_ms: f64) -> Option<GestureUpdate> {
        let t = self.thresholds;
        let state = self.active.as_mut()?;
        state.offset = Point::new(at.x - state.origin.x, at.y - state.origin.y);
        let (dx, dy) = (state.offset.x, state.offset.y);

        if state.lock == GestureLock::Pending {
            if dx.abs().max(dy.abs()) <= t.dead_zone {
                return Some(GestureUpdate::Pending);
            }
            if dy.abs() > dx.abs() {
                self.active = None;
                return Some(GestureUpdate::Aborted);
            }
            state.lock = GestureLock::Horizontal;
        }

        Some(GestureUpdate::Moved {
            offset: state.offset,
            transform: drag_transform(dx, dy, &t),
            intensity: (dx.abs() / t.glow_max_distance).min(1.0),
        })
    }

    /// Ends the gesture. `at` is the release point when the input reports one.
    pub fn finish(&mut self, at: Option<Point>, now_ms: f64) -> Option<GestureOutcome> {
        let state = self.active.take()?;
        let offset = at.map_or(state.offset, |p| {
            Point::new(p.x - state.origin.x, p.y - state.origin.y)
        });
        // The release point alone can settle a lock that no move decided.
        let vertical = match state.lock {
            GestureLock::Horizontal => false,
            GestureLock::Vertical => true,
            GestureLock::Pending => {
                offset.x.abs().max(offset.y.abs()) > self.thresholds.dead_zone
                    && offset.y.abs() > offset.x.abs()
            }
        };
        let dx = if vertical { 0.0 } else { offset.x };
        let elapsed = now_ms - state.started_at_ms;
        let velocity = if elapsed > 0.0 { dx.abs() / elapsed } else { 0.0 };
        let decision = classify(dx, velocity, &self.thresholds);
        Some(self.outcome(decision, dx, offset.y, velocity))
    }

    pub fn cancel(&mut self) -> Option<GestureOutcome> {
        let state = self.active.take()?;
        Some(self.outcome(SwipeDecision::Cancelled, state.offset.x, state.offset.y, 0.0))
    }

    fn outcome(&self, decision: SwipeDecision, dx: f64, dy: f64, velocity: f64) -> GestureOutcome {
        let t = &self.thresholds;
        let transform = match decision {
            SwipeDecision::Cancelled => CardTransform::neutral(),
            SwipeDecision::Liked | SwipeDecision::Disliked => {
                let sign = if decision == SwipeDecision::Liked { 1.0 } else { -1.0 };
                CardTransform {
                    translate_x: sign * (self.viewport_width + t.exit_margin),
                    translate_y: dy,
                    rotate_deg: sign * t.exit_rotation,
                    scale: drag_transform(dx, dy, t).scale,
                }
            }
        };
        GestureOutcome {
            decision,
            offset_x: dx,
            velocity,
            transform,
        }
    }
}

fn drag_transform(dx: f64, dy: f64, t: &SwipeThresholds) -> CardTransform {
    CardTransform {
        translate_x: dx,
        translate_y: dy,
        rotate_deg: dx * t.rotation_per_px,
        scale: (1.0 - dx.abs() * t.scale_per_px).max(t.min_scale),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_travel_is_a_swipe_at_any_speed() {
        let t = SwipeThresholds::pointer();
        assert_eq!(classify(150.0, 0.01, &t), SwipeDecision::Liked);
        assert_eq!(classify(-150.0, 0.0, &t), SwipeDecision::Disliked);
    }

    #[test]
    fn fast_flick_uses_direction_sign() {
        let t = SwipeThresholds::pointer();
        assert_eq!(classify(60.0, 0.8, &t), SwipeDecision::Liked);
        assert_eq!(classify(-60.0, 0.8, &t), SwipeDecision::Disliked);
    }

    #[test]
    fn short_slow_drag_cancels() {
        let t = SwipeThresholds::pointer();
        assert_eq!(classify(30.0, 0.1, &t), SwipeDecision::Cancelled);
        // past the floor but too slow
        assert_eq!(classify(80.0, 0.2, &t), SwipeDecision::Cancelled);
        // fast but under the floor
        assert_eq!(classify(40.0, 2.0, &t), SwipeDecision::Cancelled);
    }

    #[test]
    fn touch_threshold_is_shorter() {
        assert_eq!(classify(110.0, 0.0, &SwipeThresholds::touch()), SwipeDecision::Liked);
        assert_eq!(classify(110.0, 0.0, &SwipeThresholds::pointer()), SwipeDecision::Cancelled);
    }

    #[test]
    fn vertical_motion_aborts_the_gesture() {
        let mut g = GestureTracker::new(SwipeThresholds::touch(), 400.0);
        g.start(Point::new(100.0, 100.0), 0.0);
        assert_eq!(g.update(Point::new(103.0, 104.0), 10.0), Some(GestureUpdate::Pending));
        assert_eq!(g.update(Point::new(105.0, 140.0), 20.0), Some(GestureUpdate::Aborted));
        assert!(!g.is_dragging());
        assert_eq!(g.update(Point::new(300.0, 140.0), 30.0), None);
        assert_eq!(g.finish(None, 40.0), None);
    }

    #[test]
    fn horizontal_lock_sticks_once_decided() {
        let mut g = GestureTracker::new(SwipeThresholds::pointer(), 400.0);
        g.start(Point::new(0.0, 0.0), 0.0);
        assert!(matches!(
            g.update(Point::new(20.0, 2.0), 10.0),
            Some(GestureUpdate::Moved { .. })
        ));
        // vertical drift after the lock no longer aborts
        assert!(matches!(
            g.update(Point::new(30.0, 60.0), 20.0),
            Some(GestureUpdate::Moved { .. })
        ));
        assert_eq!(g.state().map(|s| s.lock), Some(GestureLock::Horizontal));
    }

    #[test]
    fn drag_transform_rotates_and_scales_with_floor() {
        let mut g = GestureTracker::new(SwipeThresholds::pointer(), 400.0);
        g.start(Point::new(0.0, 0.0), 0.0);
        match g.update(Point::new(100.0, 0.0), 50.0) {
            Some(GestureUpdate::Moved { transform, intensity, .. }) => {
                assert!((transform.rotate_deg - 10.0).abs() < 1e-9);
                assert!((transform.scale - 0.95).abs() < 1e-9);
                assert!((intensity - 100.0 / 150.0).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
        match g.update(Point::new(-400.0, 0.0), 60.0) {
            Some(GestureUpdate::Moved { transform, intensity, .. }) => {
                assert_eq!(transform.scale, 0.9);
                assert_eq!(intensity, 1.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn release_past_threshold_flies_off_screen() {
        let mut g = GestureTracker::new(SwipeThresholds::pointer(), 400.0);
        g.start(Point::new(0.0, 0.0), 0.0);
        g.update(Point::new(-20.0, 0.0), 100.0);
        let out = g.finish(Some(Point::new(-150.0, 5.0)), 1000.0).expect("outcome");
        assert_eq!(out.decision, SwipeDecision::Disliked);
        assert_eq!(out.transform.translate_x, -600.0);
        assert_eq!(out.transform.rotate_deg, -30.0);
        assert!((out.velocity - 0.15).abs() < 1e-9);
    }

    #[test]
    fn quick_flick_registers_on_release() {
        let mut g = GestureTracker::new(SwipeThresholds::pointer(), 400.0);
        g.start(Point::new(0.0, 0.0), 0.0);
        g.update(Point::new(30.0, 0.0), 40.0);
        let out = g.finish(Some(Point::new(60.0, 0.0)), 75.0).expect("outcome");
        assert_eq!(out.decision, SwipeDecision::Liked);
    }

    #[test]
    fn release_point_decides_when_no_move_left_the_dead_zone() {
        let mut g = GestureTracker::new(SwipeThresholds::pointer(), 400.0);
        g.start(Point::new(0.0, 0.0), 0.0);
        assert_eq!(g.update(Point::new(5.0, 0.0), 10.0), Some(GestureUpdate::Pending));
        let out = g.finish(Some(Point::new(150.0, 0.0)), 60.0).expect("outcome");
        assert_eq!(out.decision, SwipeDecision::Liked);
        assert_eq!(out.offset_x, 150.0);

        // a release that is mostly vertical still cancels
        g.start(Point::new(0.0, 0.0), 0.0);
        let out = g.finish(Some(Point::new(130.0, 200.0)), 60.0).expect("outcome");
        assert_eq!(out.decision, SwipeDecision::Cancelled);
        assert_eq!(out.transform, CardTransform::neutral());
    }

    #[test]
    fn tap_without_movement_cancels_to_neutral() {
        let mut g = GestureTracker::new(SwipeThresholds::pointer(), 400.0);
        g.start(Point::new(10.0, 10.0), 0.0);
        let out = g.finish(Some(Point::new(12.0, 10.0)), 5.0).expect("outcome");
        assert_eq!(out.decision, SwipeDecision::Cancelled);
        assert_eq!(out.transform, CardTransform::neutral());
    }

    #[test]
    fn transform_css() {
        assert_eq!(
            CardTransform::neutral().to_css(),
            "translate(0.0px, 0.0px) rotate(0.00deg) scale(1.000)"
        );
    }

    #[test]
    fn decision_wire_names() {
        assert_eq!(serde_json::to_value(SwipeDecision::Liked).unwrap(), "liked");
        assert_eq!(SwipeDecision::parse("cancelled"), Some(SwipeDecision::Cancelled));
        assert_eq!(SwipeDecision::parse("maybe"), None);
    }
}
