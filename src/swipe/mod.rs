pub mod engine;
pub mod gesture;
pub mod input;

pub use engine::SwipeEngine;
pub use gesture::{
    classify, CardTransform, GestureLock, GestureOutcome, GestureTracker, GestureUpdate,
    SwipeDecision, SwipeGestureState, SwipeThresholds,
};
pub use input::{GestureInput, GestureSink, InputSource, MouseInput, TouchInput};

pub const SWIPE_START: &str = "swipe:start";
pub const SWIPE_MOVE: &str = "swipe:move";
pub const SWIPE_END: &str = "swipe:end";
