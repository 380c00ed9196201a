use serde::{Deserialize, Serialize};

use crate::swipe::{InputSource, MouseInput, SwipeThresholds, TouchInput};

const MOBILE_MAX_WIDTH: f64 = 768.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCapabilities {
    pub max_touch_points: u32,
    pub has_touch_events: bool,
    pub viewport_width: f64,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_touch_points: 0,
            has_touch_events: false,
            viewport_width: 1024.0,
        }
    }
}

impl DeviceCapabilities {
    pub fn is_touch(&self) -> bool {
        self.has_touch_events || self.max_touch_points > 0
    }

    pub fn is_mobile(&self) -> bool {
        self.is_touch() && self.viewport_width <= MOBILE_MAX_WIDTH
    }
}

/// The one flow, presented for touch screens or for pointer devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presenter {
    Touch,
    Pointer,
}

impl Presenter {
    pub fn detect(caps: &DeviceCapabilities) -> Self {
        if caps.is_touch() {
            Presenter::Touch
        } else {
            Presenter::Pointer
        }
    }

    pub fn thresholds(&self) -> SwipeThresholds {
        match self {
            Presenter::Touch => SwipeThresholds::touch(),
            Presenter::Pointer => SwipeThresholds::pointer(),
        }
    }

    pub fn input_source(&self) -> Box<dyn InputSource> {
        match self {
            Presenter::Touch => Box::new(TouchInput),
            Presenter::Pointer => Box::new(MouseInput),
        }
    }

    pub fn swipe_hint(&self) -> &'static str {
        match self {
            Presenter::Touch => "Swipe right to like, left to pass",
            Presenter::Pointer => "Drag the card right to like, left to pass",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_capability_selects_touch_presenter() {
        let phone = DeviceCapabilities {
            max_touch_points: 5,
            has_touch_events: true,
            viewport_width: 390.0,
        };
        assert!(phone.is_mobile());
        let p = Presenter::detect(&phone);
        assert_eq!(p, Presenter::Touch);
        assert_eq!(p.thresholds().distance, 100.0);
        assert_eq!(p.input_source().kind(), "touch");
    }

    #[test]
    fn desktop_defaults_to_pointer() {
        let p = Presenter::detect(&DeviceCapabilities::default());
        assert_eq!(p, Presenter::Pointer);
        assert_eq!(p.thresholds().distance, 120.0);
        assert_eq!(p.input_source().kind(), "mouse");
    }

    #[test]
    fn touch_laptop_is_touch_but_not_mobile() {
        let caps = DeviceCapabilities {
            max_touch_points: 10,
            has_touch_events: false,
            viewport_width: 1440.0,
        };
        assert!(!caps.is_mobile());
        assert_eq!(Presenter::detect(&caps), Presenter::Touch);
    }
}
