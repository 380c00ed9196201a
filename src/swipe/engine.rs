use std::sync::{Arc, Mutex};

use serde_json::json;
use tracing::{debug, trace};

use super::gesture::{CardTransform, GestureOutcome, GestureTracker, GestureUpdate, SwipeThresholds};
use super::input::{GestureInput, GestureSink, InputSource};
use super::{SWIPE_END, SWIPE_MOVE, SWIPE_START};
use crate::device::{DeviceCapabilities, Presenter};
use crate::events::{lock, Disposer, EventBus};
use crate::ui::dom::Element;

const SNAP_TRANSITION: &str = "transform 0.3s ease-out";

/// Drives one card: feeds input into a [`GestureTracker`], applies the
/// transform to the card and reports progress on the bus. Listeners are
/// detached on [`SwipeEngine::destroy`] or drop.
pub struct SwipeEngine {
    card: Element,
    tracker: Arc<Mutex<GestureTracker>>,
    listeners: Vec<Disposer>,
    source: &'static str,
}

impl SwipeEngine {
    pub fn attach(
        card: Element,
        document: &Element,
        input: &dyn InputSource,
        thresholds: SwipeThresholds,
        viewport_width: f64,
        bus: EventBus,
    ) -> Self {
        let tracker = Arc::new(Mutex::new(GestureTracker::new(thresholds, viewport_width)));
        let sink = sink(card.clone(), tracker.clone(), bus);
        let listeners = input.attach(&card, document, sink);
        debug!(source = input.kind(), card = %card.id(), "swipe engine attached");
        Self {
            card,
            tracker,
            listeners,
            source: input.kind(),
        }
    }

    pub fn for_presenter(
        presenter: Presenter,
        caps: &DeviceCapabilities,
        card: Element,
        document: &Element,
        bus: EventBus,
    ) -> Self {
        Self::attach(
            card,
            document,
            presenter.input_source().as_ref(),
            presenter.thresholds(),
            caps.viewport_width,
            bus,
        )
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    pub fn is_attached(&self) -> bool {
        !self.listeners.is_empty()
    }

    pub fn is_dragging(&self) -> bool {
        lock(&self.tracker).is_dragging()
    }

    pub fn destroy(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        for d in self.listeners.drain(..) {
            d.dispose();
        }
        lock(&self.tracker).cancel();
        debug!(source = self.source, card = %self.card.id(), "swipe engine destroyed");
    }
}

impl Drop for SwipeEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn sink(card: Element, tracker: Arc<Mutex<GestureTracker>>, bus: EventBus) -> GestureSink {
    Arc::new(move |input: GestureInput, now_ms: f64| -> bool {
        // The tracker lock is released before anything is emitted so bus
        // handlers may query the engine.
        match input {
            GestureInput::Begin(p) => {
                lock(&tracker).start(p, now_ms);
                card.set_style("transition", "none");
                bus.emit(SWIPE_START, &json!({ "x": p.x, "y": p.y }));
                true
            }
            GestureInput::Move(p) => {
                let update = lock(&tracker).update(p, now_ms);
                match update {
                    None | Some(GestureUpdate::Pending) => false,
                    Some(GestureUpdate::Aborted) => {
                        trace!("vertical scroll, swipe aborted");
                        snap(&card, CardTransform::neutral());
                        false
                    }
                    Some(GestureUpdate::Moved {
                        offset,
                        transform,
                        intensity,
                    }) => {
                        card.set_style("transform", transform.to_css());
                        bus.emit(
                            SWIPE_MOVE,
                            &json!({
                                "offsetX": offset.x,
                                "offsetY": offset.y,
                                "intensity": intensity,
                            }),
                        );
                        true
                    }
                }
            }
            GestureInput::End(at) => {
                let outcome = lock(&tracker).finish(at, now_ms);
                outcome.map(|o| settle(&card, &bus, o)).is_some()
            }
            GestureInput::Cancel => {
                let outcome = lock(&tracker).cancel();
                outcome.map(|o| settle(&card, &bus, o)).is_some()
            }
        }
    })
}

fn snap(card: &Element, transform: CardTransform) {
    card.set_style("transition", SNAP_TRANSITION);
    card.set_style("transform", transform.to_css());
}

fn settle(card: &Element, bus: &EventBus, outcome: GestureOutcome) {
    snap(card, outcome.transform);
    debug!(decision = outcome.decision.as_str(), offset_x = outcome.offset_x, "swipe settled");
    bus.emit(
        SWIPE_END,
        &json!({
            "decision": outcome.decision,
            "offsetX": outcome.offset_x,
            "velocity": outcome.velocity,
        }),
    );
}
