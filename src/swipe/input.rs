use std::sync::Arc;

use crate::events::Disposer;
use crate::ui::dom::{DomEvent, Element, EventDetail, Listener, Point};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureInput {
    Begin(Point),
    Move(Point),
    End(Option<Point>),
    Cancel,
}

/// Receives gesture inputs with the event timestamp. Returns `true` when the
/// input was consumed as part of a horizontal swipe.
pub type GestureSink = Arc<dyn Fn(GestureInput, f64) -> bool + Send + Sync>;

pub trait InputSource: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Wires listeners on `card` (and `document` where the source tracks
    /// movement outside the card). Disposing the result detaches them.
    fn attach(&self, card: &Element, document: &Element, sink: GestureSink) -> Vec<Disposer>;
}

fn listen(element: &Element, event: &str, listener: Listener) -> Disposer {
    let id = element.add_event_listener(event, listener);
    let el = element.clone();
    Disposer::new(move || {
        el.remove_event_listener(id);
    })
}

fn mouse_point(ev: &DomEvent) -> Option<Point> {
    match ev.detail {
        EventDetail::Mouse(p) => Some(p),
        _ => None,
    }
}

/// Press on the card, then follow the pointer on the document so a fast
/// drag that leaves the card keeps tracking.
#[derive(Debug, Default, Clone, Copy)]
pub struct MouseInput;

impl InputSource for MouseInput {
    fn kind(&self) -> &'static str {
        "mouse"
    }

    fn attach(&self, card: &Element, document: &Element, sink: GestureSink) -> Vec<Disposer> {
        let down = sink.clone();
        let moved = sink.clone();
        let up = sink;
        vec![
            listen(
                card,
                "mousedown",
                Arc::new(move |ev: &DomEvent| -> anyhow::Result<()> {
                    if let Some(p) = mouse_point(ev) {
                        ev.prevent_default();
                        down(GestureInput::Begin(p), ev.timestamp_ms);
                    }
                    Ok(())
                }),
            ),
            listen(
                document,
                "mousemove",
                Arc::new(move |ev: &DomEvent| -> anyhow::Result<()> {
                    if let Some(p) = mouse_point(ev) {
                        moved(GestureInput::Move(p), ev.timestamp_ms);
                    }
                    Ok(())
                }),
            ),
            listen(
                document,
                "mouseup",
                Arc::new(move |ev: &DomEvent| -> anyhow::Result<()> {
                    up(GestureInput::End(mouse_point(ev)), ev.timestamp_ms);
                    Ok(())
                }),
            ),
        ]
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TouchInput;

impl InputSource for TouchInput {
    fn kind(&self) -> &'static str {
        "touch"
    }

    fn attach(&self, card: &Element, _document: &Element, sink: GestureSink) -> Vec<Disposer> {
        let start = sink.clone();
        let moved = sink.clone();
        let end = sink.clone();
        let cancel = sink;
        vec![
            listen(
                card,
                "touchstart",
                Arc::new(move |ev: &DomEvent| -> anyhow::Result<()> {
                    // multi-finger gestures are left to the browser
                    if let EventDetail::Touch { touches, .. } = &ev.detail {
                        if let [p] = touches.as_slice() {
                            start(GestureInput::Begin(*p), ev.timestamp_ms);
                        }
                    }
                    Ok(())
                }),
            ),
            listen(
                card,
                "touchmove",
                Arc::new(move |ev: &DomEvent| -> anyhow::Result<()> {
                    if let EventDetail::Touch { touches, .. } = &ev.detail {
                        if let Some(p) = touches.first() {
                            if moved(GestureInput::Move(*p), ev.timestamp_ms) {
                                ev.prevent_default();
                            }
                        }
                    }
                    Ok(())
                }),
            ),
            listen(
                card,
                "touchend",
                Arc::new(move |ev: &DomEvent| -> anyhow::Result<()> {
                    let at = match &ev.detail {
                        EventDetail::Touch { changed, .. } => changed.first().copied(),
                        _ => None,
                    };
                    end(GestureInput::End(at), ev.timestamp_ms);
                    Ok(())
                }),
            ),
            listen(
                card,
                "touchcancel",
                Arc::new(move |ev: &DomEvent| -> anyhow::Result<()> {
                    cancel(GestureInput::Cancel, ev.timestamp_ms);
                    Ok(())
                }),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::lock;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<GestureInput>>>, GestureSink) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in = seen.clone();
        let sink: GestureSink = Arc::new(move |input: GestureInput, _: f64| -> bool {
            lock(&seen_in).push(input);
            matches!(input, GestureInput::Move(_))
        });
        (seen, sink)
    }

    #[test]
    fn mouse_tracks_moves_on_the_document() {
        let (card, doc) = (Element::new("card"), Element::new("document"));
        let (seen, sink) = recorder();
        let disposers = MouseInput.attach(&card, &doc, sink);

        card.dispatch(&DomEvent::mouse("mousedown", 1.0, 2.0, 0.0));
        doc.dispatch(&DomEvent::mouse("mousemove", 5.0, 2.0, 10.0));
        card.dispatch(&DomEvent::mouse("mousemove", 9.0, 2.0, 20.0));
        doc.dispatch(&DomEvent::mouse("mouseup", 7.0, 2.0, 30.0));

        assert_eq!(
            *lock(&seen),
            vec![
                GestureInput::Begin(Point::new(1.0, 2.0)),
                GestureInput::Move(Point::new(5.0, 2.0)),
                GestureInput::End(Some(Point::new(7.0, 2.0))),
            ]
        );

        for d in &disposers {
            d.dispose();
        }
        assert_eq!(card.listener_count(None) + doc.listener_count(None), 0);
    }

    #[test]
    fn touch_move_prevents_scroll_only_when_consumed() {
        let (card, doc) = (Element::new("card"), Element::new("document"));
        let (seen, sink) = recorder();
        TouchInput.attach(&card, &doc, sink);
        assert_eq!(doc.listener_count(None), 0);

        card.dispatch(&DomEvent::touch("touchstart", 0.0, 0.0, 0.0));
        let mv = DomEvent::touch("touchmove", 20.0, 0.0, 5.0);
        card.dispatch(&mv);
        assert!(mv.default_prevented());
        card.dispatch(&DomEvent::touch("touchend", 40.0, 0.0, 9.0));
        card.dispatch(&DomEvent::touch("touchcancel", 0.0, 0.0, 10.0));

        let seen = lock(&seen);
        assert_eq!(seen[2], GestureInput::End(Some(Point::new(40.0, 0.0))));
        assert_eq!(seen[3], GestureInput::Cancel);
    }

    #[test]
    fn multi_touch_start_is_ignored() {
        let card = Element::new("card");
        let (seen, sink) = recorder();
        TouchInput.attach(&card, &Element::new("document"), sink);
        let two = DomEvent::new(
            "touchstart",
            0.0,
            EventDetail::Touch {
                touches: vec![Point::new(0.0, 0.0), Point::new(50.0, 0.0)],
                changed: vec![Point::new(50.0, 0.0)],
            },
        );
        card.dispatch(&two);
        assert!(lock(&seen).is_empty());
    }
}
