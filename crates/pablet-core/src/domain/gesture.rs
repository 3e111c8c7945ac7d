//! Gesture classification: raw pointer events in, semantic gestures out.
//!
//! [`GestureClassifier`] is a small state machine fed one [`PointerEvent`] at
//! a time in chronological order.  It never performs I/O; the caller decides
//! what to do with the gestures it returns.
//!
//! # Rules
//!
//! | Event                     | Effect                                                        |
//! |---------------------------|---------------------------------------------------------------|
//! | `mouse_down`/`touch_start`| press; the press sample becomes the motion baseline           |
//! | `mouse_move`/`touch_move` | only while pressed: `Move{dx, dy}` if either delta is non-zero |
//! | `mouse_up`/`touch_end`    | release; `DoubleClick` if a two-finger press was < 500 ms ago |
//! | `click`                   | `Click` once per press, if on the press point and nothing moved |
//!
//! Deltas are rounded to hundredths of a pixel before they leave the
//! classifier, which keeps float noise such as `98.1 - 100.0 = -1.9000000000000057`
//! from shifting the quantized value by one unit.

use tracing::trace;

use crate::domain::pointer::{Point, PointerEvent, PointerEventKind, PointerSample};

/// Release must follow a two-finger press by strictly less than this.
pub const DOUBLE_CLICK_WINDOW_MS: u64 = 500;

/// Number of simultaneous contacts that arms a double click.
pub const DOUBLE_CLICK_CONTACTS: usize = 2;

/// A semantically classified input action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// Relative motion since the previous accepted sample, in pixels.
    Move { dx: f64, dy: f64 },
    Click,
    DoubleClick,
}

/// Converts a chronological stream of pointer events into gestures.
#[derive(Debug, Clone, Default)]
pub struct GestureClassifier {
    pressed: bool,
    /// Position of the most recent press; kept after release until a click consumes it.
    press_origin: Option<PointerSample>,
    /// Baseline for the next `Move` delta.
    last_sample: Option<PointerSample>,
    /// Set when any sample since the press differed from the one before it.
    moved_since_press: bool,
    touch_contact_count: usize,
    two_touch_press_timestamp: Option<u64>,
}

impl GestureClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a press is currently held.
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// The sample recorded by the most recent press, if any.
    pub fn press_origin(&self) -> Option<PointerSample> {
        self.press_origin
    }

    /// The baseline the next `Move` delta is measured from.
    pub fn last_sample(&self) -> Option<PointerSample> {
        self.last_sample
    }

    /// Feeds one event and returns the gestures it produced (usually zero or one).
    ///
    /// Events without usable coordinates are ignored.
    pub fn handle(&mut self, event: &PointerEvent) -> Vec<GestureEvent> {
        match event.kind {
            PointerEventKind::MouseDown | PointerEventKind::TouchStart => {
                self.on_press(event);
                Vec::new()
            }
            PointerEventKind::MouseMove | PointerEventKind::TouchMove => {
                self.on_move(event).into_iter().collect()
            }
            PointerEventKind::MouseUp | PointerEventKind::TouchEnd => {
                self.on_release(event.timestamp_ms).into_iter().collect()
            }
            PointerEventKind::Click => self.on_click(event).into_iter().collect(),
        }
    }

    /// Forgets all press, baseline, and touch state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn on_press(&mut self, event: &PointerEvent) {
        let Some(sample) = event.primary_sample() else {
            trace!("ignoring {:?} without coordinates", event.kind);
            return;
        };

        self.pressed = true;
        self.press_origin = Some(sample);
        self.last_sample = Some(sample);
        self.moved_since_press = false;

        if event.contact_count() == DOUBLE_CLICK_CONTACTS {
            self.touch_contact_count = DOUBLE_CLICK_CONTACTS;
            self.two_touch_press_timestamp = Some(event.timestamp_ms);
        }
    }

    fn on_move(&mut self, event: &PointerEvent) -> Option<GestureEvent> {
        if !self.pressed {
            return None;
        }
        let sample = event.primary_sample()?;
        let previous = self.last_sample.replace(sample)?;

        if !sample.point().same_bits(&previous.point()) {
            self.moved_since_press = true;
        }

        let dx = round_to_hundredths(sample.x - previous.x);
        let dy = round_to_hundredths(sample.y - previous.y);

        if dx != 0.0 || dy != 0.0 {
            Some(GestureEvent::Move { dx, dy })
        } else {
            None
        }
    }

    fn on_release(&mut self, now_ms: u64) -> Option<GestureEvent> {
        self.pressed = false;

        let double_click = self.touch_contact_count == DOUBLE_CLICK_CONTACTS
            && self
                .two_touch_press_timestamp
                .is_some_and(|pressed_at| now_ms.saturating_sub(pressed_at) < DOUBLE_CLICK_WINDOW_MS);

        self.touch_contact_count = 0;

        if double_click {
            trace!("two-finger release within {DOUBLE_CLICK_WINDOW_MS} ms");
        }
        double_click.then_some(GestureEvent::DoubleClick)
    }

    /// A matching click consumes the press, so each press clicks at most once.
    fn on_click(&mut self, event: &PointerEvent) -> Option<GestureEvent> {
        let at: Point = event.primary_point()?;
        let origin = self.press_origin?;

        if self.moved_since_press || !at.same_bits(&origin.point()) {
            return None;
        }
        self.press_origin = None;
        Some(GestureEvent::Click)
    }
}

/// Rounds to two decimal places, halves toward positive infinity.
fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

// ── Tests ─────────────────────────────────────────────────────────────────────
