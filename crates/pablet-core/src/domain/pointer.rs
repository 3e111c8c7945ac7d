//! Raw pointer and touch events as delivered by the input surface.
//!
//! A [`PointerEvent`] mirrors what a touchscreen or mouse reports: a kind
//! (down, move, up, click, touch start/move/end), a timestamp, an optional
//! pointer position, and the touch lists.  Fields are optional because real
//! event sources are sloppy: a touch-move may arrive with an empty `touches`
//! list, a click may arrive without coordinates.  The classifier treats such
//! events as no-ops instead of failing.
//!
//! # JSON representation
//!
//! ```json
//! {"kind":"mouse_down","timestamp_ms":0,"position":{"x":100.0,"y":100.0}}
//! {"kind":"touch_start","timestamp_ms":5,"touches":[{"x":1,"y":1},{"x":9,"y":9}]}
//! ```

use serde::{Deserialize, Serialize};

/// A coordinate on the input surface, in CSS-style pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Bit-for-bit equality on both axes.
    ///
    /// Unlike `==`, this never treats `0.0` and `-0.0` as the same point and
    /// never lets NaN compare unequal to itself.
    pub fn same_bits(&self, other: &Point) -> bool {
        self.x.to_bits() == other.x.to_bits() && self.y.to_bits() == other.y.to_bits()
    }
}

/// One position reading with the time it was taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub x: f64,
    pub y: f64,
    /// Milliseconds on the event source's clock.
    pub timestamp_ms: u64,
}

impl PointerSample {
    pub fn new(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self { x, y, timestamp_ms }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// What happened on the input surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerEventKind {
    MouseDown,
    MouseMove,
    MouseUp,
    TouchStart,
    TouchMove,
    TouchEnd,
    /// The platform's synthesized click (fires after down + up).
    Click,
}

impl PointerEventKind {
    /// `true` for the kinds that report positions through the touch lists.
    pub fn is_touch(self) -> bool {
        matches!(
            self,
            PointerEventKind::TouchStart | PointerEventKind::TouchMove | PointerEventKind::TouchEnd
        )
    }
}

/// A raw event from the input surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    /// Milliseconds on the event source's clock.
    #[serde(default)]
    pub timestamp_ms: u64,
    /// Pointer position for mouse events and clicks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    /// Contacts currently on the surface.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub touches: Vec<Point>,
    /// Contacts that changed in this event.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_touches: Vec<Point>,
}

impl PointerEvent {
    fn mouse(kind: PointerEventKind, x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self {
            kind,
            timestamp_ms,
            position: Some(Point::new(x, y)),
            touches: Vec::new(),
            changed_touches: Vec::new(),
        }
    }

    fn touch(kind: PointerEventKind, touches: Vec<Point>, timestamp_ms: u64) -> Self {
        Self {
            kind,
            timestamp_ms,
            position: None,
            touches,
            changed_touches: Vec::new(),
        }
    }

    pub fn mouse_down(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self::mouse(PointerEventKind::MouseDown, x, y, timestamp_ms)
    }

    pub fn mouse_move(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self::mouse(PointerEventKind::MouseMove, x, y, timestamp_ms)
    }

    pub fn mouse_up(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self::mouse(PointerEventKind::MouseUp, x, y, timestamp_ms)
    }

    pub fn click(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self::mouse(PointerEventKind::Click, x, y, timestamp_ms)
    }

    pub fn touch_start(touches: Vec<Point>, timestamp_ms: u64) -> Self {
        Self::touch(PointerEventKind::TouchStart, touches, timestamp_ms)
    }

    pub fn touch_move(touches: Vec<Point>, timestamp_ms: u64) -> Self {
        Self::touch(PointerEventKind::TouchMove, touches, timestamp_ms)
    }

    /// A touch end carries the lifted contacts in `changed_touches`.
    pub fn touch_end(changed_touches: Vec<Point>, timestamp_ms: u64) -> Self {
        Self {
            kind: PointerEventKind::TouchEnd,
            timestamp_ms,
            position: None,
            touches: Vec::new(),
            changed_touches,
        }
    }

    /// Resolves the single position this event stands for.
    ///
    /// Touch events use the first active contact, falling back to the first
    /// changed contact; everything else uses `position`.  Returns `None` when
    /// the event carries no usable coordinate.
    pub fn primary_point(&self) -> Option<Point> {
        if self.kind.is_touch() {
            self.touches
                .first()
                .or_else(|| self.changed_touches.first())
                .copied()
                .or(self.position)
        } else {
            self.position
        }
    }

    /// [`primary_point`](Self::primary_point) stamped with this event's time.
    pub fn primary_sample(&self) -> Option<PointerSample> {
        self.primary_point()
            .map(|p| PointerSample::new(p.x, p.y, self.timestamp_ms))
    }

    /// Number of contacts on the surface when this event fired.
    pub fn contact_count(&self) -> usize {
        self.touches.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
