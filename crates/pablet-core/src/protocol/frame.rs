//! Binary wire frames sent from the pointer client to the remote host.
//!
//! Wire format (one WebSocket binary message per frame):
//! ```text
//! Click:        [0x01]
//! DoubleClick:  [0x02]
//! Motion:       [dx_lo][dx_hi][dy_lo][dy_hi]   (two i16, little-endian)
//! ```
//! There is no header, no length prefix, and no version byte.  Message
//! boundaries come from the WebSocket framing underneath.
//!
//! # Quantization
//!
//! Motion deltas are floating-point pixel offsets.  They are scaled by 100
//! and floored, so `3.40` becomes `340` and `-1.90` becomes `-190`.  Values
//! that do not fit in an `i16` wrap around in two's complement: `327.68`
//! becomes `-32768`.  The host relies on this exact arithmetic, so the wrap is
//! part of the format rather than an error.

use thiserror::Error;

use crate::domain::gesture::GestureEvent;

/// Byte value of a single click frame.
pub const CLICK_CODE: u8 = 1;

/// Byte value of a double-click frame.
pub const DOUBLE_CLICK_CODE: u8 = 2;

/// Length in bytes of a motion frame.
pub const MOTION_FRAME_LEN: usize = 4;

/// Fixed-point scale applied to motion deltas (two decimal places).
pub const QUANTIZATION_SCALE: f64 = 100.0;

/// Errors that can occur while decoding a frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The frame is neither one byte nor four bytes long.
    #[error("invalid frame length: {0} bytes (expected 1 or {MOTION_FRAME_LEN})")]
    InvalidLength(usize),

    /// A one-byte frame carried a code other than click or double-click.
    #[error("unknown click code: 0x{0:02X}")]
    UnknownCode(u8),
}

/// The exact byte sequence transmitted for one gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireFrame {
    /// Single click, encoded as `[0x01]`.
    Click,
    /// Double click, encoded as `[0x02]`.
    DoubleClick,
    /// Quantized relative motion.
    Motion {
        /// Horizontal delta in hundredths of a pixel.
        dx: i16,
        /// Vertical delta in hundredths of a pixel.
        dy: i16,
    },
}

impl WireFrame {
    /// Builds the frame for a classified gesture.
    ///
    /// `Move` deltas go through [`encode_motion`]; clicks map to their codes.
    pub fn from_gesture(gesture: &GestureEvent) -> Self {
        match *gesture {
            GestureEvent::Move { dx, dy } => encode_motion(dx, dy),
            GestureEvent::Click => WireFrame::Click,
            GestureEvent::DoubleClick => WireFrame::DoubleClick,
        }
    }

    /// Serializes the frame into the bytes that go on the wire.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pablet_core::protocol::frame::WireFrame;
    ///
    /// assert_eq!(WireFrame::Click.to_bytes(), vec![0x01]);
    /// assert_eq!(
    ///     WireFrame::Motion { dx: 340, dy: -190 }.to_bytes(),
    ///     vec![0x54, 0x01, 0x42, 0xFF]
    /// );
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            WireFrame::Click => vec![CLICK_CODE],
            WireFrame::DoubleClick => vec![DOUBLE_CLICK_CODE],
            WireFrame::Motion { dx, dy } => {
                let mut buf = Vec::with_capacity(MOTION_FRAME_LEN);
                buf.extend_from_slice(&dx.to_le_bytes());
                buf.extend_from_slice(&dy.to_le_bytes());
                buf
            }
        }
    }

    /// Number of bytes [`WireFrame::to_bytes`] produces.
    pub fn encoded_len(&self) -> usize {
        match self {
            WireFrame::Click | WireFrame::DoubleClick => 1,
            WireFrame::Motion { .. } => MOTION_FRAME_LEN,
        }
    }

    /// Short name for log messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            WireFrame::Click => "Click",
            WireFrame::DoubleClick => "DoubleClick",
            WireFrame::Motion { .. } => "Motion",
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Scales `value` by 100, floors it, and wraps it into an `i16`.
///
/// The wrap is a true modulo-2^16 reduction, so it stays exact for inputs far
/// outside the `i16` range.  NaN and infinities quantize to `0`.
///
/// # Examples
///
/// ```rust
/// use pablet_core::protocol::frame::quantize;
///
/// assert_eq!(quantize(3.4), 340);
/// assert_eq!(quantize(-0.005), -1);
/// assert_eq!(quantize(327.68), i16::MIN);
/// ```
pub fn quantize(value: f64) -> i16 {
    let scaled = (value * QUANTIZATION_SCALE).floor();
    if !scaled.is_finite() {
        return 0;
    }
    // `rem_euclid` leaves an integer in [0, 65536); the u16 -> i16 cast
    // reinterprets the upper half as negative.
    scaled.rem_euclid(65_536.0) as u16 as i16
}

/// Quantizes a motion delta into a [`WireFrame::Motion`].
///
/// Pure and total: every input produces a frame.
pub fn encode_motion(dx: f64, dy: f64) -> WireFrame {
    WireFrame::Motion {
        dx: quantize(dx),
        dy: quantize(dy),
    }
}

/// Decodes one complete frame.
///
/// The client never receives frames; this exists so tests and diagnostic
/// tools can check what went on the wire.
///
/// # Errors
///
/// Returns [`FrameError::InvalidLength`] for lengths other than 1 or 4, and
/// [`FrameError::UnknownCode`] for a one-byte frame that is not `1` or `2`.
pub fn decode_frame(bytes: &[u8]) -> Result<WireFrame, FrameError> {
    match *bytes {
        [CLICK_CODE] => Ok(WireFrame::Click),
        [DOUBLE_CLICK_CODE] => Ok(WireFrame::DoubleClick),
        [code] => Err(FrameError::UnknownCode(code)),
        [dx_lo, dx_hi, dy_lo, dy_hi] => Ok(WireFrame::Motion {
            dx: i16::from_le_bytes([dx_lo, dx_hi]),
            dy: i16::from_le_bytes([dy_lo, dy_hi]),
        }),
        _ => Err(FrameError::InvalidLength(bytes.len())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
