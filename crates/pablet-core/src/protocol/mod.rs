//! Protocol module containing the wire frame encoder and decoder.

pub mod frame;

pub use frame::{decode_frame, encode_motion, quantize, FrameError, WireFrame};
