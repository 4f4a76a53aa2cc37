//! BeamNG control client
//!
//! Speaks the simulator's TCP control protocol: every message is a
//! MessagePack map carrying a `type` and a request id `_id`, framed by a
//! 4-byte big-endian length prefix.

mod client;
mod codec;
mod electrics;

pub use client::{BeamngClient, BeamngOptions, PROTOCOL_VERSION};
pub use codec::{decode_message, encode_message, write_frame, FrameReader, MAX_FRAME_LEN};
pub use electrics::sample_from_electrics;
