//! The `OpenRTI` wire vocabulary: handshake option maps, the envelope
//! header, the `TightBE1` message encoding, and the shared small-integer
//! constants used across a connection's lifetime.

pub mod constants;
pub mod envelope;
pub mod frame;
pub mod message;
pub mod option_map;

pub use constants::{Compression, Order, Transportation, ENCODING_TIGHT_BE1, PROTOCOL_VERSION};
pub use envelope::{decode_envelope, decode_header, decode_body, encode_envelope, HEADER_LEN, MAGIC};
pub use frame::{decode_message, encode_message};
pub use message::{
    EncodedLogicalTime, FederateHandle, InteractionClassHandle, Message, ObjectClassHandle,
    ObjectInstanceHandle,
};
pub use option_map::{decode_option_map, encode_option_map, OptionMap};
