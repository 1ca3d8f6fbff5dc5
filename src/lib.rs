//! A round-tripping codec for Garmin's Flexible and Interoperable Data
//! Transfer protocol.
//!
//! Chainring decodes and encodes the protocol's self-describing record
//! streams: definition records declare a local schema, and data records are
//! decoded against the most recent declaration sharing their local number.
//! Messages are exposed generically, as field number to value maps, with the
//! [`profile`] tables supplying names, scales, subfield selection, and
//! component expansion for the messages an application cares about.
//!
//! Decoding is best-effort: check-value mismatches and truncation are
//! reported through [`DecodeStatus`] alongside whatever messages were
//! recovered, rather than discarding them. Re-encoding an unmodified decode
//! reproduces its messages field for field.
//!
//! ```
//! let decode = chainring::decode_slice(&data, &profile)?;
//!
//! for message in &decode.messages {
//!     if message.global == chainring::profile::RECORD {
//!         let speed = message.scaled(&profile, 6);
//!     }
//! }
//!
//! let data = chainring::encode(&decode.messages, &profile)?;
//! ```

pub mod base_type;
pub mod check;
pub mod component;
pub mod decoder;
pub mod definition;
pub mod developer;
pub mod encoder;
pub mod header;
pub mod message;
pub mod profile;
pub mod subfield;
pub mod value;

pub use base_type::BaseType;
pub use decoder::{
    Decode, DecodeError, DecodeMode, DecodeOptions, DecodeStatus, Interrupt, UnknownLocalPolicy,
    decode_reader, decode_slice, decode_slice_with,
};
pub use encoder::{EncodeError, Encoder, encode};
pub use message::Message;
pub use profile::Profile;
pub use value::{Element, FieldValue};
