//! The encode state machine.
//!
//! An encoder tracks the definition last written for each local message
//! number and emits a new definition record only when an outgoing message's
//! shape differs from it, so a run of same-shaped messages costs one
//! definition. Record bytes are buffered until [`finish`](Encoder::finish),
//! which writes the header (with its final data size), the records, and the
//! trailing check value in one pass.
//!
//! Errors are fatal for the message that raised them and leave the stream
//! unchanged: a value that cannot fit its declared field size is surfaced
//! rather than truncated.

use std::io::Write;

use thiserror::Error;

use crate::check::Crc;
use crate::component;
use crate::definition::{DeveloperFieldDefinition, FieldDefinition, MessageDefinition};
use crate::header::{DataHeader, DocumentHeader};
use crate::message::Message;
use crate::profile::Profile;
use crate::value::{FieldValue, ValueError};

/// The protocol version stamped on encoded documents.
pub const PROTOCOL_VERSION: u8 = 0x20;
/// The profile version stamped on encoded documents.
pub const PROFILE_VERSION: u16 = 2132;

/// An error encoding a message.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// A field's value could not be written at its declared size.
    #[error("Field {field} of message {global}: {source}")]
    Value {
        global: u16,
        field: u8,
        source: ValueError,
    },
    /// The message's local number is outside the definition table.
    #[error("Local message number {0} is outside the definition table.")]
    LocalMessageRange(u8),
    /// The message has more fields than a definition record can declare.
    #[error("Message {global} has too many fields to define ({count}).")]
    TooManyFields { global: u16, count: usize },
    /// A field's wire size exceeds one definition entry's maximum.
    #[error("Field {field} of message {global} is too large to define ({size} bytes).")]
    FieldTooLarge {
        global: u16,
        field: u8,
        size: usize,
    },
    /// An error from the supplied writer.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An encoder writing messages to a document.
pub struct Encoder<'p, W: Write> {
    writer: W,
    profile: &'p Profile,
    records: Vec<u8>,
    definitions: [Option<MessageDefinition>; 16],
}

impl<'p, W: Write> Encoder<'p, W> {
    /// Create an encoder over a writer.
    ///
    /// Nothing reaches the writer until [`finish`](Self::finish).
    pub fn new(writer: W, profile: &'p Profile) -> Self {
        Self {
            writer,
            profile,
            records: Vec::new(),
            definitions: Default::default(),
        }
    }

    /// Write one message, preceded by a definition record if its shape
    /// changed.
    pub fn write_message(&mut self, message: &Message) -> Result<(), EncodeError> {
        if message.local > 15 {
            Err(EncodeError::LocalMessageRange(message.local))?;
        }

        let definition = self.definition_for(message)?;

        // Expanded component values are carried by their host field, not
        // written on their own.
        let packed = component::pack(message, self.profile);

        let mut w = Vec::new();

        let slot = definition.local as usize;
        let redefine = self.definitions[slot].as_ref() != Some(&definition);
        if redefine {
            definition.encode(&mut w);
        }

        w.push(
            DataHeader {
                local: definition.local,
                time_offset: None,
            }
            .encode(),
        );

        // The definition's tables run parallel to the message's field order.
        for (field, (_, value)) in definition.fields.iter().zip(message.fields()) {
            let value = packed
                .iter()
                .find(|(n, _)| *n == field.number)
                .map(|(_, v)| v)
                .unwrap_or(value);

            encode_field(
                value,
                field.size as usize,
                definition.big_endian,
                message.global,
                field.number,
                &mut w,
            )?;
        }

        for (field, (_, value)) in definition
            .developer_fields
            .iter()
            .zip(message.developer_fields())
        {
            encode_field(
                value,
                field.size as usize,
                definition.big_endian,
                message.global,
                field.number,
                &mut w,
            )?;
        }

        // Commit only once the whole record encoded.
        self.records.extend_from_slice(&w);
        if redefine {
            self.definitions[slot] = Some(definition);
        }

        Ok(())
    }

    /// Finalize the document: header, records, and trailing check value.
    pub fn finish(mut self) -> Result<W, EncodeError> {
        let header = DocumentHeader {
            header_size: 14,
            protocol_version: PROTOCOL_VERSION,
            profile_version: PROFILE_VERSION,
            data_size: self.records.len() as u32,
            crc: None,
        };

        let head = header.encode();

        let mut crc = Crc::new();
        crc.update(&head);
        crc.update(&self.records);

        self.writer.write_all(&head)?;
        self.writer.write_all(&self.records)?;
        self.writer.write_all(&crc.value().to_le_bytes())?;
        self.writer.flush()?;

        Ok(self.writer)
    }

    /// Derive the definition an outgoing message requires.
    fn definition_for(&self, message: &Message) -> Result<MessageDefinition, EncodeError> {
        let mut fields = Vec::new();
        for (number, value) in message.fields() {
            fields.push(FieldDefinition {
                number,
                size: field_size(message, number, value)?,
                base_type: value.base_type(),
            });
        }

        let mut developer_fields = Vec::new();
        for ((index, number), value) in message.developer_fields() {
            developer_fields.push(DeveloperFieldDefinition {
                number,
                size: field_size(message, number, value)?,
                developer_data_index: index,
            });
        }

        if fields.len() > 255 || developer_fields.len() > 255 {
            Err(EncodeError::TooManyFields {
                global: message.global,
                count: fields.len().max(developer_fields.len()),
            })?;
        }

        Ok(MessageDefinition {
            local: message.local,
            global: message.global,
            big_endian: message.big_endian,
            fields,
            developer_fields,
        })
    }
}

/// Encode all messages into a fresh document.
pub fn encode(messages: &[Message], profile: &Profile) -> Result<Vec<u8>, EncodeError> {
    let mut encoder = Encoder::new(Vec::new(), profile);

    for message in messages {
        encoder.write_message(message)?;
    }

    encoder.finish()
}

fn field_size(message: &Message, number: u8, value: &FieldValue) -> Result<u8, EncodeError> {
    let size = value.wire_size();

    u8::try_from(size).map_err(|_| EncodeError::FieldTooLarge {
        global: message.global,
        field: number,
        size,
    })
}

fn encode_field(
    value: &FieldValue,
    size: usize,
    big_endian: bool,
    global: u16,
    field: u8,
    w: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    let bytes = value
        .encode(size, big_endian)
        .map_err(|source| EncodeError::Value {
            global,
            field,
            source,
        })?;

    w.extend_from_slice(&bytes);
    Ok(())
}
