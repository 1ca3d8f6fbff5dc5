//! The decode state machine.
//!
//! A decode session owns all per-stream state: the sixteen-slot table of
//! active definitions, the developer field registry, component accumulators,
//! and the last full timestamp. Records depend on state mutated by their
//! predecessors, so a session processes them strictly in stream order;
//! decoding several documents concurrently means one session each, never a
//! shared one.
//!
//! Decoding is best-effort: integrity failures are reported through
//! [`DecodeStatus`] while the messages decoded so far are still returned.
//! Only a rejected document header (or an unknown local number under the
//! [`Fail`](UnknownLocalPolicy::Fail) policy) surfaces as an error.

use std::io::Read;

use either::Either::{Left, Right};

use thiserror::Error;

use crate::base_type::BaseType;
use crate::check::compute_crc;
use crate::component::{self, Accumulator};
use crate::definition::MessageDefinition;
use crate::developer::DeveloperFieldRegistry;
use crate::header::{DocumentHeader, DocumentHeaderError, parse_record_header};
use crate::message::{Message, TIMESTAMP_FIELD};
use crate::profile::Profile;
use crate::subfield;
use crate::value::{Element, FieldValue};

/// An error decoding a document.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Incorrect document header.
    #[error("Incorrect document header: {0}")]
    Header(#[from] DocumentHeaderError),
    /// Unexpectedly reached the end of the record section.
    #[error("Unexpectedly reached the end of the record section.")]
    EndOfStream,
    /// A data record referenced a local number with no active definition.
    #[error("No definition is active for local message number {0}.")]
    UnknownLocalMessage(u8),
    /// An error from the supplied reader.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Policy for data records referencing an undefined local number.
///
/// Such a record's length is unknowable, so no byte-exact skip exists:
/// skipping ends the record loop and reports the interruption, keeping the
/// messages decoded so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownLocalPolicy {
    /// Stop decoding records, report through the status. The default.
    #[default]
    Skip,
    /// Abort the decode with [`DecodeError::UnknownLocalMessage`].
    Fail,
}

/// Options controlling a decode session.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    pub unknown_local: UnknownLocalPolicy,
    /// Retry documents whose header is rejected by scanning for the first
    /// plausible definition record.
    pub recover_headerless: bool,
}

/// The entry path that produced a decode result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Decoded from a valid document header.
    Standard,
    /// Recovered by scanning past a rejected or missing header.
    Headerless,
}

/// Why a record section ended before its declared end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The stream ended mid-record.
    Truncated,
    /// A data record referenced an undefined local number.
    UnknownLocalMessage(u8),
}

/// Integrity findings accompanying a decode result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeStatus {
    pub mode: DecodeMode,
    /// Whether the extended header's check value matched (or was absent).
    pub header_crc_ok: bool,
    /// Whether the trailing document check value matched.
    pub file_crc_ok: bool,
    /// Set when the record section could not be decoded to its declared end.
    pub interrupted: Option<Interrupt>,
}

/// The result of a decode: the messages recovered, and how trustworthy the
/// stream proved to be.
#[derive(Debug)]
pub struct Decode {
    pub messages: Vec<Message>,
    pub status: DecodeStatus,
}

/// Decode a document from a slice with default options.
pub fn decode_slice(r: &[u8], profile: &Profile) -> Result<Decode, DecodeError> {
    decode_slice_with(r, profile, &DecodeOptions::default())
}

/// Decode a document from a slice.
pub fn decode_slice_with(
    r: &[u8],
    profile: &Profile,
    options: &DecodeOptions,
) -> Result<Decode, DecodeError> {
    match decode_standard(r, profile, options) {
        Err(DecodeError::Header(err)) if options.recover_headerless => {
            log::warn!("Document header rejected ({err}); retrying without one.");
            decode_headerless(r, profile, options, err)
        }
        result => result,
    }
}

/// Decode a document from a reader.
pub fn decode_reader(
    r: &mut impl Read,
    profile: &Profile,
    options: &DecodeOptions,
) -> Result<Decode, DecodeError> {
    let mut buffer = Vec::new();
    r.read_to_end(&mut buffer)?;

    decode_slice_with(&buffer, profile, options)
}

fn decode_standard(
    r: &[u8],
    profile: &Profile,
    options: &DecodeOptions,
) -> Result<Decode, DecodeError> {
    let i = &mut 0;

    let head = take::<12>(r, i)?;
    let mut header = DocumentHeader::decode(head)?;

    if header.extended() {
        header.crc = Some(u16::from_le_bytes(take::<2>(r, i)?));
    }

    let header_crc_ok = header.crc_ok(head);
    if !header_crc_ok {
        log::warn!("Document header check value mismatch; continuing with suspect integrity.");
    }

    let declared_end = *i + header.data_size as usize;
    let end = declared_end.min(r.len());

    // The trailing check covers the header and record section together.
    let file_crc_ok = declared_end + 2 <= r.len() && {
        let found = u16::from_le_bytes([r[declared_end], r[declared_end + 1]]);
        let calculated = compute_crc(0, &r[..declared_end]);

        if found != calculated {
            log::warn!(
                "Document check value mismatch (found {found:#06x}, calculated {calculated:#06x})."
            );
        }

        found == calculated
    };

    let (messages, mut interrupted) = decode_records(r, i, end, profile, options)?;

    if declared_end > r.len() && interrupted.is_none() {
        interrupted = Some(Interrupt::Truncated);
    }

    Ok(Decode {
        messages,
        status: DecodeStatus {
            mode: DecodeMode::Standard,
            header_crc_ok,
            file_crc_ok,
            interrupted,
        },
    })
}

/// Alternate entry path for documents with a corrupt or missing header.
///
/// Scans for the first plausible definition record and decodes from there,
/// assuming a trailing check value. The status reports the mode so callers
/// can tell which path produced the result.
fn decode_headerless(
    r: &[u8],
    profile: &Profile,
    options: &DecodeOptions,
    err: DocumentHeaderError,
) -> Result<Decode, DecodeError> {
    let end = r.len().saturating_sub(2);

    for start in 0..end {
        if !plausible_definition(r, start, end) {
            continue;
        }

        let mut i = start;
        if let Ok((messages, interrupted)) = decode_records(r, &mut i, end, profile, options)
            && !messages.is_empty()
        {
            return Ok(Decode {
                messages,
                status: DecodeStatus {
                    mode: DecodeMode::Headerless,
                    header_crc_ok: false,
                    file_crc_ok: false,
                    interrupted,
                },
            });
        }
    }

    Err(DecodeError::Header(err))
}

/// Whether an offset could begin a definition record.
fn plausible_definition(r: &[u8], start: usize, end: usize) -> bool {
    // A definition header byte with a sensible architecture byte after the
    // reserved one.
    start + 3 < end && r[start] & 0b1101_0000 == 0b0100_0000 && r[start + 2] <= 1
}

fn decode_records(
    r: &[u8],
    i: &mut usize,
    end: usize,
    profile: &Profile,
    options: &DecodeOptions,
) -> Result<(Vec<Message>, Option<Interrupt>), DecodeError> {
    let mut session = Session::new(profile);
    let mut messages = Vec::new();

    // Reads are bounded at the declared end of the record section, so a
    // record straddling it surfaces as truncation rather than consuming the
    // trailing check bytes as field data.
    let r = &r[..end];

    while *i < end {
        match session.record(r, i) {
            Ok(Some(message)) => messages.push(message),
            Ok(None) => {}
            Err(DecodeError::EndOfStream) => {
                log::warn!("Record section ended mid-record; keeping {} messages.", messages.len());
                return Ok((messages, Some(Interrupt::Truncated)));
            }
            Err(DecodeError::UnknownLocalMessage(local)) => match options.unknown_local {
                UnknownLocalPolicy::Skip => {
                    log::warn!(
                        "No definition for local message number {local}; stopping after {} messages.",
                        messages.len()
                    );
                    return Ok((messages, Some(Interrupt::UnknownLocalMessage(local))));
                }
                UnknownLocalPolicy::Fail => Err(DecodeError::UnknownLocalMessage(local))?,
            },
            Err(err) => Err(err)?,
        }
    }

    Ok((messages, None))
}

/// Per-stream decode state.
struct Session<'p> {
    profile: &'p Profile,
    definitions: [Option<MessageDefinition>; 16],
    registry: DeveloperFieldRegistry,
    accumulator: Accumulator,
    last_timestamp: Option<u32>,
}

impl<'p> Session<'p> {
    fn new(profile: &'p Profile) -> Self {
        Self {
            profile,
            definitions: Default::default(),
            registry: DeveloperFieldRegistry::new(),
            accumulator: Accumulator::new(),
            last_timestamp: None,
        }
    }

    /// Decode one record, returning a message for data records.
    fn record(&mut self, r: &[u8], i: &mut usize) -> Result<Option<Message>, DecodeError> {
        let [byte] = take::<1>(r, i)?;

        match parse_record_header(byte) {
            Left(header) => {
                let definition = MessageDefinition::decode(r, i, header)?;

                // A definition silently supersedes any prior holder of its
                // local number.
                self.definitions[(header.local & 0xF) as usize] = Some(definition);

                Ok(None)
            }
            Right(header) => {
                let slot = (header.local & 0xF) as usize;
                let Some(definition) = self.definitions[slot].take() else {
                    Err(DecodeError::UnknownLocalMessage(header.local))?
                };

                let message = self.data(r, i, &definition, header.time_offset);
                self.definitions[slot] = Some(definition);

                message.map(Some)
            }
        }
    }

    fn data(
        &mut self,
        r: &[u8],
        i: &mut usize,
        definition: &MessageDefinition,
        time_offset: Option<u8>,
    ) -> Result<Message, DecodeError> {
        let mut message = Message::with_local(definition.global, definition.local);
        message.big_endian = definition.big_endian;

        for field in &definition.fields {
            let bytes = take_slice(r, i, field.size as usize)?;
            let value = FieldValue::decode(field.base_type, bytes, definition.big_endian);

            message.set_field(field.number, value);
        }

        for field in &definition.developer_fields {
            let bytes = take_slice(r, i, field.size as usize)?;

            let value = match self
                .registry
                .description(field.developer_data_index, field.number)
            {
                Some(description) => {
                    FieldValue::decode(description.base_type, bytes, definition.big_endian)
                }
                None => {
                    // The description has not arrived yet; keep the bytes
                    // untyped rather than guessing.
                    log::warn!(
                        "No description for developer field ({}, {}); keeping raw bytes.",
                        field.developer_data_index,
                        field.number
                    );

                    FieldValue::decode(BaseType::Byte, bytes, definition.big_endian)
                }
            };

            message.set_developer_field(field.developer_data_index, field.number, value);
        }

        if let Some(offset) = time_offset {
            self.synthesize_timestamp(&mut message, offset);
        }

        subfield::resolve(&mut message, self.profile);
        component::expand(&mut message, self.profile, &mut self.accumulator);

        self.registry.learn(&message);

        if let Some(timestamp) = message.timestamp() {
            self.last_timestamp = Some(timestamp);
        }

        Ok(message)
    }

    /// Apply a compressed header's time offset against the last full
    /// timestamp, rolling over modulo 32 seconds.
    fn synthesize_timestamp(&mut self, message: &mut Message, offset: u8) {
        let Some(last) = self.last_timestamp else {
            // No full timestamp has been seen yet; the offset alone cannot
            // anchor one, so the field stays absent.
            log::debug!("Dropping a time offset with no prior full timestamp.");
            return;
        };

        let offset = offset as u32;
        let mut timestamp = (last & !0x1F) | offset;
        if offset < last & 0x1F {
            timestamp += 0x20;
        }

        if message.wire_field(TIMESTAMP_FIELD).is_none() {
            message.set_field(
                TIMESTAMP_FIELD,
                FieldValue::single(BaseType::UInt32, Element::UInt(timestamp as u64)),
            );
        }
    }
}

/// Take an exact number of bytes from an offset in a slice, advancing the
/// offset.
pub(crate) fn take<const N: usize>(r: &[u8], i: &mut usize) -> Result<[u8; N], DecodeError> {
    let s = *i;
    *i += N;

    Ok(r.get(s..*i)
        .ok_or(DecodeError::EndOfStream)?
        .try_into()
        .unwrap())
}

/// Take a run of bytes from an offset in a slice, advancing the offset.
pub(crate) fn take_slice<'r>(
    r: &'r [u8],
    i: &mut usize,
    n: usize,
) -> Result<&'r [u8], DecodeError> {
    let s = *i;
    *i += n;

    r.get(s..*i).ok_or(DecodeError::EndOfStream)
}
