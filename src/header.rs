//! Document and record headers.

use either::Either::{self, Left, Right};
use tartan_bitfield::bitfield;
use thiserror::Error;
use zerocopy::{FromBytes, Immutable, IntoBytes};

use crate::check::compute_crc;

/// An error decoding a document header.
#[derive(Debug, Error)]
pub enum DocumentHeaderError {
    /// Incorrect filetype marker.
    #[error("Incorrect file type marker.")]
    NotFitData,
    /// Unknown header length.
    #[error("Unknown header length ({0}).")]
    UnknownHeaderLength(u8),
}

#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable)]
struct FileHeader {
    header_size: u8,
    protocol_version: u8,
    profile_version: u16,
    data_size: u32,
    data_type: [u8; 4],
}

/// A decoded document header.
///
/// The twelve-byte form carries no check value; the fourteen-byte extended
/// form appends one over the preceding bytes. The record section follows,
/// running for [`data_size`](Self::data_size) bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHeader {
    pub header_size: u8,
    pub protocol_version: u8,
    pub profile_version: u16,
    pub data_size: u32,
    /// The stored check value of an extended header.
    pub crc: Option<u16>,
}

impl DocumentHeader {
    /// Decode the fixed portion of a document header.
    ///
    /// Extended headers carry two further bytes, signalled by
    /// [`extended`](Self::extended); the caller reads them and stores the
    /// check value in [`crc`](Self::crc).
    pub fn decode(r: [u8; 12]) -> Result<Self, DocumentHeaderError> {
        let FileHeader {
            header_size,
            protocol_version,
            profile_version,
            data_size,
            data_type,
        } = zerocopy::transmute!(r);

        if &data_type != b".FIT" {
            Err(DocumentHeaderError::NotFitData)?;
        }

        if header_size != 12 && header_size != 14 {
            Err(DocumentHeaderError::UnknownHeaderLength(header_size))?;
        }

        Ok(Self {
            header_size,
            protocol_version,
            profile_version,
            data_size,
            crc: None,
        })
    }

    /// Whether this header's length includes a trailing check value.
    pub fn extended(&self) -> bool {
        self.header_size == 14
    }

    /// Verify an extended header's stored check value.
    ///
    /// A stored zero means the producer left the check unset, which passes.
    pub fn crc_ok(&self, r: [u8; 12]) -> bool {
        match self.crc {
            Some(found) => found == 0 || found == compute_crc(0, &r),
            None => true,
        }
    }

    /// Encode this header, computing the check value for the extended form.
    pub fn encode(&self) -> Vec<u8> {
        let header = FileHeader {
            header_size: self.header_size,
            protocol_version: self.protocol_version,
            profile_version: self.profile_version,
            data_size: self.data_size,
            data_type: *b".FIT",
        };

        let mut w = header.as_bytes().to_vec();

        if self.extended() {
            let crc = compute_crc(0, &w);
            w.extend_from_slice(&crc.to_le_bytes());
        }

        w
    }
}

/// The header byte of a definition record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefinitionHeader {
    pub local: u8,
    /// Whether developer field definitions follow the field table.
    pub developer: bool,
}

impl DefinitionHeader {
    /// Encode this header to its byte form.
    pub fn encode(self) -> u8 {
        let mut header = NormalHeader(0);
        header.set_local_message(self.local);
        header.set_is_definition(true);
        header.set_is_developer(self.developer);
        header.0
    }
}

/// The header byte of a data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHeader {
    pub local: u8,
    /// The compressed time offset, for the single-byte header form.
    pub time_offset: Option<u8>,
}

impl DataHeader {
    /// Encode this header to its byte form.
    pub fn encode(self) -> u8 {
        match self.time_offset {
            Some(offset) => {
                let mut header = CompressedHeader(0);
                header.set_is_compressed(true);
                header.set_local_message(self.local);
                header.set_time_offset(offset);
                header.0
            }
            None => {
                let mut header = NormalHeader(0);
                header.set_local_message(self.local);
                header.0
            }
        }
    }
}

bitfield! {
    struct NormalHeader(u8) {
        [0..4] local_message: u8,
        [5] is_developer,
        [6] is_definition,
        [7] is_compressed,
    }
}

bitfield! {
    struct CompressedHeader(u8) {
        [0..5] time_offset: u8,
        [5..7] local_message: u8,
        [7] is_compressed,
    }
}

/// Decode a record header byte into its definition or data form.
pub fn parse_record_header(r: u8) -> Either<DefinitionHeader, DataHeader> {
    let header = NormalHeader(r);

    if header.is_compressed() {
        let header = CompressedHeader(r);

        Right(DataHeader {
            local: header.local_message(),
            time_offset: Some(header.time_offset()),
        })
    } else if header.is_definition() {
        Left(DefinitionHeader {
            local: header.local_message(),
            developer: header.is_developer(),
        })
    } else {
        Right(DataHeader {
            local: header.local_message(),
            time_offset: None,
        })
    }
}
