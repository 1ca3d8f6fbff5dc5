//! Definition records: the local schemas data records are decoded against.

use zerocopy::FromBytes;

use crate::base_type::BaseType;
use crate::decoder::{DecodeError, take};
use crate::header::DefinitionHeader;

/// One entry of a definition record's field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDefinition {
    pub number: u8,
    pub size: u8,
    pub base_type: BaseType,
}

/// One entry of a definition record's developer field table.
///
/// The base type is not carried here; it comes from the field description
/// message registered for the (index, number) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeveloperFieldDefinition {
    pub number: u8,
    pub size: u8,
    pub developer_data_index: u8,
}

#[repr(C, packed)]
#[derive(Debug, FromBytes)]
struct DefinitionBody {
    _reserved: u8,
    architecture: u8,
    global_message: [u8; 2],
    fields_remaining: u8,
}

/// A parsed definition record: the active schema for one local message
/// number.
///
/// A definition occupies its local number's slot until another definition
/// record replaces it. Data records sharing the local number decode their
/// fields in this definition's declared order and sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDefinition {
    pub local: u8,
    pub global: u16,
    pub big_endian: bool,
    pub fields: Vec<FieldDefinition>,
    pub developer_fields: Vec<DeveloperFieldDefinition>,
}

impl MessageDefinition {
    /// Decode a definition record body following its header byte.
    pub(crate) fn decode(
        r: &[u8],
        i: &mut usize,
        header: DefinitionHeader,
    ) -> Result<Self, DecodeError> {
        let DefinitionBody {
            architecture,
            global_message,
            fields_remaining,
            ..
        } = zerocopy::transmute!(take::<5>(r, i)?);

        let big_endian = architecture != 0;
        let global = if big_endian {
            u16::from_be_bytes(global_message)
        } else {
            u16::from_le_bytes(global_message)
        };

        let mut fields = Vec::with_capacity(fields_remaining as usize);
        for _ in 0..fields_remaining {
            let [number, size, tag] = take::<3>(r, i)?;

            // Tags outside the protocol's table are carried as byte arrays.
            let base_type = BaseType::from_tag(tag).unwrap_or(BaseType::Byte);

            fields.push(FieldDefinition {
                number,
                size,
                base_type,
            });
        }

        let mut developer_fields = Vec::new();
        if header.developer {
            let [fields_remaining] = take::<1>(r, i)?;

            for _ in 0..fields_remaining {
                let [number, size, developer_data_index] = take::<3>(r, i)?;

                developer_fields.push(DeveloperFieldDefinition {
                    number,
                    size,
                    developer_data_index,
                });
            }
        }

        Ok(Self {
            local: header.local,
            global,
            big_endian,
            fields,
            developer_fields,
        })
    }

    /// Encode this definition as a full record, header byte included.
    pub(crate) fn encode(&self, w: &mut Vec<u8>) {
        let header = DefinitionHeader {
            local: self.local,
            developer: !self.developer_fields.is_empty(),
        };

        w.push(header.encode());
        w.push(0);
        w.push(self.big_endian as u8);

        if self.big_endian {
            w.extend_from_slice(&self.global.to_be_bytes());
        } else {
            w.extend_from_slice(&self.global.to_le_bytes());
        }

        w.push(self.fields.len() as u8);
        for field in &self.fields {
            w.push(field.number);
            w.push(field.size);
            w.push(field.base_type.tag());
        }

        if !self.developer_fields.is_empty() {
            w.push(self.developer_fields.len() as u8);
            for field in &self.developer_fields {
                w.push(field.number);
                w.push(field.size);
                w.push(field.developer_data_index);
            }
        }
    }
}
