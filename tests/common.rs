//! Shared helpers for assembling documents byte by byte.

#![allow(dead_code)]

use chainring::check::compute_crc;

/// Assemble a document from hand-built records: extended header, records,
/// trailing check value.
pub struct DocumentBuilder {
    records: Vec<u8>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn record(mut self, bytes: &[u8]) -> Self {
        self.records.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.assemble(None, true)
    }

    /// Build with a lying data size, for truncation tests.
    pub fn build_with_data_size(self, data_size: u32) -> Vec<u8> {
        self.assemble(Some(data_size), true)
    }

    /// Build with a corrupted trailing check value.
    pub fn build_bad_crc(self) -> Vec<u8> {
        self.assemble(None, false)
    }

    fn assemble(self, data_size: Option<u32>, good_crc: bool) -> Vec<u8> {
        let data_size = data_size.unwrap_or(self.records.len() as u32);

        let mut head = Vec::new();
        head.push(14);
        head.push(0x20);
        head.extend_from_slice(&2132u16.to_le_bytes());
        head.extend_from_slice(&data_size.to_le_bytes());
        head.extend_from_slice(b".FIT");
        let header_crc = compute_crc(0, &head);
        head.extend_from_slice(&header_crc.to_le_bytes());

        let mut document = head;
        document.extend_from_slice(&self.records);

        let mut crc = compute_crc(0, &document);
        if !good_crc {
            crc ^= 0xFFFF;
        }
        document.extend_from_slice(&crc.to_le_bytes());

        document
    }
}

/// A little-endian definition record: header byte, body, field triples.
pub fn definition(local: u8, global: u16, fields: &[(u8, u8, u8)]) -> Vec<u8> {
    let mut w = vec![0x40 | local, 0, 0];
    w.extend_from_slice(&global.to_le_bytes());
    w.push(fields.len() as u8);

    for (number, size, tag) in fields {
        w.extend_from_slice(&[*number, *size, *tag]);
    }

    w
}

/// A definition record carrying developer field triples.
pub fn definition_developer(
    local: u8,
    global: u16,
    fields: &[(u8, u8, u8)],
    developer: &[(u8, u8, u8)],
) -> Vec<u8> {
    let mut w = definition(local, global, fields);
    w[0] |= 0x20;

    w.push(developer.len() as u8);
    for (number, size, index) in developer {
        w.extend_from_slice(&[*number, *size, *index]);
    }

    w
}

/// A data record on a local number.
pub fn data(local: u8, payload: &[u8]) -> Vec<u8> {
    let mut w = vec![local];
    w.extend_from_slice(payload);
    w
}

/// A compressed-timestamp data record.
pub fn compressed(local: u8, offset: u8, payload: &[u8]) -> Vec<u8> {
    let mut w = vec![0x80 | (local << 5) | (offset & 0x1F)];
    w.extend_from_slice(payload);
    w
}
