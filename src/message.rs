//! Decoded data records.

use crate::profile::Profile;
use crate::subfield;
use crate::value::FieldValue;

/// The field number carrying a message's timestamp.
pub const TIMESTAMP_FIELD: u8 = 253;

/// A decoded data record: field number to value maps for wire, expanded, and
/// developer fields.
///
/// Wire fields keep their record order, so an unmodified message re-encodes
/// to its original layout. Expanded fields hold values unpacked from the bits
/// of a wire field's components; they are read through the same accessors but
/// are never written to the wire directly; the encoder packs them back into
/// their host field.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub global: u16,
    pub local: u8,
    /// The byte order the message was decoded from, and will re-encode with.
    pub big_endian: bool,
    fields: Vec<(u8, FieldValue)>,
    expanded: Vec<(u8, FieldValue)>,
    developer_fields: Vec<((u8, u8), FieldValue)>,
}

impl Message {
    /// Create an empty message for a global message number.
    pub fn new(global: u16) -> Self {
        Self::with_local(global, 0)
    }

    /// Create an empty message on a specific local message number.
    pub fn with_local(global: u16, local: u8) -> Self {
        Self {
            global,
            local,
            big_endian: false,
            fields: Vec::new(),
            expanded: Vec::new(),
            developer_fields: Vec::new(),
        }
    }

    /// The value of a field, checking wire fields then expanded ones.
    pub fn field(&self, number: u8) -> Option<&FieldValue> {
        self.wire_field(number).or_else(|| self.expanded_field(number))
    }

    /// The value of a wire field.
    pub fn wire_field(&self, number: u8) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| *n == number)
            .map(|(_, v)| v)
    }

    /// The value of a component-expanded field.
    pub fn expanded_field(&self, number: u8) -> Option<&FieldValue> {
        self.expanded
            .iter()
            .find(|(n, _)| *n == number)
            .map(|(_, v)| v)
    }

    /// A mutable handle to a wire field's value.
    pub fn field_mut(&mut self, number: u8) -> Option<&mut FieldValue> {
        self.fields
            .iter_mut()
            .find(|(n, _)| *n == number)
            .map(|(_, v)| v)
    }

    /// Set a wire field, replacing an existing value or appending a new one.
    pub fn set_field(&mut self, number: u8, value: FieldValue) {
        match self.fields.iter_mut().find(|(n, _)| *n == number) {
            Some((_, v)) => *v = value,
            None => self.fields.push((number, value)),
        }
    }

    /// Set a component-expanded field.
    pub fn set_expanded(&mut self, number: u8, value: FieldValue) {
        match self.expanded.iter_mut().find(|(n, _)| *n == number) {
            Some((_, v)) => *v = value,
            None => self.expanded.push((number, value)),
        }
    }

    /// The wire fields, in record order.
    pub fn fields(&self) -> impl Iterator<Item = (u8, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (*n, v))
    }

    /// The component-expanded fields.
    pub fn expanded(&self) -> impl Iterator<Item = (u8, &FieldValue)> {
        self.expanded.iter().map(|(n, v)| (*n, v))
    }

    /// The value of a developer field.
    pub fn developer_field(&self, index: u8, number: u8) -> Option<&FieldValue> {
        self.developer_fields
            .iter()
            .find(|(k, _)| *k == (index, number))
            .map(|(_, v)| v)
    }

    /// Set a developer field, replacing an existing value or appending a new
    /// one.
    pub fn set_developer_field(&mut self, index: u8, number: u8, value: FieldValue) {
        match self
            .developer_fields
            .iter_mut()
            .find(|(k, _)| *k == (index, number))
        {
            Some((_, v)) => *v = value,
            None => self.developer_fields.push(((index, number), value)),
        }
    }

    /// The developer fields, in record order.
    pub fn developer_fields(&self) -> impl Iterator<Item = ((u8, u8), &FieldValue)> {
        self.developer_fields.iter().map(|(k, v)| (*k, v))
    }

    /// The message's timestamp field, when present and valid.
    pub fn timestamp(&self) -> Option<u32> {
        self.field(TIMESTAMP_FIELD)?.as_u64()?.try_into().ok()
    }

    /// A field's value with the profile's scale and offset applied.
    ///
    /// When a subfield is active for the field, its scale and offset are used
    /// instead of the main field's. Fields absent from the profile pass
    /// through unscaled.
    pub fn scaled(&self, profile: &Profile, number: u8) -> Option<f64> {
        let raw = self.field(number)?.as_f64()?;

        let (scale, offset) = profile
            .message(self.global)
            .and_then(|mesg| {
                let field = mesg.field(number)?;

                Some(match subfield::active(self, mesg, number) {
                    Some(sub) => (sub.scale, sub.offset),
                    None => (field.scale, field.offset),
                })
            })
            .unwrap_or((1.0, 0.0));

        Some(raw / scale - offset)
    }
}
