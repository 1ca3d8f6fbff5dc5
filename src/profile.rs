//! Field metadata tables.
//!
//! The profile is a read-only lookup consulted while decoding: message
//! numbers to schemas, field numbers to names, scales, subfield tables, and
//! component tables. It is plain data, built once and never mutated by a
//! decode, so one profile can serve any number of concurrent sessions.
//!
//! The codec degrades cleanly when a message or field is missing here:
//! unrecognized fields pass through as raw values under their wire-level
//! definition, so the tables need not be exhaustive. [`Profile::base`]
//! carries the subset the codec itself depends on; applications extend it
//! with the generated tables for the messages they interpret.

use std::collections::HashMap;

use crate::base_type::BaseType;

/// Global message number of the file id message.
pub const FILE_ID: u16 = 0;
/// Global message number of the activity record message.
pub const RECORD: u16 = 20;
/// Global message number of the event message.
pub const EVENT: u16 = 21;
/// Global message number of the field description message.
pub const FIELD_DESCRIPTION: u16 = 206;
/// Global message number of the developer data id message.
pub const DEVELOPER_DATA_ID: u16 = 207;

/// An alternate meaning for a field, selected by a sibling field's value.
#[derive(Debug, Clone, PartialEq)]
pub struct Subfield {
    pub name: String,
    pub base_type: BaseType,
    pub scale: f64,
    pub offset: f64,
    pub units: String,
    /// The field number of the reference field in the same message.
    pub ref_field: u8,
    /// The reference field value selecting this subfield.
    pub ref_value: u64,
}

impl Subfield {
    pub fn new(
        name: impl Into<String>,
        base_type: BaseType,
        ref_field: u8,
        ref_value: u64,
    ) -> Self {
        Self {
            name: name.into(),
            base_type,
            scale: 1.0,
            offset: 0.0,
            units: String::new(),
            ref_field,
            ref_value,
        }
    }

    pub fn with_scale(mut self, scale: f64, offset: f64, units: impl Into<String>) -> Self {
        self.scale = scale;
        self.offset = offset;
        self.units = units.into();
        self
    }
}

/// A sub-value packed into the bits of another field's raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// The field number the expanded value is stored under.
    pub target: u8,
    pub bits: u8,
    pub scale: f64,
    pub offset: f64,
    /// Whether the slice is the low-order bits of a running counter.
    pub accumulate: bool,
}

impl Component {
    pub fn new(target: u8, bits: u8) -> Self {
        Self {
            target,
            bits,
            scale: 1.0,
            offset: 0.0,
            accumulate: false,
        }
    }

    pub fn with_scale(mut self, scale: f64, offset: f64) -> Self {
        self.scale = scale;
        self.offset = offset;
        self
    }

    pub fn accumulated(mut self) -> Self {
        self.accumulate = true;
        self
    }
}

/// Metadata for one field of a message.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldProfile {
    pub name: String,
    pub base_type: BaseType,
    pub scale: f64,
    pub offset: f64,
    pub units: String,
    pub subfields: Vec<Subfield>,
    pub components: Vec<Component>,
}

impl FieldProfile {
    pub fn new(name: impl Into<String>, base_type: BaseType) -> Self {
        Self {
            name: name.into(),
            base_type,
            scale: 1.0,
            offset: 0.0,
            units: String::new(),
            subfields: Vec::new(),
            components: Vec::new(),
        }
    }

    pub fn with_scale(mut self, scale: f64, offset: f64, units: impl Into<String>) -> Self {
        self.scale = scale;
        self.offset = offset;
        self.units = units.into();
        self
    }

    pub fn with_subfield(mut self, subfield: Subfield) -> Self {
        self.subfields.push(subfield);
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }
}

/// The schema of one message kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageProfile {
    pub name: String,
    fields: HashMap<u8, FieldProfile>,
}

impl MessageProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: HashMap::new(),
        }
    }

    pub fn with_field(mut self, number: u8, field: FieldProfile) -> Self {
        self.fields.insert(number, field);
        self
    }

    /// Metadata for a field, if the table carries it.
    pub fn field(&self, number: u8) -> Option<&FieldProfile> {
        self.fields.get(&number)
    }
}

/// The full metadata lookup: global message number to schema.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    messages: HashMap<u16, MessageProfile>,
}

impl Profile {
    /// An empty profile. Every message decodes as unrecognized pass-through.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in subset covering the messages the codec itself reads.
    pub fn base() -> Self {
        let mut profile = Self::new();

        profile.insert(
            FILE_ID,
            MessageProfile::new("file_id")
                .with_field(0, FieldProfile::new("type", BaseType::Enum))
                .with_field(1, FieldProfile::new("manufacturer", BaseType::UInt16))
                .with_field(2, FieldProfile::new("product", BaseType::UInt16))
                .with_field(3, FieldProfile::new("serial_number", BaseType::UInt32z))
                .with_field(4, FieldProfile::new("time_created", BaseType::UInt32)),
        );

        profile.insert(
            RECORD,
            MessageProfile::new("record")
                .with_field(253, FieldProfile::new("timestamp", BaseType::UInt32))
                .with_field(0, FieldProfile::new("position_lat", BaseType::SInt32))
                .with_field(1, FieldProfile::new("position_long", BaseType::SInt32))
                .with_field(
                    2,
                    FieldProfile::new("altitude", BaseType::UInt16).with_scale(5.0, 500.0, "m"),
                )
                .with_field(3, FieldProfile::new("heart_rate", BaseType::UInt8))
                .with_field(4, FieldProfile::new("cadence", BaseType::UInt8))
                .with_field(
                    5,
                    FieldProfile::new("distance", BaseType::UInt32).with_scale(100.0, 0.0, "m"),
                )
                .with_field(
                    6,
                    FieldProfile::new("speed", BaseType::UInt16).with_scale(1000.0, 0.0, "m/s"),
                )
                .with_field(
                    8,
                    FieldProfile::new("compressed_speed_distance", BaseType::Byte)
                        .with_component(Component::new(6, 12).with_scale(100.0, 0.0))
                        .with_component(Component::new(5, 12).with_scale(16.0, 0.0).accumulated()),
                ),
        );

        profile.insert(
            EVENT,
            MessageProfile::new("event")
                .with_field(253, FieldProfile::new("timestamp", BaseType::UInt32))
                .with_field(0, FieldProfile::new("event", BaseType::Enum))
                .with_field(1, FieldProfile::new("event_type", BaseType::Enum))
                .with_field(2, FieldProfile::new("data16", BaseType::UInt16))
                .with_field(3, FieldProfile::new("data", BaseType::UInt32)),
        );

        profile.insert(
            FIELD_DESCRIPTION,
            MessageProfile::new("field_description")
                .with_field(0, FieldProfile::new("developer_data_index", BaseType::UInt8))
                .with_field(
                    1,
                    FieldProfile::new("field_definition_number", BaseType::UInt8),
                )
                .with_field(2, FieldProfile::new("fit_base_type_id", BaseType::UInt8))
                .with_field(3, FieldProfile::new("field_name", BaseType::String))
                .with_field(8, FieldProfile::new("units", BaseType::String)),
        );

        profile.insert(
            DEVELOPER_DATA_ID,
            MessageProfile::new("developer_data_id")
                .with_field(1, FieldProfile::new("application_id", BaseType::Byte))
                .with_field(3, FieldProfile::new("developer_data_index", BaseType::UInt8))
                .with_field(4, FieldProfile::new("application_version", BaseType::UInt32)),
        );

        profile
    }

    /// Add or replace the schema for a message number.
    pub fn insert(&mut self, number: u16, message: MessageProfile) {
        self.messages.insert(number, message);
    }

    /// The schema for a message number, if the table carries it.
    pub fn message(&self, number: u16) -> Option<&MessageProfile> {
        self.messages.get(&number)
    }

    /// Metadata for a field of a message, if the table carries it.
    pub fn field(&self, message: u16, number: u8) -> Option<&FieldProfile> {
        self.messages.get(&message)?.field(number)
    }
}
