//! The developer field registry.
//!
//! Developer fields carry schemas inside the stream itself: a developer data
//! id message announces a developer index, and field description messages
//! declare the name, units, and base type for each (index, number) pair.
//! The registry collects these as they are decoded, and must therefore see a
//! field's description before any data record using it; data arriving first
//! is kept as raw bytes.

use std::collections::{HashMap, HashSet};

use crate::base_type::BaseType;
use crate::message::Message;
use crate::profile::{DEVELOPER_DATA_ID, FIELD_DESCRIPTION};
use crate::value::FieldValue;

/// The declared schema of one developer field.
#[derive(Debug, Clone, PartialEq)]
pub struct DeveloperFieldDescription {
    pub developer_data_index: u8,
    pub field_definition_number: u8,
    pub base_type: BaseType,
    pub name: String,
    pub units: String,
}

/// Session-scoped lookup of developer field descriptions.
///
/// One registry per decode session; descriptions never carry across
/// documents.
#[derive(Debug, Default)]
pub struct DeveloperFieldRegistry {
    descriptions: HashMap<(u8, u8), DeveloperFieldDescription>,
    announced: HashSet<u8>,
}

impl DeveloperFieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect any developer schema carried by a decoded message.
    pub fn learn(&mut self, message: &Message) {
        match message.global {
            DEVELOPER_DATA_ID => self.learn_data_id(message),
            FIELD_DESCRIPTION => self.learn_description(message),
            _ => {}
        }
    }

    fn learn_data_id(&mut self, message: &Message) {
        if let Some(index) = field_u8(message, 3) {
            self.announced.insert(index);
        }
    }

    fn learn_description(&mut self, message: &Message) {
        let (Some(index), Some(number), Some(tag)) = (
            field_u8(message, 0),
            field_u8(message, 1),
            field_u8(message, 2),
        ) else {
            log::warn!("Discarding a field description missing its key fields.");
            return;
        };

        let base_type = BaseType::from_tag(tag).unwrap_or(BaseType::Byte);

        let name = message
            .field(3)
            .and_then(FieldValue::as_str)
            .unwrap_or_default()
            .to_owned();
        let units = message
            .field(8)
            .and_then(FieldValue::as_str)
            .unwrap_or_default()
            .to_owned();

        self.descriptions.insert(
            (index, number),
            DeveloperFieldDescription {
                developer_data_index: index,
                field_definition_number: number,
                base_type,
                name,
                units,
            },
        );
    }

    /// The description registered for a developer field, if one has arrived.
    pub fn description(&self, index: u8, number: u8) -> Option<&DeveloperFieldDescription> {
        self.descriptions.get(&(index, number))
    }

    /// Whether a developer data id message has announced this index.
    pub fn announced(&self, index: u8) -> bool {
        self.announced.contains(&index)
    }
}

fn field_u8(message: &Message, number: u8) -> Option<u8> {
    message.field(number)?.as_u64()?.try_into().ok()
}
