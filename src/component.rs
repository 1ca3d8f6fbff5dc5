//! Component expansion and packing.
//!
//! A profile entry may declare components: sub-values packed into the bits of
//! a field's raw integer. Slices are taken most-significant-first in
//! declaration order over the total declared bit count. Expanded values are
//! stored beside the message's wire fields; the encoder packs them back into
//! the host field rather than writing them directly.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::base_type::BaseType;
use crate::message::Message;
use crate::profile::Profile;
use crate::value::{Element, FieldValue};

/// Running totals for accumulated components.
///
/// An accumulated component carries only the low-order bits of a counter.
/// The accumulator unwraps them against the last total seen in this session,
/// keyed by global message number and target field number, producing a
/// non-decreasing value across the stream.
#[derive(Debug, Default)]
pub struct Accumulator {
    totals: HashMap<(u16, u8), u64>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the low `bits` bits of a counter into its running total.
    pub fn update(&mut self, global: u16, field: u8, bits: u8, low: u64) -> u64 {
        let mask = slice_mask(bits);

        match self.totals.entry((global, field)) {
            Entry::Occupied(mut entry) => {
                let previous = *entry.get();
                let delta = low.wrapping_sub(previous) & mask;
                let total = previous + delta;
                entry.insert(total);
                total
            }
            Entry::Vacant(entry) => {
                entry.insert(low);
                low
            }
        }
    }
}

/// Expand a decoded message's component fields in place.
///
/// Each component's bit slice is scaled and stored as a separate value under
/// its target field number. Invalid, float, and string hosts expand nothing.
pub fn expand(message: &mut Message, profile: &Profile, accumulator: &mut Accumulator) {
    let Some(mesg) = profile.message(message.global) else {
        return;
    };

    let mut expanded = Vec::new();

    for (number, value) in message.fields() {
        let Some(field) = mesg.field(number) else {
            continue;
        };

        let Some(total_bits) = component_bits(&field.components) else {
            continue;
        };

        let Some(raw) = value.raw_bits() else {
            continue;
        };

        let mut shift = total_bits;
        for component in &field.components {
            shift -= component.bits as u32;
            let slice = (raw >> shift) & slice_mask(component.bits);

            let full = if component.accumulate {
                accumulator.update(message.global, component.target, component.bits, slice)
            } else {
                slice
            };

            let base_type = mesg
                .field(component.target)
                .map(|f| f.base_type)
                .unwrap_or(value.base_type());

            let element = if component.scale != 1.0 || component.offset != 0.0 {
                Element::Float(full as f64 / component.scale - component.offset)
            } else {
                Element::UInt(full)
            };

            expanded.push((component.target, FieldValue::single(base_type, element)));
        }
    }

    for (number, value) in expanded {
        message.set_expanded(number, value);
    }
}

/// Pack a message's expanded values back into their host fields.
///
/// Returns replacement host values for the encoder to write in place of the
/// stored ones. Hosts whose targets are not all present as expanded values
/// are left untouched.
pub fn pack(message: &Message, profile: &Profile) -> Vec<(u8, FieldValue)> {
    let Some(mesg) = profile.message(message.global) else {
        return Vec::new();
    };

    let mut packed = Vec::new();

    'fields: for (number, value) in message.fields() {
        let Some(field) = mesg.field(number) else {
            continue;
        };

        let Some(total_bits) = component_bits(&field.components) else {
            continue;
        };

        let mut raw = 0;
        let mut shift = total_bits;

        for component in &field.components {
            shift -= component.bits as u32;

            let Some(target) = message
                .expanded_field(component.target)
                .and_then(FieldValue::as_f64)
            else {
                continue 'fields;
            };

            // Rescaling truncates an accumulated total back to its low bits.
            let slice = ((target + component.offset) * component.scale).round() as i64 as u64;
            raw |= (slice & slice_mask(component.bits)) << shift;
        }

        packed.push((number, rebuild_host(value, raw)));
    }

    packed
}

/// Rebuild a host field's value from packed bits, keeping its wire shape.
fn rebuild_host(original: &FieldValue, raw: u64) -> FieldValue {
    match original.base_type() {
        BaseType::Byte => {
            let count = original.elements().len().max(1);
            let elements = (0..count)
                .map(|i| Element::UInt((raw >> (8 * i)) & 0xFF))
                .collect();

            FieldValue::new(BaseType::Byte, elements)
        }
        t => FieldValue::single(t, Element::UInt(raw)),
    }
}

/// The total declared bit count of a component table, when usable.
fn component_bits(components: &[crate::profile::Component]) -> Option<u32> {
    if components.is_empty() {
        return None;
    }

    let total = components.iter().map(|c| c.bits as u32).sum();
    (total > 0 && total <= 64).then_some(total)
}

fn slice_mask(bits: u8) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1 << bits) - 1
    }
}
