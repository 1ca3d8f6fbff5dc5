//! Subfield resolution: reinterpreting fields by a sibling's value.
//!
//! A profile entry may declare subfields, alternate meanings for one physical
//! field number selected by the decoded value of a reference field in the
//! same message. The reference may appear after the field it disambiguates,
//! so resolution runs as a pass over the fully decoded message, reinterpreting
//! the cached source bytes rather than re-reading the record.

use crate::message::Message;
use crate::profile::{MessageProfile, Profile, Subfield};
use crate::value::FieldValue;

/// The subfield currently selected for a field, if any.
pub fn active<'p>(
    message: &Message,
    mesg: &'p MessageProfile,
    number: u8,
) -> Option<&'p Subfield> {
    let field = mesg.field(number)?;

    field.subfields.iter().find(|sub| {
        message
            .field(sub.ref_field)
            .and_then(FieldValue::as_u64)
            .is_some_and(|value| value == sub.ref_value)
    })
}

/// Resolve a decoded message's subfields in place.
///
/// Fields whose active subfield declares a different base type are replaced
/// with a reinterpretation of their source bytes, exposed under the same
/// field number. Fields without a matching subfield, or without cached
/// source bytes, keep their main decoding.
pub fn resolve(message: &mut Message, profile: &Profile) {
    let Some(mesg) = profile.message(message.global) else {
        return;
    };

    let mut resolved = Vec::new();

    for (number, value) in message.fields() {
        let Some(sub) = active(message, mesg, number) else {
            continue;
        };

        if sub.base_type == value.base_type() {
            continue;
        }

        let Some(source) = value.source() else {
            continue;
        };

        resolved.push((
            number,
            FieldValue::decode(sub.base_type, source, message.big_endian),
        ));
    }

    for (number, value) in resolved {
        message.set_field(number, value);
    }
}
