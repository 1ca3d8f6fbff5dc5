use chainring::base_type::BaseType;
use chainring::decoder::decode_slice;
use chainring::encoder::encode;
use chainring::message::Message;
use chainring::profile::{FILE_ID, Profile, RECORD};
use chainring::value::{Element, FieldValue, ValueError};

fn record_message(local: u8, timestamp: u32, altitude: FieldValue) -> Message {
    let mut message = Message::with_local(RECORD, local);
    message.set_field(
        253,
        FieldValue::single(BaseType::UInt32, Element::UInt(timestamp as u64)),
    );
    message.set_field(
        0,
        FieldValue::single(BaseType::SInt32, Element::SInt(-495_280_430)),
    );
    message.set_field(2, altitude);
    message
}

#[test]
fn round_trip_identity() {
    let mut file_id = Message::with_local(FILE_ID, 0);
    file_id.set_field(0, FieldValue::single(BaseType::Enum, Element::UInt(4)));
    file_id.set_field(1, FieldValue::single(BaseType::UInt16, Element::UInt(1)));
    file_id.set_field(
        3,
        FieldValue::single(BaseType::UInt32z, Element::UInt(0x1234_5678)),
    );

    let mut unknown = Message::with_local(4242, 2);
    unknown.set_field(
        7,
        FieldValue::new(
            BaseType::UInt16,
            vec![Element::UInt(1), Element::UInt(2), Element::Invalid],
        ),
    );
    unknown.set_field(9, FieldValue::string("asdf1234"));

    let messages = vec![
        file_id,
        record_message(1, 1000, FieldValue::single(BaseType::UInt16, Element::UInt(3000))),
        record_message(1, 1001, FieldValue::invalid(BaseType::UInt16)),
        record_message(1, 1002, FieldValue::single(BaseType::UInt16, Element::UInt(3010))),
        unknown,
    ];

    let profile = Profile::base();

    let first = encode(&messages, &profile).unwrap();
    let decoded = decode_slice(&first, &profile).unwrap();
    assert!(decoded.status.file_crc_ok);

    let second = encode(&decoded.messages, &profile).unwrap();
    assert_eq!(first, second);

    let redecoded = decode_slice(&second, &profile).unwrap();
    assert_eq!(decoded.messages, redecoded.messages);
}

#[test]
fn same_shape_messages_share_one_definition() {
    let messages = vec![
        record_message(0, 1000, FieldValue::single(BaseType::UInt16, Element::UInt(3000))),
        record_message(0, 1001, FieldValue::single(BaseType::UInt16, Element::UInt(3001))),
        record_message(0, 1002, FieldValue::single(BaseType::UInt16, Element::UInt(3002))),
    ];

    let profile = Profile::base();
    let document = encode(&messages, &profile).unwrap();

    // One definition (6 + 3 fields * 3) and three data records
    // (1 + 4 + 4 + 2 each), between a 14-byte header and 2-byte check.
    let definition = 6 + 3 * 3;
    let data = 3 * (1 + 4 + 4 + 2);
    assert_eq!(document.len(), 14 + definition + data + 2);

    let decode = decode_slice(&document, &profile).unwrap();
    assert_eq!(decode.messages.len(), 3);
}

#[test]
fn changed_shape_forces_redefinition() {
    let mut short = Message::with_local(RECORD, 0);
    short.set_field(
        253,
        FieldValue::single(BaseType::UInt32, Element::UInt(1003)),
    );

    let messages = vec![
        record_message(0, 1000, FieldValue::single(BaseType::UInt16, Element::UInt(3000))),
        record_message(0, 1001, FieldValue::single(BaseType::UInt16, Element::UInt(3001))),
        short,
    ];

    let profile = Profile::base();
    let document = encode(&messages, &profile).unwrap();

    let first_definition = 6 + 3 * 3;
    let second_definition = 6 + 1 * 3;
    let data = 2 * (1 + 4 + 4 + 2) + (1 + 4);
    assert_eq!(
        document.len(),
        14 + first_definition + second_definition + data + 2
    );
}

#[test]
fn invalid_values_encode_their_marker() {
    let value = FieldValue::invalid(BaseType::UInt16);
    assert_eq!(value.encode(2, false).unwrap(), vec![0xFF, 0xFF]);

    let decoded = FieldValue::decode(BaseType::UInt16, &[0xFF, 0xFF], false);
    assert!(!decoded.is_valid());
    assert_eq!(decoded.elements(), &[Element::Invalid]);
    assert_eq!(decoded.as_u64(), None);
}

#[test]
fn byte_arrays_are_invalid_only_when_fully_marked() {
    let decoded = FieldValue::decode(BaseType::Byte, &[0xFF, 0xFF], false);
    assert!(!decoded.is_valid());

    let decoded = FieldValue::decode(BaseType::Byte, &[0xFF, 0x01], false);
    assert!(decoded.is_valid());
}

#[test]
fn zero_marker_types_invert_validity() {
    let decoded = FieldValue::decode(BaseType::UInt16z, &[0x00, 0x00], false);
    assert!(!decoded.is_valid());

    let decoded = FieldValue::decode(BaseType::UInt16z, &[0xFF, 0xFF], false);
    assert_eq!(decoded.as_u64(), Some(0xFFFF));
}

#[test]
fn string_fits_field_exactly() {
    let value = FieldValue::string("asdf1234");
    assert_eq!(value.encode(8, false).unwrap(), b"asdf1234");

    let decoded = FieldValue::decode(BaseType::String, b"asdf1234", false);
    assert_eq!(decoded.as_str(), Some("asdf1234"));
}

#[test]
fn string_pads_wider_field_with_nuls() {
    let value = FieldValue::string("asdf1234");
    let bytes = value.encode(16, false).unwrap();
    assert_eq!(&bytes[..8], b"asdf1234");
    assert_eq!(&bytes[8..], &[0; 8]);

    let decoded = FieldValue::decode(BaseType::String, &bytes, false);
    assert_eq!(decoded.as_str(), Some("asdf1234"));
    assert_eq!(decoded.elements().len(), 1);
}

#[test]
fn string_arrays_split_on_terminators() {
    let decoded = FieldValue::decode(BaseType::String, b"ab\0cd", false);
    assert_eq!(
        decoded.elements(),
        &[
            Element::String("ab".to_owned()),
            Element::String("cd".to_owned())
        ]
    );

    assert_eq!(decoded.encode(5, false).unwrap(), b"ab\0cd");

    let empty = FieldValue::decode(BaseType::String, &[0, 0, 0], false);
    assert_eq!(empty.elements().len(), 0);
    assert!(!empty.is_valid());
}

#[test]
fn numeric_arrays_pad_with_markers() {
    let value = FieldValue::new(BaseType::UInt16, vec![Element::UInt(5)]);
    assert_eq!(
        value.encode(6, false).unwrap(),
        vec![5, 0, 0xFF, 0xFF, 0xFF, 0xFF]
    );
}

#[test]
fn oversize_values_fail_rather_than_truncate() {
    let value = FieldValue::string("asdf1234");
    assert!(matches!(
        value.encode(4, false),
        Err(ValueError::Oversize { size: 4, needed: 9 })
    ));

    let value = FieldValue::new(
        BaseType::UInt16,
        vec![Element::String("nope".to_owned())],
    );
    assert!(matches!(
        value.encode(2, false),
        Err(ValueError::Incompatible { .. })
    ));
}

#[test]
fn signed_values_round_trip() {
    let value = FieldValue::single(BaseType::SInt16, Element::SInt(-5));
    let bytes = value.encode(2, false).unwrap();
    assert_eq!(bytes, vec![0xFB, 0xFF]);

    let decoded = FieldValue::decode(BaseType::SInt16, &bytes, false);
    assert_eq!(decoded.as_i64(), Some(-5));
}

#[test]
fn big_endian_messages_round_trip() {
    let decoded = FieldValue::decode(BaseType::UInt16, &[0x01, 0x02], true);
    assert_eq!(decoded.as_u64(), Some(0x0102));

    let mut message = record_message(
        0,
        1000,
        FieldValue::single(BaseType::UInt16, Element::UInt(3000)),
    );
    message.big_endian = true;

    let profile = Profile::base();
    let first = encode(&[message], &profile).unwrap();
    let decoded = decode_slice(&first, &profile).unwrap();

    assert!(decoded.messages[0].big_endian);
    assert_eq!(decoded.messages[0].timestamp(), Some(1000));

    let second = encode(&decoded.messages, &profile).unwrap();
    assert_eq!(first, second);
}

#[test]
fn unknown_messages_pass_through_byte_identically() {
    let mut message = Message::with_local(4242, 3);
    message.set_field(
        200,
        FieldValue::new(
            BaseType::UInt32,
            vec![Element::UInt(7), Element::UInt(8)],
        ),
    );
    message.set_field(201, FieldValue::single(BaseType::Enum, Element::UInt(9)));

    // An empty profile: nothing is recognized, everything passes through.
    let profile = Profile::new();

    let first = encode(&[message], &profile).unwrap();
    let decoded = decode_slice(&first, &profile).unwrap();

    let value = decoded.messages[0].field(200).unwrap();
    assert_eq!(value.base_type(), BaseType::UInt32);
    assert_eq!(value.elements(), &[Element::UInt(7), Element::UInt(8)]);

    let second = encode(&decoded.messages, &profile).unwrap();
    assert_eq!(first, second);
}

#[test]
fn float_fields_use_nan_as_marker() {
    let decoded = FieldValue::decode(BaseType::Float32, &0xFFFF_FFFFu32.to_le_bytes(), false);
    assert!(!decoded.is_valid());

    let value = FieldValue::invalid(BaseType::Float32);
    assert_eq!(value.encode(4, false).unwrap(), vec![0xFF, 0xFF, 0xFF, 0xFF]);

    let decoded = FieldValue::decode(BaseType::Float32, &2.5f32.to_le_bytes(), false);
    assert_eq!(decoded.as_f64(), Some(2.5));
}
