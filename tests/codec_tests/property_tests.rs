//! Property-based tests for the payload codec
//!
//! - `payload_properties`: encode → decode returns the value for every kind
//! - `flag_properties`: flag assignment rules hold for arbitrary input
//! - `decompress_properties`: LZ4 output is always recoverable

use proptest::prelude::*;

use memlink::codec::{
    decompress_with_unknown_size, Compressor, Flags, Lz4Compressor, PayloadCodec, Structured, Value,
};

fn structured_strategy() -> impl Strategy<Value = Structured> {
    let leaf = prop_oneof![
        Just(Structured::Null),
        any::<bool>().prop_map(Structured::Bool),
        any::<i64>().prop_map(Structured::Int),
        (-1.0e9..1.0e9f64).prop_map(Structured::Float),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(Structured::Bytes),
        "[a-z]{0,16}".prop_map(Structured::Text),
    ];

    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Structured::List),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..6).prop_map(Structured::Map),
        ]
    })
}

mod payload_properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Strings come back byte for byte, compressed or not
        #[test]
        fn prop_string_roundtrip(data in prop::collection::vec(any::<u8>(), 0..4096), compress in any::<bool>()) {
            let codec = PayloadCodec::new();
            let value = Value::Str(data);

            let payload = codec.encode(&value, compress).unwrap();
            prop_assert_eq!(codec.decode_payload(&payload).unwrap(), value);
        }

        /// Integers survive the decimal text form
        #[test]
        fn prop_int_roundtrip(n in any::<i64>()) {
            let codec = PayloadCodec::new();
            let payload = codec.encode(&Value::Int(n), true).unwrap();

            prop_assert_eq!(codec.decode_payload(&payload).unwrap(), Value::Int(n));
        }

        /// Finite floats survive the decimal text form
        #[test]
        fn prop_float_roundtrip(f in prop::num::f64::NORMAL | prop::num::f64::ZERO) {
            let codec = PayloadCodec::new();
            let payload = codec.encode(&Value::Float(f), false).unwrap();

            prop_assert_eq!(codec.decode_payload(&payload).unwrap(), Value::Float(f));
        }

        /// Structured trees come back equal
        #[test]
        fn prop_structured_roundtrip(tree in structured_strategy(), compress in any::<bool>()) {
            let codec = PayloadCodec::new();
            let value = Value::Structured(tree);

            let payload = codec.encode(&value, compress).unwrap();
            prop_assert_eq!(codec.decode_payload(&payload).unwrap(), value);
        }
    }
}

mod flag_properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// At most one content flag, and scalars never carry COMPRESSED
        #[test]
        fn prop_content_flags_exclusive(n in any::<i64>(), f in -1.0e6..1.0e6f64, b in any::<bool>(), compress in any::<bool>()) {
            let codec = PayloadCodec::new();

            for value in [Value::Int(n), Value::Float(f), Value::Bool(b)] {
                let flags = codec.encode(&value, compress).unwrap().flags();
                prop_assert_eq!((flags & Flags::CONTENT).bits().count_ones(), 1);
                prop_assert!(!flags.contains(Flags::COMPRESSED));
            }

            let text = codec.encode(&Value::from("text"), compress).unwrap().flags();
            prop_assert!((text & Flags::CONTENT).is_empty());
            prop_assert_eq!(text.contains(Flags::COMPRESSED), compress);
        }

        /// The stored buffer always ends with exactly one extra NUL
        #[test]
        fn prop_trailing_nul(data in prop::collection::vec(any::<u8>(), 0..512)) {
            let codec = PayloadCodec::new();
            let payload = codec.encode(&Value::Str(data.clone()), false).unwrap();

            prop_assert_eq!(payload.bytes_with_nul().len(), data.len() + 1);
            prop_assert_eq!(payload.bytes_with_nul().last(), Some(&0u8));
            prop_assert_eq!(payload.bytes(), data.as_slice());
        }
    }
}

mod decompress_properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Repetitive inputs of any length inflate within the default bound
        #[test]
        fn prop_repetitive_inputs_recover(byte in any::<u8>(), len in 0usize..50_000) {
            let original = vec![byte; len];
            let compressed = Lz4Compressor.compress(&original).unwrap();

            let out = decompress_with_unknown_size(&Lz4Compressor, &compressed, 16).unwrap();
            prop_assert_eq!(out, original);
        }
    }
}
