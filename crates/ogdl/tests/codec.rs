//! Binary codec properties: round trips, varint range, and fail-closed
//! decoding of arbitrary input.

use ogdl::codec::{decode_varint, encode_varint};
use ogdl::limits::MAX_VARINT;
use ogdl::{EncodeOptions, Graph, Scalar, decode, decode_from_reader, encode};
use proptest::prelude::*;

fn arb_scalar() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        Just(Scalar::Nil),
        ".{0,12}".prop_map(Scalar::Str),
        any::<i64>().prop_map(Scalar::Int),
        any::<f64>()
            .prop_filter("NaN has no encoding", |f| !f.is_nan())
            .prop_map(Scalar::Float),
        any::<bool>().prop_map(Scalar::Bool),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Scalar::Bytes),
    ]
}

fn arb_graph() -> impl Strategy<Value = Graph> {
    let leaf = arb_scalar().prop_map(|value| Graph::new(value));
    leaf.prop_recursive(4, 64, 6, |inner| {
        (arb_scalar(), prop::collection::vec(inner, 0..6)).prop_map(|(value, children)| {
            let mut g = Graph::new(value);
            for child in children {
                g.add_node(child);
            }
            g
        })
    })
}

proptest! {
    #[test]
    fn roundtrip_reproduces_graph(g in arb_graph()) {
        let bytes = encode(&g).unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), g.clone());
        prop_assert_eq!(decode_from_reader(bytes.as_slice()).unwrap(), g);
    }

    #[test]
    fn compressed_roundtrip_reproduces_graph(g in arb_graph()) {
        let bytes = ogdl::codec::encode_with_options(&g, EncodeOptions::compressed(1)).unwrap();
        prop_assert_eq!(decode(&bytes).unwrap(), g);
    }

    #[test]
    fn varint_roundtrip_in_range(n in 0..=i64::from(MAX_VARINT)) {
        let bytes = encode_varint(n).unwrap();
        prop_assert_eq!(bytes.len() == 1, n <= 127);
        prop_assert!(bytes.len() <= 4);
        prop_assert_eq!(decode_varint(&bytes).unwrap(), (n as u32, bytes.len()));
    }

    #[test]
    fn varint_rejects_negative(n in i64::MIN..0) {
        prop_assert!(encode_varint(n).is_err());
    }

    #[test]
    fn varint_rejects_too_large(n in (i64::from(MAX_VARINT) + 1)..=i64::MAX) {
        prop_assert!(encode_varint(n).is_err());
    }

    #[test]
    fn arbitrary_bodies_fail_closed(body in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut bytes = vec![1, b'G', 0];
        bytes.extend_from_slice(&body);
        // Either a complete graph or the nil sentinel; never a panic.
        let g = Graph::from_binary(&bytes);
        if decode(&bytes).is_err() {
            prop_assert_eq!(g, Graph::nil());
        }
    }
}

#[test]
fn graph_built_by_set_roundtrips() {
    let mut g = Graph::nil();
    g.set("server.host", "example.org");
    g.set("server.port", 8080);
    g.set("server.tls", true);
    g.set("limits.ratio", 0.75);
    g.add("blob").add(vec![0u8, 1, 2, 255]);

    let decoded = decode(&encode(&g).unwrap()).unwrap();
    assert_eq!(decoded, g);
    assert_eq!(decoded.get_int("server.port"), Some(8080));
    assert_eq!(decoded.get_bool("server.tls"), Some(true));
    assert_eq!(decoded.get("blob").value(), &Scalar::Bytes(vec![0, 1, 2, 255]));
}

#[test]
fn bad_headers_decode_to_nil() {
    let mut g = Graph::nil();
    g.add("a").add(1);
    let good = encode(&g).unwrap();

    for (index, byte) in [(0, 0u8), (0, 2), (1, b'g'), (2, 0x01), (2, 0x80)] {
        let mut bad = good.clone();
        bad[index] = byte;
        assert_eq!(Graph::from_binary(&bad), Graph::nil(), "byte {index} = {byte:#04x}");
    }
    assert_eq!(Graph::from_binary(&good), g);
    assert_eq!(Graph::from_binary(&[]), Graph::nil());
}

#[test]
fn truncated_streams_fail() {
    let mut g = Graph::nil();
    g.add("name").add("value");
    let bytes = encode(&g).unwrap();
    for end in 0..bytes.len() {
        assert!(decode(&bytes[..end]).is_err(), "prefix of {end} bytes decoded");
    }
}

#[test]
fn stream_decode_stops_at_end_marker() {
    let mut first = Graph::nil();
    first.add("first");
    let mut second = Graph::nil();
    second.add("second");

    let mut wire = encode(&first).unwrap();
    wire.extend(encode(&second).unwrap());

    let mut input = wire.as_slice();
    assert_eq!(decode_from_reader(&mut input).unwrap(), first);
    assert_eq!(decode_from_reader(&mut input).unwrap(), second);
    assert!(input.is_empty());
}
