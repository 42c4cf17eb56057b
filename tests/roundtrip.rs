//! Round-trip properties: decode(encode(r)) == r for generated records, and
//! the decoder returns errors instead of panicking on arbitrary or mutated
//! input.

use proptest::collection::vec;
use proptest::prelude::*;
use wiregram::net::bgp::{
    AsPathSegment, Asn, AttrFlags, AttributeCode, Message, MessageType, Notification, Origin,
    OriginAttribute, PathAttribute, PrefixSpec, SegmentType, Update,
};
use wiregram::net::ether::{EtherType, EthernetII, Vlan};
use wiregram::{decode, encode, Body};

fn prefix() -> impl Strategy<Value = PrefixSpec> {
    (0u8..=32).prop_flat_map(|length| {
        let octets = (usize::from(length) + 7) / 8;
        vec(any::<u8>(), octets).prop_map(move |prefix| PrefixSpec { length, prefix })
    })
}

fn segment() -> impl Strategy<Value = AsPathSegment> {
    vec(any::<u16>(), 0..10).prop_map(|asns| AsPathSegment {
        kind: SegmentType::AS_SEQUENCE,
        count: asns.len() as u8,
        asns: asns.into_iter().map(Asn).collect(),
    })
}

/// UPDATE with consistent section lengths: one ORIGIN attribute plus
/// generated withdrawn routes and NLRI.
fn update_message(withdrawn: Vec<PrefixSpec>, nlri: Vec<PrefixSpec>, origin: u8) -> Message {
    let withdrawn_len: usize = withdrawn.iter().map(|p| 1 + p.prefix.len()).sum();
    let nlri_len: usize = nlri.iter().map(|p| 1 + p.prefix.len()).sum();
    let body_len = 2 + withdrawn_len + 2 + 4 + nlri_len;
    Message {
        marker: [0xff; 16],
        length: (19 + body_len) as u16,
        kind: MessageType::UPDATE,
        body: Body::Record(Box::new(Update {
            withdrawn_length: withdrawn_len as u16,
            withdrawn_routes: withdrawn,
            path_attribute_length: 4,
            path_attributes: vec![PathAttribute {
                flags: AttrFlags(AttrFlags::TRANSITIVE),
                code: AttributeCode::ORIGIN,
                length: 1,
                data: Body::Record(Box::new(OriginAttribute {
                    origin: Origin(origin),
                })),
            }],
            nlri,
        })),
    }
}

proptest! {
    #[test]
    fn prefixes_round_trip(prefixes in vec(prefix(), 0..8)) {
        let bytes = encode(&prefixes).expect("encode");
        let mut back: Vec<PrefixSpec> = Vec::new();
        decode(&bytes, &mut back).expect("decode");
        prop_assert_eq!(back, prefixes);
    }

    #[test]
    fn notifications_round_trip(code in any::<u8>(), subcode in any::<u8>(), content in vec(any::<u8>(), 0..64)) {
        let original = Notification { code, subcode, content };
        let bytes = encode(&original).expect("encode");
        let mut back = Notification::default();
        decode(&bytes, &mut back).expect("decode");
        prop_assert_eq!(back, original);
    }

    #[test]
    fn as_path_segments_round_trip(segments in vec(segment(), 0..4)) {
        let bytes = encode(&segments).expect("encode");
        let mut back: Vec<AsPathSegment> = Vec::new();
        decode(&bytes, &mut back).expect("decode");
        prop_assert_eq!(back, segments);
    }

    #[test]
    fn bit_packed_vlan_round_trips(priority in 0u8..8, dei in any::<bool>(), id in 0u16..4096) {
        let original = Vlan {
            priority,
            dei,
            id,
            kind: EtherType(0),
            body: Body::None,
        };
        let bytes = encode(&original).expect("encode");
        prop_assert_eq!(bytes.len(), 4);

        let mut back = Vlan::default();
        decode(&bytes, &mut back).expect("decode");
        prop_assert_eq!(back.priority, priority);
        prop_assert_eq!(back.dei, dei);
        prop_assert_eq!(back.id, id);
        prop_assert!(back.body.is_none());
    }

    #[test]
    fn update_messages_round_trip(
        withdrawn in vec(prefix(), 0..4),
        nlri in vec(prefix(), 0..6),
        origin in 0u8..3,
    ) {
        let original = update_message(withdrawn, nlri, origin);
        let bytes = encode(&original).expect("encode");
        prop_assert_eq!(bytes.len(), usize::from(original.length));

        let mut back = Message::default();
        decode(&bytes, &mut back).expect("decode");
        prop_assert_eq!(back.kind, MessageType::UPDATE);
        prop_assert_eq!(back.length, original.length);

        let want = original.body.downcast_ref::<Update>().expect("original update");
        let got = back.body.downcast_ref::<Update>().expect("decoded update");
        prop_assert_eq!(&got.withdrawn_routes, &want.withdrawn_routes);
        prop_assert_eq!(&got.nlri, &want.nlri);
        prop_assert_eq!(got.path_attributes.len(), 1);
        prop_assert_eq!(got.path_attributes[0].code, AttributeCode::ORIGIN);
        prop_assert_eq!(
            got.path_attributes[0].data.downcast_ref::<OriginAttribute>(),
            Some(&OriginAttribute { origin: Origin(origin) })
        );
    }

    #[test]
    fn arbitrary_bytes_never_panic(data in vec(any::<u8>(), 0..200)) {
        let mut frame = EthernetII::default();
        let _ = decode(&data, &mut frame);

        let mut messages: Vec<Message> = Vec::new();
        let _ = decode(&data, &mut messages);
    }

    #[test]
    fn mutated_keepalive_never_panics(index in 0usize..19, value in any::<u8>()) {
        let mut wire = [
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
            0xff, 0xffu8, 0x00, 0x13, 0x04,
        ];
        wire[index] = value;
        let mut msg = Message::default();
        let _ = decode(&wire, &mut msg);
    }
}
