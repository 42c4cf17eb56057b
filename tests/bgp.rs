//! BGP message decoding against captured wire bytes: KEEPALIVE, UPDATE with
//! path attributes and NLRI, back-to-back messages, and a full
//! Ethernet → VLAN → IPv4 → TCP → BGP OPEN frame.

use wiregram::net::bgp::{
    AsPathSegment, AsPath, Asn, AttrFlags, AttributeCode, Keepalive, Message, MessageType,
    NexthopAttribute, Open, Origin, OriginAttribute, PrefixSpec, SegmentType, Update,
};
use wiregram::net::ether::{EtherType, EthernetII, Vlan};
use wiregram::net::ip::{Checksum, IpProtocol, Ipv4};
use wiregram::net::tcp::{Port, Tcp, TcpFlags};
use wiregram::{decode, encode};

/// Single KEEPALIVE message.
const KEEPALIVE_WIRE: [u8; 19] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0x00, 0x13, 0x04,
];

/// UPDATE with no withdrawn routes, three path attributes, five prefixes.
const UPDATE_WIRE: [u8; 61] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0x00, 0x3d, 0x02, 0x00, 0x00, 0x00, 0x12, 0x40, 0x01, 0x01, 0x00, 0x40, 0x02, 0x04,
    0x02, 0x01, 0xfd, 0xe8, 0x40, 0x03, 0x04, 0xc0, 0xa8, 0x56, 0x64, 0x18, 0x0a, 0x01, 0x03,
    0x18, 0x0a, 0x01, 0x06, 0x18, 0x0a, 0x01, 0x07, 0x18, 0x0a, 0x01, 0x04, 0x18, 0x0a, 0x01,
    0x05,
];

/// Captured frame: Ethernet II, 802.1Q tag, IPv4, TCP to port 179, BGP OPEN
/// with four capability parameters, then 19 bytes of trailer past the IPv4
/// total length.
const FRAME: [u8; 144] = [
    0xfa, 0x16, 0x3e, 0x85, 0x92, 0x77, 0xfa, 0x16, /* ..>..w.. */
    0x3e, 0x1a, 0x43, 0xcb, 0x81, 0x00, 0x0f, 0xfe, /* >.C..... */
    0x08, 0x00, 0x45, 0x00, 0x00, 0x6b, 0x9a, 0xaf, /* ..E..k.. */
    0x40, 0x00, 0x01, 0x06, 0xca, 0xa2, 0x0a, 0x14, /* @....... */
    0x00, 0x0a, 0x0a, 0x0a, 0x00, 0x14, 0x89, 0xce, /* ........ */
    0x00, 0xb3, 0x48, 0x0c, 0x55, 0x19, 0x8b, 0xd2, /* ..H.U... */
    0x47, 0x96, 0x80, 0x18, 0x00, 0x73, 0xfc, 0x5c, /* G....s.\ */
    0x00, 0x00, 0x01, 0x01, 0x08, 0x0a, 0x80, 0x02, /* ........ */
    0x3c, 0xbe, 0x00, 0x0a, 0xf2, 0x19, 0xff, 0xff, /* <....... */
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, /* ........ */
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00, 0x37, /* .......7 */
    0x01, 0x04, 0xfd, 0xea, 0x00, 0x5a, 0x0a, 0x28, /* .....Z.( */
    0x00, 0x0a, 0x1a, 0x02, 0x06, 0x01, 0x04, 0x00, /* ........ */
    0x01, 0x00, 0x01, 0x02, 0x02, 0x80, 0x00, 0x02, /* ........ */
    0x02, 0x02, 0x00, 0x02, 0x08, 0x40, 0x06, 0x00, /* .....@.. */
    0x78, 0x00, 0x01, 0x01, 0x00, 0xf5, 0xde, 0xb0, /* x....... */
    0xf5, 0x00, 0x14, 0x00, 0x01, 0x00, 0x01, 0x00, /* ........ */
    0x0c, 0x00, 0x02, 0x01, 0x00, 0x00, 0x00, /* ........ */
    0x01, /* . */
];

#[test]
fn keepalive_message() {
    let mut msg = Message::default();
    decode(&KEEPALIVE_WIRE, &mut msg).expect("decode");
    assert_eq!(msg.marker, [0xff; 16]);
    assert_eq!(msg.length, 19);
    assert_eq!(msg.kind, MessageType::KEEPALIVE);
    assert!(msg.body.downcast_ref::<Keepalive>().is_some());

    assert_eq!(encode(&msg).expect("encode"), KEEPALIVE_WIRE);
}

#[test]
fn update_message() {
    let mut msg = Message::default();
    decode(&UPDATE_WIRE, &mut msg).expect("decode");
    assert_eq!(msg.length, 61);
    assert_eq!(msg.kind, MessageType::UPDATE);

    let update = msg.body.downcast_ref::<Update>().expect("update body");
    assert_eq!(update.withdrawn_length, 0);
    assert!(update.withdrawn_routes.is_empty());
    assert_eq!(update.path_attribute_length, 18);
    assert_eq!(update.path_attributes.len(), 3);

    let origin = &update.path_attributes[0];
    assert_eq!(origin.flags.0, AttrFlags::TRANSITIVE);
    assert_eq!(origin.code, AttributeCode::ORIGIN);
    assert_eq!(origin.length, 1);
    assert_eq!(
        origin.data.downcast_ref::<OriginAttribute>(),
        Some(&OriginAttribute {
            origin: Origin::IGP
        })
    );

    let as_path = &update.path_attributes[1];
    assert_eq!(as_path.code, AttributeCode::AS_PATH);
    assert_eq!(as_path.length, 4);
    assert_eq!(
        as_path.data.downcast_ref::<AsPath>(),
        Some(&AsPath {
            segments: vec![AsPathSegment {
                kind: SegmentType::AS_SEQUENCE,
                count: 1,
                asns: vec![Asn(65000)],
            }],
        })
    );

    let next_hop = &update.path_attributes[2];
    assert_eq!(next_hop.code, AttributeCode::NEXT_HOP);
    assert_eq!(
        next_hop.data.downcast_ref::<NexthopAttribute>(),
        Some(&NexthopAttribute {
            next_hop: vec![0xc0, 0xa8, 0x56, 0x64],
        })
    );

    let want_prefixes: Vec<PrefixSpec> = [3u8, 6, 7, 4, 5]
        .into_iter()
        .map(|last| PrefixSpec {
            length: 24,
            prefix: vec![0x0a, 0x01, last],
        })
        .collect();
    assert_eq!(update.nlri, want_prefixes);
}

#[test]
fn update_message_round_trips() {
    let mut msg = Message::default();
    decode(&UPDATE_WIRE, &mut msg).expect("decode");
    assert_eq!(encode(&msg).expect("encode"), UPDATE_WIRE);
}

#[test]
fn back_to_back_messages() {
    let mut combo = Vec::new();
    combo.extend_from_slice(&KEEPALIVE_WIRE);
    combo.extend_from_slice(&UPDATE_WIRE);
    combo.extend_from_slice(&KEEPALIVE_WIRE);

    let mut messages: Vec<Message> = Vec::new();
    decode(&combo, &mut messages).expect("decode");
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].kind, MessageType::KEEPALIVE);
    assert_eq!(messages[1].kind, MessageType::UPDATE);
    assert_eq!(messages[2].kind, MessageType::KEEPALIVE);
    assert_eq!(messages[1].length, 61);

    assert_eq!(encode(&messages).expect("encode"), combo);
}

#[test]
fn unknown_message_type_keeps_raw_body() {
    let mut wire = KEEPALIVE_WIRE.to_vec();
    wire[16] = 0x00;
    wire[17] = 0x15; // length 21
    wire[18] = 0x09; // unregistered type
    wire.extend_from_slice(&[0xaa, 0xbb]);

    let mut msg = Message::default();
    decode(&wire, &mut msg).expect("decode");
    assert_eq!(msg.kind, MessageType(9));
    assert_eq!(msg.body.as_raw(), Some(&[0xaa, 0xbb][..]));

    assert_eq!(encode(&msg).expect("encode"), wire);
}

#[test]
fn full_frame_to_bgp_open() {
    let mut frame = EthernetII::default();
    decode(&FRAME, &mut frame).expect("decode");

    assert_eq!(frame.source.to_string(), "fa163e859277");
    assert_eq!(frame.dest.to_string(), "fa163e1a43cb");
    assert_eq!(frame.kind, EtherType::VLAN);

    let vlan = frame.body.downcast_ref::<Vlan>().expect("vlan");
    assert_eq!(vlan.priority, 0);
    assert!(!vlan.dei);
    assert_eq!(vlan.id, 0xffe);
    assert_eq!(vlan.kind, EtherType::IPV4);

    let ip = vlan.body.downcast_ref::<Ipv4>().expect("ipv4");
    assert_eq!(ip.version, 4);
    assert_eq!(ip.ihl, 5);
    assert_eq!(ip.length, 107);
    assert_eq!(ip.ttl, 1);
    assert_eq!(ip.protocol, IpProtocol::TCP);
    assert_eq!(ip.checksum, Checksum(0xcaa2));
    assert_eq!(ip.source, [0x0a, 0x14, 0x00, 0x0a]);
    assert_eq!(ip.dest, [0x0a, 0x0a, 0x00, 0x14]);
    assert!(ip.options.is_empty());

    let tcp = ip.body.downcast_ref::<Tcp>().expect("tcp");
    assert_eq!(tcp.source, Port(35278));
    assert_eq!(tcp.dest, Port::BGP);
    assert_eq!(tcp.sequence, 0x480c5519);
    assert_eq!(tcp.data_offset, 8);
    assert_eq!(tcp.flags.0, TcpFlags::PSH | TcpFlags::ACK);
    assert_eq!(tcp.options.len(), 12);

    let msg = tcp.body.downcast_ref::<Message>().expect("bgp message");
    assert_eq!(msg.length, 55);
    assert_eq!(msg.kind, MessageType::OPEN);

    let open = msg.body.downcast_ref::<Open>().expect("open");
    assert_eq!(open.version, 4);
    assert_eq!(open.asn, 65002);
    assert_eq!(open.hold_time, 90);
    assert_eq!(open.router_id, 0x0a28000a);
    assert_eq!(open.optional_length, 26);
    assert_eq!(open.optional.len(), 4);

    let lengths: Vec<u8> = open.optional.iter().map(|p| p.length).collect();
    assert_eq!(lengths, vec![6, 2, 2, 8]);
    assert!(open.optional.iter().all(|p| p.kind == 2));
    assert_eq!(
        open.optional[0].value.as_raw(),
        Some(&[0x01, 0x04, 0x00, 0x01, 0x00, 0x01][..])
    );
    assert_eq!(open.optional[3].value.as_raw(), Some(&FRAME[117..125]));
}

#[test]
fn full_frame_re_encodes_without_trailer() {
    let mut frame = EthernetII::default();
    decode(&FRAME, &mut frame).expect("decode");
    // the 19 trailer bytes sit beyond the IPv4 total length and are not
    // part of the decoded tree
    assert_eq!(encode(&frame).expect("encode"), &FRAME[..125]);
}

#[test]
fn dump_renders_the_message_tree() {
    let mut msg = Message::default();
    decode(&UPDATE_WIRE, &mut msg).expect("decode");
    let text = wiregram::dump(&msg).expect("dump");
    assert!(text.contains("bgp.Message"));
    assert!(text.contains("bgp.Update"));
    assert!(text.contains("path_attributes: [3]"));
    assert!(text.contains("nlri: [5]"));
}
