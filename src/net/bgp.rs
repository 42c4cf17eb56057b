//! BGP-4 message family (RFC 4271): the fixed header plus OPEN, UPDATE,
//! NOTIFICATION, and KEEPALIVE bodies.
//!
//! The fixed header's `length` covers the whole message including the
//! header, so it bounds the body decode; a buffer of back-to-back messages
//! decodes into a `Vec<Message>` root. UPDATE is the stress case: two
//! sibling-length sections (withdrawn routes, path attributes) followed by
//! NLRI prefixes to the end of the message, with per-attribute bodies
//! resolved from the attribute code.

use crate::record::{Body, Dispatch, Record, Slot, SlotRef, Wire};
use crate::schema::FieldDef;
use crate::wire_record;
use std::fmt;

/// BGP message type from the fixed header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageType(pub u8);

impl MessageType {
    pub const OPEN: MessageType = MessageType(1);
    pub const UPDATE: MessageType = MessageType(2);
    pub const NOTIFICATION: MessageType = MessageType(3);
    pub const KEEPALIVE: MessageType = MessageType(4);
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MessageType::OPEN => f.write_str("OPEN"),
            MessageType::UPDATE => f.write_str("UPDATE"),
            MessageType::NOTIFICATION => f.write_str("NOTIFICATION"),
            MessageType::KEEPALIVE => f.write_str("KEEPALIVE"),
            MessageType(other) => write!(f, "Unknown(MessageType={})", other),
        }
    }
}

/// Fixed BGP header; `length` counts the whole message, marker included.
#[derive(Debug)]
pub struct Message {
    pub marker: [u8; 16],
    pub length: u16,
    pub kind: MessageType,
    pub body: Body,
}

impl Default for Message {
    fn default() -> Self {
        Message {
            marker: [0xff; 16],
            length: 0,
            kind: MessageType::default(),
            body: Body::default(),
        }
    }
}

const MESSAGE_FIELDS: &[FieldDef] = &[
    FieldDef::new("marker"),
    FieldDef::new("length").total_length(),
    FieldDef::new("kind"),
    FieldDef::new("body"),
];

impl Record for Message {
    fn record_name(&self) -> &'static str {
        "bgp.Message"
    }

    fn field_defs(&self) -> &'static [FieldDef] {
        MESSAGE_FIELDS
    }

    fn field_mut(&mut self, name: &str) -> Slot<'_> {
        match name {
            "marker" => Slot::FixedBytes(&mut self.marker),
            "length" => Slot::U16(&mut self.length),
            "kind" => Slot::U8(&mut self.kind.0),
            "body" => Slot::Body(&mut self.body),
            _ => Slot::Skip,
        }
    }

    fn field_ref(&self, name: &str) -> SlotRef<'_> {
        match name {
            "marker" => SlotRef::Bytes(&self.marker),
            "length" => SlotRef::U16(self.length),
            "kind" => SlotRef::U8(self.kind.0),
            "body" => SlotRef::Body(&self.body),
            _ => SlotRef::Skip,
        }
    }

    fn instance_for(&self, _field: &str) -> Dispatch {
        match self.kind {
            MessageType::OPEN => Dispatch::Instance(Box::new(Open::default())),
            MessageType::UPDATE => Dispatch::Instance(Box::new(Update::default())),
            MessageType::NOTIFICATION => Dispatch::Instance(Box::new(Notification::default())),
            MessageType::KEEPALIVE => Dispatch::Instance(Box::new(Keepalive)),
            _ => Dispatch::None,
        }
    }
}

/// OPEN body: session parameters plus optional parameters bounded by their
/// declared byte length.
#[derive(Debug, Default)]
pub struct Open {
    pub version: u8,
    pub asn: u16,
    pub hold_time: u16,
    pub router_id: u32,
    pub optional_length: u8,
    pub optional: Vec<OptionalParameter>,
}

const OPEN_FIELDS: &[FieldDef] = &[
    FieldDef::new("version"),
    FieldDef::new("asn"),
    FieldDef::new("hold_time"),
    FieldDef::new("router_id"),
    FieldDef::new("optional_length"),
    FieldDef::annotated("optional", "lengthfrom=optional_length"),
];

impl Record for Open {
    fn record_name(&self) -> &'static str {
        "bgp.Open"
    }

    fn field_defs(&self) -> &'static [FieldDef] {
        OPEN_FIELDS
    }

    fn field_mut(&mut self, name: &str) -> Slot<'_> {
        match name {
            "version" => Slot::U8(&mut self.version),
            "asn" => Slot::U16(&mut self.asn),
            "hold_time" => Slot::U16(&mut self.hold_time),
            "router_id" => Slot::U32(&mut self.router_id),
            "optional_length" => Slot::U8(&mut self.optional_length),
            "optional" => Slot::Seq(&mut self.optional),
            _ => Slot::Skip,
        }
    }

    fn field_ref(&self, name: &str) -> SlotRef<'_> {
        match name {
            "version" => SlotRef::U8(self.version),
            "asn" => SlotRef::U16(self.asn),
            "hold_time" => SlotRef::U16(self.hold_time),
            "router_id" => SlotRef::U32(self.router_id),
            "optional_length" => SlotRef::U8(self.optional_length),
            "optional" => SlotRef::Seq(&self.optional),
            _ => SlotRef::Skip,
        }
    }
}

/// One OPEN optional parameter; the value is kept raw, capability parsing
/// belongs to the application.
#[derive(Debug, Default)]
pub struct OptionalParameter {
    pub kind: u8,
    pub length: u8,
    pub value: Body,
}

const OPTIONAL_PARAMETER_FIELDS: &[FieldDef] = &[
    FieldDef::new("kind"),
    FieldDef::new("length"),
    FieldDef::annotated("value", "lengthfrom=length"),
];

impl Record for OptionalParameter {
    fn record_name(&self) -> &'static str {
        "bgp.OptionalParameter"
    }

    fn field_defs(&self) -> &'static [FieldDef] {
        OPTIONAL_PARAMETER_FIELDS
    }

    fn field_mut(&mut self, name: &str) -> Slot<'_> {
        match name {
            "kind" => Slot::U8(&mut self.kind),
            "length" => Slot::U8(&mut self.length),
            "value" => Slot::Body(&mut self.value),
            _ => Slot::Skip,
        }
    }

    fn field_ref(&self, name: &str) -> SlotRef<'_> {
        match name {
            "kind" => SlotRef::U8(self.kind),
            "length" => SlotRef::U8(self.length),
            "value" => SlotRef::Body(&self.value),
            _ => SlotRef::Skip,
        }
    }

    fn instance_for(&self, _field: &str) -> Dispatch {
        Dispatch::None
    }
}

/// UPDATE body.
#[derive(Debug, Default)]
pub struct Update {
    pub withdrawn_length: u16,
    pub withdrawn_routes: Vec<PrefixSpec>,
    pub path_attribute_length: u16,
    pub path_attributes: Vec<PathAttribute>,
    pub nlri: Vec<PrefixSpec>,
}

const UPDATE_FIELDS: &[FieldDef] = &[
    FieldDef::new("withdrawn_length"),
    FieldDef::annotated("withdrawn_routes", "lengthfrom=withdrawn_length"),
    FieldDef::new("path_attribute_length"),
    FieldDef::annotated("path_attributes", "lengthfrom=path_attribute_length"),
    FieldDef::annotated("nlri", "lengthrest"),
];

impl Record for Update {
    fn record_name(&self) -> &'static str {
        "bgp.Update"
    }

    fn field_defs(&self) -> &'static [FieldDef] {
        UPDATE_FIELDS
    }

    fn field_mut(&mut self, name: &str) -> Slot<'_> {
        match name {
            "withdrawn_length" => Slot::U16(&mut self.withdrawn_length),
            "withdrawn_routes" => Slot::Seq(&mut self.withdrawn_routes),
            "path_attribute_length" => Slot::U16(&mut self.path_attribute_length),
            "path_attributes" => Slot::Seq(&mut self.path_attributes),
            "nlri" => Slot::Seq(&mut self.nlri),
            _ => Slot::Skip,
        }
    }

    fn field_ref(&self, name: &str) -> SlotRef<'_> {
        match name {
            "withdrawn_length" => SlotRef::U16(self.withdrawn_length),
            "withdrawn_routes" => SlotRef::Seq(&self.withdrawn_routes),
            "path_attribute_length" => SlotRef::U16(self.path_attribute_length),
            "path_attributes" => SlotRef::Seq(&self.path_attributes),
            "nlri" => SlotRef::Seq(&self.nlri),
            _ => SlotRef::Skip,
        }
    }
}

/// Path attribute flags octet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttrFlags(pub u8);

impl AttrFlags {
    pub const OPTIONAL: u8 = 0x80;
    pub const TRANSITIVE: u8 = 0x40;
    pub const PARTIAL: u8 = 0x20;
    pub const EXTENDED_LENGTH: u8 = 0x10;
}

/// Path attribute type code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributeCode(pub u8);

impl AttributeCode {
    pub const ORIGIN: AttributeCode = AttributeCode(1);
    pub const AS_PATH: AttributeCode = AttributeCode(2);
    pub const NEXT_HOP: AttributeCode = AttributeCode(3);
    pub const MULTI_EXIT_DISC: AttributeCode = AttributeCode(4);
    pub const LOCAL_PREF: AttributeCode = AttributeCode(5);
    pub const ATOMIC_AGGREGATE: AttributeCode = AttributeCode(6);
    pub const AGGREGATOR: AttributeCode = AttributeCode(7);
}

impl fmt::Display for AttributeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            AttributeCode::ORIGIN => f.write_str("ORIGIN"),
            AttributeCode::AS_PATH => f.write_str("AS_PATH"),
            AttributeCode::NEXT_HOP => f.write_str("NEXT_HOP"),
            AttributeCode::MULTI_EXIT_DISC => f.write_str("MULTI_EXIT_DISC"),
            AttributeCode::LOCAL_PREF => f.write_str("LOCAL_PREF"),
            AttributeCode::ATOMIC_AGGREGATE => f.write_str("ATOMIC_AGGREGATE"),
            AttributeCode::AGGREGATOR => f.write_str("AGGREGATOR"),
            AttributeCode(other) => write!(f, "AttributeCode({})", other),
        }
    }
}

/// One UPDATE path attribute: the data is bounded by `length` and typed by
/// `code`; unrecognized codes keep the raw bytes.
#[derive(Debug, Default)]
pub struct PathAttribute {
    pub flags: AttrFlags,
    pub code: AttributeCode,
    pub length: u8,
    pub data: Body,
}

const PATH_ATTRIBUTE_FIELDS: &[FieldDef] = &[
    FieldDef::new("flags"),
    FieldDef::new("code"),
    FieldDef::new("length"),
    FieldDef::annotated("data", "lengthfrom=length"),
];

impl Record for PathAttribute {
    fn record_name(&self) -> &'static str {
        "bgp.PathAttribute"
    }

    fn field_defs(&self) -> &'static [FieldDef] {
        PATH_ATTRIBUTE_FIELDS
    }

    fn field_mut(&mut self, name: &str) -> Slot<'_> {
        match name {
            "flags" => Slot::U8(&mut self.flags.0),
            "code" => Slot::U8(&mut self.code.0),
            "length" => Slot::U8(&mut self.length),
            "data" => Slot::Body(&mut self.data),
            _ => Slot::Skip,
        }
    }

    fn field_ref(&self, name: &str) -> SlotRef<'_> {
        match name {
            "flags" => SlotRef::U8(self.flags.0),
            "code" => SlotRef::U8(self.code.0),
            "length" => SlotRef::U8(self.length),
            "data" => SlotRef::Body(&self.data),
            _ => SlotRef::Skip,
        }
    }

    fn instance_for(&self, _field: &str) -> Dispatch {
        match self.code {
            AttributeCode::ORIGIN => Dispatch::Instance(Box::new(OriginAttribute::default())),
            AttributeCode::AS_PATH => Dispatch::Instance(Box::new(AsPath::default())),
            AttributeCode::NEXT_HOP => Dispatch::Instance(Box::new(NexthopAttribute::default())),
            _ => Dispatch::None,
        }
    }
}

/// ORIGIN attribute value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Origin(pub u8);

impl Origin {
    pub const IGP: Origin = Origin(0);
    pub const EGP: Origin = Origin(1);
    pub const INCOMPLETE: Origin = Origin(2);
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Origin::IGP => f.write_str("IGP"),
            Origin::EGP => f.write_str("EGP"),
            Origin::INCOMPLETE => f.write_str("INCOMPLETE"),
            Origin(other) => write!(f, "Origin({})", other),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct OriginAttribute {
    pub origin: Origin,
}

const ORIGIN_ATTRIBUTE_FIELDS: &[FieldDef] = &[FieldDef::new("origin")];

impl Record for OriginAttribute {
    fn record_name(&self) -> &'static str {
        "bgp.OriginAttribute"
    }

    fn field_defs(&self) -> &'static [FieldDef] {
        ORIGIN_ATTRIBUTE_FIELDS
    }

    fn field_mut(&mut self, name: &str) -> Slot<'_> {
        match name {
            "origin" => Slot::U8(&mut self.origin.0),
            _ => Slot::Skip,
        }
    }

    fn field_ref(&self, name: &str) -> SlotRef<'_> {
        match name {
            "origin" => SlotRef::U8(self.origin.0),
            _ => SlotRef::Skip,
        }
    }
}

/// AS_PATH attribute value: segments to the end of the attribute.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AsPath {
    pub segments: Vec<AsPathSegment>,
}

const AS_PATH_FIELDS: &[FieldDef] = &[FieldDef::new("segments")];

impl Record for AsPath {
    fn record_name(&self) -> &'static str {
        "bgp.AsPath"
    }

    fn field_defs(&self) -> &'static [FieldDef] {
        AS_PATH_FIELDS
    }

    fn field_mut(&mut self, name: &str) -> Slot<'_> {
        match name {
            "segments" => Slot::Seq(&mut self.segments),
            _ => Slot::Skip,
        }
    }

    fn field_ref(&self, name: &str) -> SlotRef<'_> {
        match name {
            "segments" => SlotRef::Seq(&self.segments),
            _ => SlotRef::Skip,
        }
    }
}

/// AS_PATH segment type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentType(pub u8);

impl SegmentType {
    pub const AS_SET: SegmentType = SegmentType(1);
    pub const AS_SEQUENCE: SegmentType = SegmentType(2);
}

/// Autonomous system number (two-octet encoding).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Asn(pub u16);

impl fmt::Display for Asn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Wire for Asn {
    fn slot_mut(&mut self) -> Slot<'_> {
        Slot::U16(&mut self.0)
    }

    fn slot_ref(&self) -> SlotRef<'_> {
        SlotRef::U16(self.0)
    }
}

/// One AS_PATH segment: `count` ASNs of the given segment type.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AsPathSegment {
    pub kind: SegmentType,
    pub count: u8,
    pub asns: Vec<Asn>,
}

const AS_PATH_SEGMENT_FIELDS: &[FieldDef] = &[
    FieldDef::new("kind"),
    FieldDef::new("count"),
    FieldDef::annotated("asns", "countfrom=count"),
];

impl Record for AsPathSegment {
    fn record_name(&self) -> &'static str {
        "bgp.AsPathSegment"
    }

    fn field_defs(&self) -> &'static [FieldDef] {
        AS_PATH_SEGMENT_FIELDS
    }

    fn field_mut(&mut self, name: &str) -> Slot<'_> {
        match name {
            "kind" => Slot::U8(&mut self.kind.0),
            "count" => Slot::U8(&mut self.count),
            "asns" => Slot::Seq(&mut self.asns),
            _ => Slot::Skip,
        }
    }

    fn field_ref(&self, name: &str) -> SlotRef<'_> {
        match name {
            "kind" => SlotRef::U8(self.kind.0),
            "count" => SlotRef::U8(self.count),
            "asns" => SlotRef::Seq(&self.asns),
            _ => SlotRef::Skip,
        }
    }
}

/// NEXT_HOP attribute value: the address bytes to the end of the attribute.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NexthopAttribute {
    pub next_hop: Vec<u8>,
}

const NEXTHOP_ATTRIBUTE_FIELDS: &[FieldDef] = &[FieldDef::annotated("next_hop", "lengthrest")];

impl Record for NexthopAttribute {
    fn record_name(&self) -> &'static str {
        "bgp.NexthopAttribute"
    }

    fn field_defs(&self) -> &'static [FieldDef] {
        NEXTHOP_ATTRIBUTE_FIELDS
    }

    fn field_mut(&mut self, name: &str) -> Slot<'_> {
        match name {
            "next_hop" => Slot::Bytes(&mut self.next_hop),
            _ => Slot::Skip,
        }
    }

    fn field_ref(&self, name: &str) -> SlotRef<'_> {
        match name {
            "next_hop" => SlotRef::Bytes(&self.next_hop),
            _ => SlotRef::Skip,
        }
    }
}

/// NLRI / withdrawn-route prefix: a bit length followed by just enough
/// octets to hold it.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PrefixSpec {
    pub length: u8,
    pub prefix: Vec<u8>,
}

const PREFIX_SPEC_FIELDS: &[FieldDef] = &[
    FieldDef::new("length"),
    FieldDef::annotated("prefix", "lengthfor"),
];

impl Record for PrefixSpec {
    fn record_name(&self) -> &'static str {
        "bgp.PrefixSpec"
    }

    fn field_defs(&self) -> &'static [FieldDef] {
        PREFIX_SPEC_FIELDS
    }

    fn field_mut(&mut self, name: &str) -> Slot<'_> {
        match name {
            "length" => Slot::U8(&mut self.length),
            "prefix" => Slot::Bytes(&mut self.prefix),
            _ => Slot::Skip,
        }
    }

    fn field_ref(&self, name: &str) -> SlotRef<'_> {
        match name {
            "length" => SlotRef::U8(self.length),
            "prefix" => SlotRef::Bytes(&self.prefix),
            _ => SlotRef::Skip,
        }
    }

    fn length_for(&self, field: &str) -> Option<u64> {
        match field {
            "prefix" => Some(u64::from(self.length).div_ceil(8)),
            _ => None,
        }
    }
}

/// NOTIFICATION body.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Notification {
    pub code: u8,
    pub subcode: u8,
    pub content: Vec<u8>,
}

const NOTIFICATION_FIELDS: &[FieldDef] = &[
    FieldDef::new("code"),
    FieldDef::new("subcode"),
    FieldDef::annotated("content", "lengthrest"),
];

impl Record for Notification {
    fn record_name(&self) -> &'static str {
        "bgp.Notification"
    }

    fn field_defs(&self) -> &'static [FieldDef] {
        NOTIFICATION_FIELDS
    }

    fn field_mut(&mut self, name: &str) -> Slot<'_> {
        match name {
            "code" => Slot::U8(&mut self.code),
            "subcode" => Slot::U8(&mut self.subcode),
            "content" => Slot::Bytes(&mut self.content),
            _ => Slot::Skip,
        }
    }

    fn field_ref(&self, name: &str) -> SlotRef<'_> {
        match name {
            "code" => SlotRef::U8(self.code),
            "subcode" => SlotRef::U8(self.subcode),
            "content" => SlotRef::Bytes(&self.content),
            _ => SlotRef::Skip,
        }
    }
}

/// KEEPALIVE carries nothing beyond the fixed header.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Keepalive;

const KEEPALIVE_FIELDS: &[FieldDef] = &[];

impl Record for Keepalive {
    fn record_name(&self) -> &'static str {
        "bgp.Keepalive"
    }

    fn field_defs(&self) -> &'static [FieldDef] {
        KEEPALIVE_FIELDS
    }

    fn field_mut(&mut self, _name: &str) -> Slot<'_> {
        Slot::Skip
    }

    fn field_ref(&self, _name: &str) -> SlotRef<'_> {
        SlotRef::Skip
    }
}

wire_record!(
    Message,
    Open,
    OptionalParameter,
    Update,
    PathAttribute,
    OriginAttribute,
    AsPath,
    AsPathSegment,
    NexthopAttribute,
    PrefixSpec,
    Notification,
    Keepalive,
);
