//! Ethernet II framing and 802.1Q VLAN tags.

use crate::net::ip::Ipv4;
use crate::record::{Body, Dispatch, Record, Slot, SlotRef};
use crate::schema::FieldDef;
use crate::wire_record;
use std::fmt;

/// 48-bit hardware address, printed as contiguous hex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mac(pub [u8; 6]);

impl fmt::Display for Mac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// EtherType discriminant selecting the next layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EtherType(pub u16);

impl EtherType {
    pub const IPV4: EtherType = EtherType(0x0800);
    pub const VLAN: EtherType = EtherType(0x8100);
    pub const IPV6: EtherType = EtherType(0x86dd);
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            EtherType::IPV4 => f.write_str("IPv4"),
            EtherType::VLAN => f.write_str("VLAN"),
            EtherType::IPV6 => f.write_str("IPv6"),
            EtherType(other) => write!(f, "0x{:x}", other),
        }
    }
}

fn layer_for(kind: EtherType) -> Dispatch {
    match kind {
        EtherType::IPV4 => Dispatch::Instance(Box::new(Ipv4::default())),
        EtherType::VLAN => Dispatch::Instance(Box::new(Vlan::default())),
        _ => Dispatch::None,
    }
}

/// Ethernet II frame.
#[derive(Debug, Default)]
pub struct EthernetII {
    pub source: Mac,
    pub dest: Mac,
    pub kind: EtherType,
    pub body: Body,
}

const ETHERNET_FIELDS: &[FieldDef] = &[
    FieldDef::new("source"),
    FieldDef::new("dest"),
    FieldDef::new("kind"),
    FieldDef::new("body"),
];

impl Record for EthernetII {
    fn record_name(&self) -> &'static str {
        "EthernetII"
    }

    fn field_defs(&self) -> &'static [FieldDef] {
        ETHERNET_FIELDS
    }

    fn field_mut(&mut self, name: &str) -> Slot<'_> {
        match name {
            "source" => Slot::FixedBytes(&mut self.source.0),
            "dest" => Slot::FixedBytes(&mut self.dest.0),
            "kind" => Slot::U16(&mut self.kind.0),
            "body" => Slot::Body(&mut self.body),
            _ => Slot::Skip,
        }
    }

    fn field_ref(&self, name: &str) -> SlotRef<'_> {
        match name {
            "source" => SlotRef::Bytes(&self.source.0),
            "dest" => SlotRef::Bytes(&self.dest.0),
            "kind" => SlotRef::U16(self.kind.0),
            "body" => SlotRef::Body(&self.body),
            _ => SlotRef::Skip,
        }
    }

    fn instance_for(&self, _field: &str) -> Dispatch {
        layer_for(self.kind)
    }
}

/// 802.1Q tag: priority and DEI share the first octet pair with the VLAN id.
#[derive(Debug, Default)]
pub struct Vlan {
    pub priority: u8,
    pub dei: bool,
    pub id: u16,
    pub kind: EtherType,
    pub body: Body,
}

const VLAN_FIELDS: &[FieldDef] = &[
    FieldDef::annotated("priority", "length=3b"),
    FieldDef::new("dei"),
    FieldDef::annotated("id", "length=12b"),
    FieldDef::new("kind"),
    FieldDef::new("body"),
];

impl Record for Vlan {
    fn record_name(&self) -> &'static str {
        "Vlan"
    }

    fn field_defs(&self) -> &'static [FieldDef] {
        VLAN_FIELDS
    }

    fn field_mut(&mut self, name: &str) -> Slot<'_> {
        match name {
            "priority" => Slot::U8(&mut self.priority),
            "dei" => Slot::Bool(&mut self.dei),
            "id" => Slot::U16(&mut self.id),
            "kind" => Slot::U16(&mut self.kind.0),
            "body" => Slot::Body(&mut self.body),
            _ => Slot::Skip,
        }
    }

    fn field_ref(&self, name: &str) -> SlotRef<'_> {
        match name {
            "priority" => SlotRef::U8(self.priority),
            "dei" => SlotRef::Bool(self.dei),
            "id" => SlotRef::U16(self.id),
            "kind" => SlotRef::U16(self.kind.0),
            "body" => SlotRef::Body(&self.body),
            _ => SlotRef::Skip,
        }
    }

    fn instance_for(&self, _field: &str) -> Dispatch {
        layer_for(self.kind)
    }
}

wire_record!(EthernetII, Vlan);
