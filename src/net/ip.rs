//! IPv4 header.

use crate::net::tcp::Tcp;
use crate::record::{Body, Dispatch, Record, Slot, SlotRef};
use crate::schema::FieldDef;
use crate::wire_record;
use std::fmt;

/// IP protocol number selecting the transport layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IpProtocol(pub u8);

impl IpProtocol {
    pub const TCP: IpProtocol = IpProtocol(6);
    pub const UDP: IpProtocol = IpProtocol(17);
}

impl fmt::Display for IpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            IpProtocol::TCP => f.write_str("TCP"),
            IpProtocol::UDP => f.write_str("UDP"),
            IpProtocol(other) => write!(f, "Protocol(unknown:{})", other),
        }
    }
}

/// IPv4 fragmentation flags, a 3-bit field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ipv4Flags(pub u8);

impl Ipv4Flags {
    pub const MORE_FRAGMENTS: u8 = 1;
    pub const DONT_FRAGMENT: u8 = 2;
    pub const RESERVED: u8 = 4;
}

impl fmt::Display for Ipv4Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.0 & Self::RESERVED != 0 {
            names.push("Reserved");
        }
        if self.0 & Self::DONT_FRAGMENT != 0 {
            names.push("DFrag");
        }
        if self.0 & Self::MORE_FRAGMENTS != 0 {
            names.push("MFrag");
        }
        f.write_str(&names.join("|"))
    }
}

/// 16-bit checksum, printed in hex. Never verified or recomputed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checksum(pub u16);

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// IPv4 header; `length` is the total packet length and bounds the rest of
/// the packet, `options` spans the header words past the first five.
#[derive(Debug, Default)]
pub struct Ipv4 {
    pub version: u8,
    pub ihl: u8,
    pub dscp: u8,
    pub ecn: u8,
    pub length: u16,
    pub id: u16,
    pub flags: Ipv4Flags,
    pub fragment_offset: u16,
    pub ttl: u8,
    pub protocol: IpProtocol,
    pub checksum: Checksum,
    pub source: [u8; 4],
    pub dest: [u8; 4],
    pub options: Vec<u8>,
    pub body: Body,
}

const IPV4_FIELDS: &[FieldDef] = &[
    FieldDef::annotated("version", "length=4b"),
    FieldDef::annotated("ihl", "length=4b"),
    FieldDef::annotated("dscp", "length=6b"),
    FieldDef::annotated("ecn", "length=2b"),
    FieldDef::new("length").total_length(),
    FieldDef::new("id"),
    FieldDef::annotated("flags", "length=3b"),
    FieldDef::annotated("fragment_offset", "length=13b"),
    FieldDef::new("ttl"),
    FieldDef::new("protocol"),
    FieldDef::new("checksum"),
    FieldDef::annotated("source", "length=4B"),
    FieldDef::annotated("dest", "length=4B"),
    FieldDef::annotated("options", "lengthfor"),
    FieldDef::new("body"),
];

impl Record for Ipv4 {
    fn record_name(&self) -> &'static str {
        "Ipv4"
    }

    fn field_defs(&self) -> &'static [FieldDef] {
        IPV4_FIELDS
    }

    fn field_mut(&mut self, name: &str) -> Slot<'_> {
        match name {
            "version" => Slot::U8(&mut self.version),
            "ihl" => Slot::U8(&mut self.ihl),
            "dscp" => Slot::U8(&mut self.dscp),
            "ecn" => Slot::U8(&mut self.ecn),
            "length" => Slot::U16(&mut self.length),
            "id" => Slot::U16(&mut self.id),
            "flags" => Slot::U8(&mut self.flags.0),
            "fragment_offset" => Slot::U16(&mut self.fragment_offset),
            "ttl" => Slot::U8(&mut self.ttl),
            "protocol" => Slot::U8(&mut self.protocol.0),
            "checksum" => Slot::U16(&mut self.checksum.0),
            "source" => Slot::FixedBytes(&mut self.source),
            "dest" => Slot::FixedBytes(&mut self.dest),
            "options" => Slot::Bytes(&mut self.options),
            "body" => Slot::Body(&mut self.body),
            _ => Slot::Skip,
        }
    }

    fn field_ref(&self, name: &str) -> SlotRef<'_> {
        match name {
            "version" => SlotRef::U8(self.version),
            "ihl" => SlotRef::U8(self.ihl),
            "dscp" => SlotRef::U8(self.dscp),
            "ecn" => SlotRef::U8(self.ecn),
            "length" => SlotRef::U16(self.length),
            "id" => SlotRef::U16(self.id),
            "flags" => SlotRef::U8(self.flags.0),
            "fragment_offset" => SlotRef::U16(self.fragment_offset),
            "ttl" => SlotRef::U8(self.ttl),
            "protocol" => SlotRef::U8(self.protocol.0),
            "checksum" => SlotRef::U16(self.checksum.0),
            "source" => SlotRef::Bytes(&self.source),
            "dest" => SlotRef::Bytes(&self.dest),
            "options" => SlotRef::Bytes(&self.options),
            "body" => SlotRef::Body(&self.body),
            _ => SlotRef::Skip,
        }
    }

    fn instance_for(&self, _field: &str) -> Dispatch {
        match self.protocol {
            IpProtocol::TCP => Dispatch::Instance(Box::new(Tcp::default())),
            _ => Dispatch::None,
        }
    }

    fn length_for(&self, field: &str) -> Option<u64> {
        match field {
            "options" => Some(u64::from(self.ihl).saturating_sub(5) * 4),
            _ => None,
        }
    }
}

wire_record!(Ipv4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_join_with_pipes() {
        let flags = Ipv4Flags(Ipv4Flags::DONT_FRAGMENT | Ipv4Flags::MORE_FRAGMENTS);
        assert_eq!(flags.to_string(), "DFrag|MFrag");
        assert_eq!(Ipv4Flags(0).to_string(), "");
    }

    #[test]
    fn options_length_follows_header_words() {
        let mut ip = Ipv4 {
            ihl: 5,
            ..Ipv4::default()
        };
        assert_eq!(ip.length_for("options"), Some(0));
        ip.ihl = 8;
        assert_eq!(ip.length_for("options"), Some(12));
        assert_eq!(ip.length_for("other"), None);
    }

    #[test]
    fn checksum_displays_in_hex() {
        assert_eq!(Checksum(0xcaa2).to_string(), "0xcaa2");
    }
}
