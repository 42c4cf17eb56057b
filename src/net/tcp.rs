//! TCP segment header.

use crate::net::bgp::Message;
use crate::net::ip::Checksum;
use crate::record::{Body, Dispatch, Record, Slot, SlotRef};
use crate::schema::FieldDef;
use crate::wire_record;
use std::fmt;

/// Transport port; well-known values get named constants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Port(pub u16);

impl Port {
    pub const BGP: Port = Port(179);
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// TCP flags, a 12-bit field alongside the 4-bit data offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcpFlags(pub u16);

impl TcpFlags {
    pub const FIN: u16 = 1 << 0;
    pub const SYN: u16 = 1 << 1;
    pub const RST: u16 = 1 << 2;
    pub const PSH: u16 = 1 << 3;
    pub const ACK: u16 = 1 << 4;
    pub const URG: u16 = 1 << 5;
    pub const ECE: u16 = 1 << 6;
    pub const CWR: u16 = 1 << 7;
    pub const NS: u16 = 1 << 8;
}

impl fmt::Display for TcpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(u16, &str); 9] = [
            (TcpFlags::NS, "NS"),
            (TcpFlags::CWR, "CWR"),
            (TcpFlags::ECE, "ECE"),
            (TcpFlags::URG, "URG"),
            (TcpFlags::ACK, "ACK"),
            (TcpFlags::PSH, "PSH"),
            (TcpFlags::RST, "RST"),
            (TcpFlags::SYN, "SYN"),
            (TcpFlags::FIN, "FIN"),
        ];
        let mut names = Vec::new();
        for (bit, name) in NAMES {
            if self.0 & bit != 0 {
                names.push(name);
            }
        }
        f.write_str(&names.join("|"))
    }
}

/// TCP header; `options` spans the header words past the first five, the
/// body is resolved from the destination port.
#[derive(Debug, Default)]
pub struct Tcp {
    pub source: Port,
    pub dest: Port,
    pub sequence: u32,
    pub ack: u32,
    pub data_offset: u8,
    pub flags: TcpFlags,
    pub window_size: u16,
    pub checksum: Checksum,
    pub urgent_pointer: u16,
    pub options: Vec<u8>,
    pub body: Body,
}

const TCP_FIELDS: &[FieldDef] = &[
    FieldDef::new("source"),
    FieldDef::new("dest"),
    FieldDef::new("sequence"),
    FieldDef::new("ack"),
    FieldDef::annotated("data_offset", "length=4b"),
    FieldDef::annotated("flags", "length=12b"),
    FieldDef::new("window_size"),
    FieldDef::new("checksum"),
    FieldDef::new("urgent_pointer"),
    FieldDef::annotated("options", "lengthfor"),
    FieldDef::new("body"),
];

impl Record for Tcp {
    fn record_name(&self) -> &'static str {
        "Tcp"
    }

    fn field_defs(&self) -> &'static [FieldDef] {
        TCP_FIELDS
    }

    fn field_mut(&mut self, name: &str) -> Slot<'_> {
        match name {
            "source" => Slot::U16(&mut self.source.0),
            "dest" => Slot::U16(&mut self.dest.0),
            "sequence" => Slot::U32(&mut self.sequence),
            "ack" => Slot::U32(&mut self.ack),
            "data_offset" => Slot::U8(&mut self.data_offset),
            "flags" => Slot::U16(&mut self.flags.0),
            "window_size" => Slot::U16(&mut self.window_size),
            "checksum" => Slot::U16(&mut self.checksum.0),
            "urgent_pointer" => Slot::U16(&mut self.urgent_pointer),
            "options" => Slot::Bytes(&mut self.options),
            "body" => Slot::Body(&mut self.body),
            _ => Slot::Skip,
        }
    }

    fn field_ref(&self, name: &str) -> SlotRef<'_> {
        match name {
            "source" => SlotRef::U16(self.source.0),
            "dest" => SlotRef::U16(self.dest.0),
            "sequence" => SlotRef::U32(self.sequence),
            "ack" => SlotRef::U32(self.ack),
            "data_offset" => SlotRef::U8(self.data_offset),
            "flags" => SlotRef::U16(self.flags.0),
            "window_size" => SlotRef::U16(self.window_size),
            "checksum" => SlotRef::U16(self.checksum.0),
            "urgent_pointer" => SlotRef::U16(self.urgent_pointer),
            "options" => SlotRef::Bytes(&self.options),
            "body" => SlotRef::Body(&self.body),
            _ => SlotRef::Skip,
        }
    }

    fn instance_for(&self, _field: &str) -> Dispatch {
        match self.dest {
            Port::BGP => Dispatch::Instance(Box::new(Message::default())),
            _ => Dispatch::None,
        }
    }

    fn length_for(&self, field: &str) -> Option<u64> {
        match field {
            "options" => Some(u64::from(self.data_offset).saturating_sub(5) * 4),
            _ => None,
        }
    }
}

wire_record!(Tcp);
