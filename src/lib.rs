//! # wiregram — declarative binary packet codec
//!
//! A record type describes its wire layout as an ordered list of fields,
//! each optionally annotated with a bit/byte width, a cross-field length
//! reference, a conditional-presence predicate, or a "rest of region"
//! marker. The codec walks that schema in both directions:
//! [`decode`] populates a record from an octet buffer, [`encode`] produces
//! the octets back. Schemas are parsed once per record type and cached
//! process-wide.
//!
//! ## Annotation clauses
//!
//! - `length=4b` / `length=16B` — bit field of 4 bits / byte field of 16 bytes
//! - `lengthfrom=Name` — byte length from the earlier sibling field `Name`
//! - `lengthfor` — byte length computed by the record's [`Record::length_for`]
//! - `lengthrest` — consume the remainder of the current bounded region
//! - `countfrom=Name` — element count from the earlier sibling field `Name`
//! - `when=Name-gt-0` — present on the wire only when sibling `Name` > 0
//!
//! Multi-byte integers are big-endian; bit fields are packed MSB-first and
//! may span octet boundaries.
//!
//! ## Polymorphic bodies
//!
//! A [`Body`] field holds the next protocol layer; the concrete record type
//! is chosen at decode time by the parent's [`Record::instance_for`] from an
//! already-decoded discriminant (EtherType, IP protocol, BGP message type).
//! When no type is resolved inside a bounded region, the raw bytes are kept.
//!
//! ## Example
//!
//! ```
//! use wiregram::net::bgp::{Keepalive, Message, MessageType};
//!
//! let mut keepalive = vec![0xff; 16];
//! keepalive.extend_from_slice(&[0x00, 0x13, 0x04]);
//!
//! let mut msg = Message::default();
//! wiregram::decode(&keepalive, &mut msg).expect("decode");
//! assert_eq!(msg.kind, MessageType::KEEPALIVE);
//! assert!(msg.body.downcast_ref::<Keepalive>().is_some());
//!
//! let bytes = wiregram::encode(&msg).expect("encode");
//! assert_eq!(bytes, keepalive);
//! ```
//!
//! The [`net`] module ships ready-made records for Ethernet II, VLAN, IPv4,
//! TCP, and the BGP message family; they double as the reference for
//! implementing [`Record`] on your own types.

mod bits;
pub mod decode;
pub mod dump;
pub mod encode;
pub mod error;
pub mod net;
mod parser;
pub mod record;
pub mod schema;

pub use decode::decode;
pub use dump::dump;
pub use encode::encode;
pub use error::{Error, Result};
pub use record::{Body, Dispatch, Record, Sequence, Slot, SlotRef, Wire};
pub use schema::{schema_for, Cmp, Descriptor, FieldDef, Schema, Unit, When, Width};
