//! The record model: declared fields, by-name slot access, and the
//! capability hooks the codec calls back into.
//!
//! A record type implements [`Record`] once: it names itself, lists its
//! fields in wire order, and hands out [`Slot`]/[`SlotRef`] tagged variants
//! for each field. The codec never sees concrete field types; it dispatches
//! on the variants, the way the original walked reflected values.
//!
//! Three optional hooks extend the schema where annotations cannot reach:
//!
//! - [`Record::instance_for`] resolves a polymorphic body field to a fresh
//!   record of the concrete type, chosen from already-decoded siblings
//!   (EtherType, IPProtocol, BGP message type).
//! - [`Record::length_for`] computes a byte length from decoded siblings
//!   (e.g. TCP options from the data offset).
//! - [`Record::decode_self`] lets a record take over decoding of its whole
//!   bounded region for layouts the schema cannot express.

use crate::error::Result;
use crate::schema::FieldDef;
use std::any::Any;
use std::fmt;

/// A decodable/encodable record type.
pub trait Record: Any {
    /// Identifier used for schema memoization and error messages.
    fn record_name(&self) -> &'static str;

    /// Field declarations in wire order.
    fn field_defs(&self) -> &'static [FieldDef];

    /// Mutable slot for a declared field. Unknown names yield [`Slot::Skip`].
    fn field_mut(&mut self, name: &str) -> Slot<'_>;

    /// Shared slot for a declared field. Unknown names yield [`SlotRef::Skip`].
    fn field_ref(&self, name: &str) -> SlotRef<'_>;

    /// Resolve a polymorphic body field to a concrete record.
    fn instance_for(&self, _field: &str) -> Dispatch {
        Dispatch::Unsupported
    }

    /// Byte length for a `lengthfor` field, computed from decoded siblings.
    fn length_for(&self, _field: &str) -> Option<u64> {
        None
    }

    /// Take over decoding of this record from its bounded region. Returning
    /// `Some` consumes the whole region; `None` uses the schema.
    fn decode_self(&mut self, _data: &[u8]) -> Option<Result<()>> {
        None
    }
}

impl dyn Record {
    /// Downcast to a concrete record type.
    pub fn downcast_ref<T: Record>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref()
    }
}

/// Outcome of [`Record::instance_for`].
pub enum Dispatch {
    /// The record does not resolve body types at all.
    Unsupported,
    /// No concrete body for the current discriminant.
    None,
    /// Decode the body into this freshly allocated record.
    Instance(Box<dyn Record>),
}

/// A polymorphic body field: the concrete type is picked at decode time.
#[derive(Default)]
pub enum Body {
    /// Nothing decoded (or nothing to encode).
    #[default]
    None,
    /// A resolved, decoded record.
    Record(Box<dyn Record>),
    /// Remaining bytes of the bounded region when no type was resolved.
    Raw(Vec<u8>),
}

impl Body {
    pub fn is_none(&self) -> bool {
        matches!(self, Body::None)
    }

    pub fn as_record(&self) -> Option<&dyn Record> {
        match self {
            Body::Record(r) => Some(r.as_ref()),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&[u8]> {
        match self {
            Body::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Downcast the resolved record, if any.
    pub fn downcast_ref<T: Record>(&self) -> Option<&T> {
        self.as_record().and_then(|r| r.downcast_ref())
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::None => f.write_str("Body::None"),
            Body::Record(r) => write!(f, "Body::Record({})", r.record_name()),
            Body::Raw(bytes) => write!(f, "Body::Raw({} bytes)", bytes.len()),
        }
    }
}

/// Mutable view of one field, tagged by wire shape.
pub enum Slot<'a> {
    U8(&'a mut u8),
    U16(&'a mut u16),
    U32(&'a mut u32),
    U64(&'a mut u64),
    I8(&'a mut i8),
    I16(&'a mut i16),
    I32(&'a mut i32),
    I64(&'a mut i64),
    Bool(&'a mut bool),
    /// Variable-size byte array; length comes from the annotation.
    Bytes(&'a mut Vec<u8>),
    /// Fixed-size byte array; length is the array length.
    FixedBytes(&'a mut [u8]),
    /// UTF-8 text with an annotated byte length.
    Text(&'a mut String),
    /// Nested record, decoded recursively.
    Record(&'a mut dyn Record),
    /// Ordered sequence of records or scalars.
    Seq(&'a mut dyn Sequence),
    /// Polymorphic body resolved through [`Record::instance_for`].
    Body(&'a mut Body),
    /// Not settable; skipped on both decode and encode.
    Skip,
}

impl Slot<'_> {
    /// Wire-shape name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Slot::U8(_) => "u8",
            Slot::U16(_) => "u16",
            Slot::U32(_) => "u32",
            Slot::U64(_) => "u64",
            Slot::I8(_) => "i8",
            Slot::I16(_) => "i16",
            Slot::I32(_) => "i32",
            Slot::I64(_) => "i64",
            Slot::Bool(_) => "bool",
            Slot::Bytes(_) => "bytes",
            Slot::FixedBytes(_) => "fixed bytes",
            Slot::Text(_) => "text",
            Slot::Record(_) => "record",
            Slot::Seq(_) => "sequence",
            Slot::Body(_) => "body",
            Slot::Skip => "skip",
        }
    }
}

/// Shared view of one field, tagged by wire shape. Integers are copied.
#[derive(Clone, Copy)]
pub enum SlotRef<'a> {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Bool(bool),
    Bytes(&'a [u8]),
    Text(&'a str),
    Record(&'a dyn Record),
    Seq(&'a dyn Sequence),
    Body(&'a Body),
    Skip,
}

impl SlotRef<'_> {
    /// Unsigned value of an integer or boolean slot.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SlotRef::U8(v) => Some(u64::from(*v)),
            SlotRef::U16(v) => Some(u64::from(*v)),
            SlotRef::U32(v) => Some(u64::from(*v)),
            SlotRef::U64(v) => Some(*v),
            SlotRef::Bool(v) => Some(u64::from(*v)),
            _ => None,
        }
    }
}

/// An ordered sequence of elements: a growable `Vec<T>` or a fixed `[T; N]`.
pub trait Sequence {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Some(n)` for fixed-size arrays that decode exactly `n` elements.
    fn fixed_len(&self) -> Option<usize>;

    /// Append a default element and return its slot. Fixed-size sequences
    /// return [`Slot::Skip`].
    fn grow_one(&mut self) -> Slot<'_>;

    fn slot_at(&mut self, index: usize) -> Slot<'_>;

    fn ref_at(&self, index: usize) -> SlotRef<'_>;
}

impl<T: Wire + Default> Sequence for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn fixed_len(&self) -> Option<usize> {
        None
    }

    fn grow_one(&mut self) -> Slot<'_> {
        if self.capacity() == Vec::len(self) {
            let target = if self.capacity() < 8 {
                8
            } else {
                self.capacity() * 2
            };
            self.reserve(target - Vec::len(self));
        }
        self.push(T::default());
        let last = Vec::len(self) - 1;
        self[last].slot_mut()
    }

    fn slot_at(&mut self, index: usize) -> Slot<'_> {
        match self.get_mut(index) {
            Some(element) => element.slot_mut(),
            None => Slot::Skip,
        }
    }

    fn ref_at(&self, index: usize) -> SlotRef<'_> {
        match self.get(index) {
            Some(element) => element.slot_ref(),
            None => SlotRef::Skip,
        }
    }
}

impl<T: Wire + Default, const N: usize> Sequence for [T; N] {
    fn len(&self) -> usize {
        N
    }

    fn fixed_len(&self) -> Option<usize> {
        Some(N)
    }

    fn grow_one(&mut self) -> Slot<'_> {
        Slot::Skip
    }

    fn slot_at(&mut self, index: usize) -> Slot<'_> {
        match self.get_mut(index) {
            Some(element) => element.slot_mut(),
            None => Slot::Skip,
        }
    }

    fn ref_at(&self, index: usize) -> SlotRef<'_> {
        match self.get(index) {
            Some(element) => element.slot_ref(),
            None => SlotRef::Skip,
        }
    }
}

/// Anything that can be the root of a decode/encode, or an element of a
/// [`Sequence`]: scalars, records, and record vectors.
pub trait Wire {
    fn slot_mut(&mut self) -> Slot<'_>;
    fn slot_ref(&self) -> SlotRef<'_>;
}

macro_rules! impl_wire_scalar {
    ($($t:ty => $variant:ident),+ $(,)?) => {$(
        impl Wire for $t {
            fn slot_mut(&mut self) -> Slot<'_> {
                Slot::$variant(self)
            }
            fn slot_ref(&self) -> SlotRef<'_> {
                SlotRef::$variant(*self)
            }
        }
    )+};
}

impl_wire_scalar!(
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    bool => Bool,
);

/// A vector of wire elements is itself a root target: decoding consumes
/// back-to-back elements until the input runs out.
impl<T: Wire + Default> Wire for Vec<T> {
    fn slot_mut(&mut self) -> Slot<'_> {
        Slot::Seq(self)
    }

    fn slot_ref(&self) -> SlotRef<'_> {
        SlotRef::Seq(self)
    }
}

/// Implement [`Wire`] for record types so they can be decode/encode roots
/// and sequence elements. Requires the record type to be `Default`
/// (sequences grow by appending defaults).
#[macro_export]
macro_rules! wire_record {
    ($($t:ty),+ $(,)?) => {$(
        impl $crate::Wire for $t {
            fn slot_mut(&mut self) -> $crate::Slot<'_> {
                $crate::Slot::Record(self)
            }
            fn slot_ref(&self) -> $crate::SlotRef<'_> {
                $crate::SlotRef::Record(self)
            }
        }
    )+};
}
