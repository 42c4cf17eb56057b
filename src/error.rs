//! Error surface of the codec.
//!
//! Schema errors (`AnnotationParse`, `MissingCapability`) are raised at the
//! first encounter of a record type and abort decoding/encoding for that
//! type. Data errors (`PrematureEnd`, `BitfieldOverflow`, `TypeMismatch`)
//! carry the record, field, and byte offset where they arose; fields decoded
//! before the error remain populated on the target.

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The decode target cannot accept a value (no settable slot).
    #[error("cannot decode into {context}: target is not settable")]
    PointerRequired { context: &'static str },

    /// The wire shape and the field's slot disagree.
    #[error("cannot decode {wire} into {record}.{field} at offset {offset}")]
    TypeMismatch {
        wire: &'static str,
        record: &'static str,
        field: &'static str,
        offset: usize,
    },

    /// A bit field does not fit the 64-bit accumulator.
    #[error("bit field {record}.{field} overflows the 64-bit accumulator")]
    BitfieldOverflow {
        record: &'static str,
        field: &'static str,
    },

    /// Data ran out before the field did.
    #[error("premature end of data for {record}.{field}: offset {offset}, end {end}")]
    PrematureEnd {
        record: &'static str,
        field: &'static str,
        offset: usize,
        end: usize,
    },

    /// A field annotation failed to parse, or the schema is contradictory.
    #[error("bad annotation clause ({clause}) on {record}.{field}")]
    AnnotationParse {
        clause: String,
        record: &'static str,
        field: &'static str,
    },

    /// A field requires a capability hook the record does not provide.
    #[error("{record} does not implement {interface}")]
    MissingCapability {
        interface: &'static str,
        record: &'static str,
    },

    /// Staged bits were not byte-aligned where the schema requires it.
    #[error("{record} left {held} bits staged at a byte boundary")]
    ResidualBits { record: &'static str, held: u32 },
}
