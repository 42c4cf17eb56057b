//! Encode records back to octets by walking their schemas.
//!
//! The encoder appends to a single output buffer. Fixed-width integers go
//! through a 64-byte scratch area; bit fields are staged in the accumulator
//! and flushed a whole byte at a time, MSB-first. Length fields are written
//! as-is: the caller populates them before encoding, nothing is recomputed.
//!
//! Staged bits must be byte-aligned whenever a byte-granular field is
//! written and when encoding finishes; a schema that leaves residue gets
//! [`Error::ResidualBits`] rather than silently dropped bits.

use crate::bits::BitAccumulator;
use crate::error::{Error, Result};
use crate::record::{Body, Record, SlotRef, Wire};
use crate::schema::{self, Descriptor, Unit, Width};
use byteorder::{BigEndian, ByteOrder};

const ROOT: &str = "root";

/// Encode `value` to its wire form. Never partial: returns the whole buffer
/// or an error.
pub fn encode<T: Wire + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new();
    encoder.plain_out(value.slot_ref(), ROOT, ROOT)?;
    if !encoder.bits.is_empty() {
        return Err(Error::ResidualBits {
            record: ROOT,
            held: encoder.bits.held(),
        });
    }
    Ok(encoder.out)
}

struct Encoder {
    out: Vec<u8>,
    scratch: [u8; 64],
    bits: BitAccumulator,
}

impl Encoder {
    fn new() -> Self {
        Encoder {
            out: Vec::new(),
            scratch: [0u8; 64],
            bits: BitAccumulator::default(),
        }
    }

    /// Byte-granular writes require an empty accumulator.
    fn byte_boundary(&self, record: &'static str) -> Result<()> {
        if self.bits.is_empty() {
            Ok(())
        } else {
            Err(Error::ResidualBits {
                record,
                held: self.bits.held(),
            })
        }
    }

    fn put(&mut self, count: usize) {
        let staged = &self.scratch[..count];
        self.out.extend_from_slice(staged);
    }

    fn record_out(&mut self, rec: &dyn Record) -> Result<()> {
        let schema = schema::schema_for(rec)?;
        for d in &schema.fields {
            self.field_out(d, rec, schema.name)?;
        }
        Ok(())
    }

    fn field_out(&mut self, d: &Descriptor, rec: &dyn Record, record: &'static str) -> Result<()> {
        if let Some(when) = &d.when {
            let sibling = rec.field_ref(&when.field).as_u64().unwrap_or(0);
            if !when.eval(sibling) {
                return Ok(());
            }
        }
        let slot = rec.field_ref(d.name);
        if matches!(slot, SlotRef::Skip) {
            return Ok(());
        }
        if let Some(width) = d.width {
            return self.sized_out(width, slot, record, d.name);
        }
        self.plain_out(slot, record, d.name)
    }

    /// Field with an explicit `length=` width: bit fields stage into the
    /// accumulator, byte-width integers stage as whole octets, byte arrays
    /// must match the declared width exactly.
    fn sized_out(
        &mut self,
        width: Width,
        slot: SlotRef<'_>,
        record: &'static str,
        field: &'static str,
    ) -> Result<()> {
        match width.unit {
            Unit::Bits => {
                if width.count == 0 {
                    return Ok(());
                }
                if width.count > 64 || u64::from(self.bits.held()) + width.count > 64 {
                    return Err(Error::BitfieldOverflow { record, field });
                }
                let value = match raw_bits(&slot) {
                    Some(v) => v,
                    None => {
                        return Err(Error::TypeMismatch {
                            wire: "bit field",
                            record,
                            field,
                            offset: self.out.len(),
                        })
                    }
                };
                self.bits.shift_in(value, width.count as u32);
                self.bits.drain_into(&mut self.out);
                Ok(())
            }
            Unit::Bytes => match slot {
                SlotRef::Bytes(bytes) => self.exact_bytes(bytes, width.count, record, field),
                SlotRef::Text(text) => self.exact_bytes(text.as_bytes(), width.count, record, field),
                SlotRef::Record(r) => self.record_out(r),
                SlotRef::Seq(_) | SlotRef::Body(_) => self.plain_out(slot, record, field),
                SlotRef::Skip => Ok(()),
                _ => {
                    // integer with a byte width stages through the
                    // accumulator so it composes with adjacent bit fields
                    let bit_count = width.count.saturating_mul(8);
                    if width.count > 8 || u64::from(self.bits.held()) + bit_count > 64 {
                        return Err(Error::BitfieldOverflow { record, field });
                    }
                    let value = match raw_bits(&slot) {
                        Some(v) => v,
                        None => {
                            return Err(Error::TypeMismatch {
                                wire: "sized integer",
                                record,
                                field,
                                offset: self.out.len(),
                            })
                        }
                    };
                    self.bits.shift_in(value, bit_count as u32);
                    self.bits.drain_into(&mut self.out);
                    Ok(())
                }
            },
        }
    }

    fn exact_bytes(
        &mut self,
        bytes: &[u8],
        count: u64,
        record: &'static str,
        field: &'static str,
    ) -> Result<()> {
        self.byte_boundary(record)?;
        if bytes.len() as u64 != count {
            return Err(Error::TypeMismatch {
                wire: "byte array",
                record,
                field,
                offset: self.out.len(),
            });
        }
        self.out.extend_from_slice(bytes);
        Ok(())
    }

    /// Encode a slot by its own shape: fixed-width big-endian integers,
    /// single-bit booleans, byte arrays as-is, records and sequences
    /// recursively, bodies through their resolved form.
    fn plain_out(
        &mut self,
        slot: SlotRef<'_>,
        record: &'static str,
        field: &'static str,
    ) -> Result<()> {
        match slot {
            SlotRef::U8(v) => {
                self.byte_boundary(record)?;
                self.out.push(v);
            }
            SlotRef::U16(v) => {
                self.byte_boundary(record)?;
                BigEndian::write_u16(&mut self.scratch[..2], v);
                self.put(2);
            }
            SlotRef::U32(v) => {
                self.byte_boundary(record)?;
                BigEndian::write_u32(&mut self.scratch[..4], v);
                self.put(4);
            }
            SlotRef::U64(v) => {
                self.byte_boundary(record)?;
                BigEndian::write_u64(&mut self.scratch[..8], v);
                self.put(8);
            }
            SlotRef::I8(v) => {
                self.byte_boundary(record)?;
                self.out.push(v as u8);
            }
            SlotRef::I16(v) => {
                self.byte_boundary(record)?;
                BigEndian::write_i16(&mut self.scratch[..2], v);
                self.put(2);
            }
            SlotRef::I32(v) => {
                self.byte_boundary(record)?;
                BigEndian::write_i32(&mut self.scratch[..4], v);
                self.put(4);
            }
            SlotRef::I64(v) => {
                self.byte_boundary(record)?;
                BigEndian::write_i64(&mut self.scratch[..8], v);
                self.put(8);
            }
            SlotRef::Bool(v) => {
                self.bits.shift_in(u64::from(v), 1);
                self.bits.drain_into(&mut self.out);
            }
            SlotRef::Bytes(bytes) => {
                self.byte_boundary(record)?;
                self.out.extend_from_slice(bytes);
            }
            SlotRef::Text(text) => {
                self.byte_boundary(record)?;
                self.out.extend_from_slice(text.as_bytes());
            }
            SlotRef::Record(r) => return self.record_out(r),
            SlotRef::Seq(s) => {
                for i in 0..s.len() {
                    self.plain_out(s.ref_at(i), record, field)?;
                }
            }
            SlotRef::Body(body) => match body {
                Body::None => {}
                Body::Raw(bytes) => {
                    self.byte_boundary(record)?;
                    self.out.extend_from_slice(bytes);
                }
                Body::Record(r) => return self.record_out(r.as_ref()),
            },
            SlotRef::Skip => {}
        }
        Ok(())
    }
}

/// Low bits of an integer or boolean slot for staging, two's complement for
/// signed values.
fn raw_bits(slot: &SlotRef<'_>) -> Option<u64> {
    match slot {
        SlotRef::I8(v) => Some(i64::from(*v) as u64),
        SlotRef::I16(v) => Some(i64::from(*v) as u64),
        SlotRef::I32(v) => Some(i64::from(*v) as u64),
        SlotRef::I64(v) => Some(*v as u64),
        other => other.as_u64(),
    }
}
