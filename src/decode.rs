//! Decode octet buffers into records by walking their schemas.
//!
//! The decoder owns a cursor stack and a bit accumulator. The outermost
//! cursor covers the whole input; a nested frame is pushed whenever a child
//! is bounded by a `lengthfrom`/`lengthfor` budget, a fixed byte width, a
//! `lengthrest` region, or a total-length field in the child's own schema,
//! and the parent cursor advances by exactly the bounded budget when the
//! frame pops. Bit fields share the accumulator across adjacent fields;
//! residue is discarded at the next byte-granular field.
//!
//! The decoder borrows the input and never retains it; decoded subtrees are
//! owned by the caller's target. It never panics on malformed input: data
//! problems come back as [`Error`] values with the record, field, and byte
//! offset where they arose, and fields decoded before the error remain
//! populated.

use crate::bits::{sign_extend, BitAccumulator};
use crate::error::{Error, Result};
use crate::record::{Body, Dispatch, Record, Sequence, Slot, SlotRef, Wire};
use crate::schema::{self, Descriptor, Schema, Unit, Width};
use byteorder::{BigEndian, ByteOrder};

const MAX_CURSORS: usize = 16;

const ROOT: &str = "root";

/// Byte range bounding one (sub)decode.
#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    start: usize,
    current: usize,
    end: usize,
    /// True when `end` came from a byte budget or a total-length field;
    /// an unresolved body may then be filled with the remaining raw bytes.
    bounded: bool,
}

/// Decode `data` into `target`. The target can be a record, a vector of
/// records (back-to-back messages), or a bare scalar.
pub fn decode<T: Wire + ?Sized>(data: &[u8], target: &mut T) -> Result<()> {
    let mut decoder = Decoder::new(data);
    match target.slot_mut() {
        Slot::Skip => Err(Error::PointerRequired { context: "target" }),
        slot => decoder.plain_into(slot, ROOT, ROOT),
    }
}

struct Decoder<'d> {
    data: &'d [u8],
    cursors: [Cursor; MAX_CURSORS],
    depth: usize,
    bits: BitAccumulator,
}

impl<'d> Decoder<'d> {
    fn new(data: &'d [u8]) -> Self {
        let mut cursors = [Cursor::default(); MAX_CURSORS];
        cursors[0] = Cursor {
            start: 0,
            current: 0,
            end: data.len(),
            bounded: false,
        };
        Decoder {
            data,
            cursors,
            depth: 0,
            bits: BitAccumulator::default(),
        }
    }

    fn top(&self) -> Cursor {
        self.cursors[self.depth]
    }

    fn top_mut(&mut self) -> &mut Cursor {
        &mut self.cursors[self.depth]
    }

    fn push(&mut self, frame: Cursor, record: &'static str, field: &'static str) -> Result<()> {
        if self.depth + 1 >= MAX_CURSORS {
            return Err(Error::PrematureEnd {
                record,
                field,
                offset: frame.current,
                end: frame.end,
            });
        }
        self.depth += 1;
        self.cursors[self.depth] = frame;
        Ok(())
    }

    fn pop(&mut self) -> Cursor {
        let frame = self.cursors[self.depth];
        self.depth -= 1;
        frame
    }

    fn range_check(&self, count: usize, record: &'static str, field: &'static str) -> Result<()> {
        let c = self.top();
        match c.current.checked_add(count) {
            Some(needed) if needed <= c.end => Ok(()),
            _ => Err(Error::PrematureEnd {
                record,
                field,
                offset: c.current,
                end: c.end,
            }),
        }
    }

    /// Refill the accumulator until `count` bits are held, then extract them.
    fn read_bits(&mut self, count: u32, record: &'static str, field: &'static str) -> Result<u64> {
        while self.bits.held() < count {
            if self.bits.held() + 8 > 64 {
                // another refill byte would push residue past the register
                return Err(Error::BitfieldOverflow { record, field });
            }
            let c = self.top();
            if c.current >= c.end {
                return Err(Error::PrematureEnd {
                    record,
                    field,
                    offset: c.current,
                    end: c.end,
                });
            }
            self.bits.load_byte(self.data[c.current]);
            self.top_mut().current += 1;
        }
        Ok(self.bits.take(count))
    }

    /// Big-endian unsigned read of `count` bytes (1..=8), byte-granular.
    fn read_uint(&mut self, count: usize, record: &'static str, field: &'static str) -> Result<u64> {
        self.bits.clear();
        self.range_check(count, record, field)?;
        let at = self.top().current;
        let value = BigEndian::read_uint(&self.data[at..at + count], count);
        self.top_mut().current += count;
        Ok(value)
    }

    /// Big-endian two's-complement read of `count` bytes (1..=8).
    fn read_int(&mut self, count: usize, record: &'static str, field: &'static str) -> Result<i64> {
        self.bits.clear();
        self.range_check(count, record, field)?;
        let at = self.top().current;
        let value = BigEndian::read_int(&self.data[at..at + count], count);
        self.top_mut().current += count;
        Ok(value)
    }

    /// Decode a record: either its own override, or a schema walk. A schema
    /// carrying a total-length field gets its own frame so the tightened end
    /// stays local to this record.
    fn record_into(&mut self, rec: &mut dyn Record) -> Result<()> {
        let (current, end) = {
            let c = self.top();
            // a hostile total-length field may have tightened the end below
            // the current offset; treat the region as empty then
            (c.current, c.end.max(c.current))
        };
        if let Some(outcome) = rec.decode_self(&self.data[current..end]) {
            outcome?;
            self.top_mut().current = end;
            return Ok(());
        }
        let schema = schema::schema_for(rec)?;
        if schema.has_total {
            self.push(
                Cursor {
                    start: current,
                    current,
                    end,
                    bounded: false,
                },
                schema.name,
                "",
            )?;
            let walked = self.fields_into(&schema, rec);
            let child = self.pop();
            walked?;
            self.top_mut().current = if child.bounded { child.end } else { child.current };
            Ok(())
        } else {
            self.fields_into(&schema, rec)
        }
    }

    fn fields_into(&mut self, schema: &Schema, rec: &mut dyn Record) -> Result<()> {
        for d in &schema.fields {
            self.field_into(schema, d, rec)?;
        }
        Ok(())
    }

    fn field_into(&mut self, schema: &Schema, d: &Descriptor, rec: &mut dyn Record) -> Result<()> {
        let record = schema.name;
        if matches!(rec.field_ref(d.name), SlotRef::Skip) {
            return Ok(());
        }
        if let Some(when) = &d.when {
            let sibling = uint_field(rec, &when.field).unwrap_or(0);
            if !when.eval(sibling) {
                return Ok(());
            }
        }
        if let Some(width) = d.width {
            self.sized_into(width, d, rec, record)?;
        } else if let Some(source) = &d.length_from {
            let budget = match uint_field(rec, source) {
                Some(v) => v,
                None => {
                    return Err(Error::TypeMismatch {
                        wire: "length reference",
                        record,
                        field: d.name,
                        offset: self.top().current,
                    })
                }
            };
            if budget > 0 {
                self.bounded_into(budget as usize, d, rec, record)?;
            }
        } else if d.length_for {
            let budget = match rec.length_for(d.name) {
                Some(v) => v,
                None => {
                    return Err(Error::MissingCapability {
                        interface: "LengthFor",
                        record,
                    })
                }
            };
            if budget > 0 {
                self.bounded_into(budget as usize, d, rec, record)?;
            }
        } else if d.rest {
            let c = self.top();
            self.bounded_into(c.end.saturating_sub(c.current), d, rec, record)?;
        } else {
            let count = self.element_count(d, rec, record)?;
            if matches!(rec.field_ref(d.name), SlotRef::Body(_)) {
                self.body_into(d, rec, record)?;
            } else {
                match rec.field_mut(d.name) {
                    Slot::Seq(s) => self.seq_into(s, count, record, d.name)?,
                    slot => self.plain_into(slot, record, d.name)?,
                }
            }
        }
        if d.total {
            self.tighten(d, rec);
        }
        Ok(())
    }

    /// After a total-length field is assigned, its value tightens the end of
    /// the record's frame (never widens it).
    fn tighten(&mut self, d: &Descriptor, rec: &dyn Record) {
        if let Some(value) = uint_field(rec, d.name) {
            let c = self.top_mut();
            let end = c.start.saturating_add(value as usize);
            if end < c.end {
                c.end = end;
            }
            c.bounded = true;
        }
    }

    fn element_count(
        &self,
        d: &Descriptor,
        rec: &dyn Record,
        record: &'static str,
    ) -> Result<Option<u64>> {
        match &d.count_from {
            Some(source) => match uint_field(rec, source) {
                Some(v) => Ok(Some(v)),
                None => Err(Error::TypeMismatch {
                    wire: "count reference",
                    record,
                    field: d.name,
                    offset: self.top().current,
                }),
            },
            None => Ok(None),
        }
    }

    /// Field with an explicit `length=` width.
    fn sized_into(
        &mut self,
        width: Width,
        d: &Descriptor,
        rec: &mut dyn Record,
        record: &'static str,
    ) -> Result<()> {
        match width.unit {
            Unit::Bits => {
                if width.count == 0 {
                    return Ok(());
                }
                if width.count > 64 || u64::from(self.bits.held()) + width.count > 64 {
                    return Err(Error::BitfieldOverflow {
                        record,
                        field: d.name,
                    });
                }
                let count = width.count as u32;
                let value = self.read_bits(count, record, d.name)?;
                let offset = self.top().current;
                match rec.field_mut(d.name) {
                    Slot::U8(v) => *v = value as u8,
                    Slot::U16(v) => *v = value as u16,
                    Slot::U32(v) => *v = value as u32,
                    Slot::U64(v) => *v = value,
                    Slot::I8(v) => *v = sign_extend(value, count) as i8,
                    Slot::I16(v) => *v = sign_extend(value, count) as i16,
                    Slot::I32(v) => *v = sign_extend(value, count) as i32,
                    Slot::I64(v) => *v = sign_extend(value, count),
                    Slot::Bool(v) => *v = value & 1 == 1,
                    slot => {
                        return Err(Error::TypeMismatch {
                            wire: slot.kind(),
                            record,
                            field: d.name,
                            offset,
                        })
                    }
                }
                Ok(())
            }
            Unit::Bytes => self.bounded_into(width.count as usize, d, rec, record),
        }
    }

    /// Field bounded to `budget` bytes: byte-array kinds copy the region,
    /// integers read it big-endian, and records, sequences, and bodies
    /// decode inside a pushed frame covering exactly the region.
    fn bounded_into(
        &mut self,
        budget: usize,
        d: &Descriptor,
        rec: &mut dyn Record,
        record: &'static str,
    ) -> Result<()> {
        self.bits.clear();
        self.range_check(budget, record, d.name)?;
        if matches!(
            rec.field_ref(d.name),
            SlotRef::Record(_) | SlotRef::Seq(_) | SlotRef::Body(_)
        ) {
            return self.bounded_nested(budget, d, rec, record);
        }
        let at = self.top().current;
        let region = &self.data[at..at + budget];
        let unsigned = if (1..=8).contains(&budget) {
            BigEndian::read_uint(region, budget)
        } else {
            0
        };
        let signed = if (1..=8).contains(&budget) {
            BigEndian::read_int(region, budget)
        } else {
            0
        };
        let oversized = Error::TypeMismatch {
            wire: "oversized integer",
            record,
            field: d.name,
            offset: at,
        };
        match rec.field_mut(d.name) {
            Slot::Skip => return Ok(()),
            Slot::Bytes(v) => {
                v.clear();
                v.extend_from_slice(region);
            }
            Slot::Text(s) => {
                *s = String::from_utf8_lossy(region).into_owned();
            }
            Slot::FixedBytes(buf) => {
                if buf.len() != budget {
                    return Err(Error::TypeMismatch {
                        wire: "fixed bytes",
                        record,
                        field: d.name,
                        offset: at,
                    });
                }
                buf.copy_from_slice(region);
            }
            _ if budget > 8 => return Err(oversized),
            Slot::U8(v) => *v = unsigned as u8,
            Slot::U16(v) => *v = unsigned as u16,
            Slot::U32(v) => *v = unsigned as u32,
            Slot::U64(v) => *v = unsigned,
            Slot::I8(v) => *v = signed as i8,
            Slot::I16(v) => *v = signed as i16,
            Slot::I32(v) => *v = signed as i32,
            Slot::I64(v) => *v = signed,
            Slot::Bool(v) => *v = unsigned & 1 == 1,
            Slot::Record(_) | Slot::Seq(_) | Slot::Body(_) => {}
        }
        self.top_mut().current += budget;
        Ok(())
    }

    /// Push a frame covering exactly `budget` bytes and decode the nested
    /// child inside it; the parent cursor advances by the budget regardless
    /// of how much the child consumed.
    fn bounded_nested(
        &mut self,
        budget: usize,
        d: &Descriptor,
        rec: &mut dyn Record,
        record: &'static str,
    ) -> Result<()> {
        let count = self.element_count(d, rec, record)?;
        let at = self.top().current;
        self.push(
            Cursor {
                start: at,
                current: at,
                end: at + budget,
                bounded: true,
            },
            record,
            d.name,
        )?;
        let walked = if matches!(rec.field_ref(d.name), SlotRef::Body(_)) {
            self.body_into(d, rec, record)
        } else {
            match rec.field_mut(d.name) {
                Slot::Record(r) => self.record_into(r),
                Slot::Seq(s) => self.seq_into(s, count, record, d.name),
                _ => Ok(()),
            }
        };
        self.pop();
        walked?;
        self.top_mut().current += budget;
        Ok(())
    }

    /// Resolve and decode a polymorphic body field.
    fn body_into(
        &mut self,
        d: &Descriptor,
        rec: &mut dyn Record,
        record: &'static str,
    ) -> Result<()> {
        match rec.instance_for(d.name) {
            Dispatch::Unsupported => Err(Error::MissingCapability {
                interface: "InstanceFor",
                record,
            }),
            Dispatch::Instance(instance) => {
                let offset = self.top().current;
                match rec.field_mut(d.name) {
                    Slot::Body(slot) => {
                        // assign before decoding so a failed body stays
                        // visible alongside the error
                        *slot = Body::Record(instance);
                        match slot {
                            Body::Record(r) => self.record_into(r.as_mut()),
                            _ => Ok(()),
                        }
                    }
                    other => Err(Error::TypeMismatch {
                        wire: other.kind(),
                        record,
                        field: d.name,
                        offset,
                    }),
                }
            }
            Dispatch::None => {
                let c = self.top();
                if c.bounded && c.end > c.current {
                    let raw = self.data[c.current..c.end].to_vec();
                    if let Slot::Body(slot) = rec.field_mut(d.name) {
                        *slot = Body::Raw(raw);
                    }
                    self.top_mut().current = c.end;
                }
                Ok(())
            }
        }
    }

    /// Decode a sequence: fixed arrays take exactly their capacity, counted
    /// sequences exactly `count` elements, and everything else runs to the
    /// end of the current frame.
    fn seq_into(
        &mut self,
        s: &mut dyn Sequence,
        count: Option<u64>,
        record: &'static str,
        field: &'static str,
    ) -> Result<()> {
        if let Some(n) = s.fixed_len() {
            for i in 0..n {
                let slot = s.slot_at(i);
                self.plain_into(slot, record, field)?;
            }
            return Ok(());
        }
        if let Some(n) = count {
            for _ in 0..n {
                let slot = s.grow_one();
                self.plain_into(slot, record, field)?;
            }
            return Ok(());
        }
        while self.top().current < self.top().end {
            let before = self.top().current;
            let slot = s.grow_one();
            self.plain_into(slot, record, field)?;
            if self.top().current == before {
                // zero-width element would never exhaust the region
                return Err(Error::TypeMismatch {
                    wire: "element",
                    record,
                    field,
                    offset: before,
                });
            }
        }
        Ok(())
    }

    /// Decode into a slot whose extent follows its own shape: fixed-width
    /// integers, single-bit booleans, fixed byte arrays, nested records,
    /// and sequences.
    fn plain_into(
        &mut self,
        slot: Slot<'_>,
        record: &'static str,
        field: &'static str,
    ) -> Result<()> {
        match slot {
            Slot::U8(v) => *v = self.read_uint(1, record, field)? as u8,
            Slot::U16(v) => *v = self.read_uint(2, record, field)? as u16,
            Slot::U32(v) => *v = self.read_uint(4, record, field)? as u32,
            Slot::U64(v) => *v = self.read_uint(8, record, field)?,
            Slot::I8(v) => *v = self.read_int(1, record, field)? as i8,
            Slot::I16(v) => *v = self.read_int(2, record, field)? as i16,
            Slot::I32(v) => *v = self.read_int(4, record, field)? as i32,
            Slot::I64(v) => *v = self.read_int(8, record, field)?,
            Slot::Bool(v) => *v = self.read_bits(1, record, field)? & 1 == 1,
            Slot::FixedBytes(buf) => {
                self.bits.clear();
                let count = buf.len();
                self.range_check(count, record, field)?;
                let at = self.top().current;
                buf.copy_from_slice(&self.data[at..at + count]);
                self.top_mut().current += count;
            }
            Slot::Record(r) => return self.record_into(r),
            Slot::Seq(s) => return self.seq_into(s, None, record, field),
            Slot::Skip => {}
            slot => {
                let offset = self.top().current;
                return Err(Error::TypeMismatch {
                    wire: slot.kind(),
                    record,
                    field,
                    offset,
                });
            }
        }
        Ok(())
    }
}

fn uint_field(rec: &dyn Record, name: &str) -> Option<u64> {
    rec.field_ref(name).as_u64()
}
