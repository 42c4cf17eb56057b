//! Render a decoded record as an indented plain-text tree.
//!
//! Walks the record's schema and formats each field through its shared
//! slot, recursing into nested records, sequences, and resolved bodies.
//! Intended for debugging and examples; values print raw (integers in
//! decimal, byte arrays in hex, truncated past 16 bytes).

use crate::error::Result;
use crate::record::{Body, Record, SlotRef};
use crate::schema;
use std::fmt::Write as _;

/// Render `record` and its subtree.
pub fn dump(record: &dyn Record) -> Result<String> {
    let mut out = String::new();
    render_record(record, 0, &mut out)?;
    Ok(out)
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn render_record(rec: &dyn Record, depth: usize, out: &mut String) -> Result<()> {
    let schema = schema::schema_for(rec)?;
    indent(out, depth);
    let _ = writeln!(out, "{}", schema.name);
    for d in &schema.fields {
        render_field(rec, d.name, depth + 1, out)?;
    }
    Ok(())
}

fn render_field(rec: &dyn Record, name: &str, depth: usize, out: &mut String) -> Result<()> {
    match rec.field_ref(name) {
        SlotRef::U8(v) => scalar(out, depth, name, v),
        SlotRef::U16(v) => scalar(out, depth, name, v),
        SlotRef::U32(v) => scalar(out, depth, name, v),
        SlotRef::U64(v) => scalar(out, depth, name, v),
        SlotRef::I8(v) => scalar(out, depth, name, v),
        SlotRef::I16(v) => scalar(out, depth, name, v),
        SlotRef::I32(v) => scalar(out, depth, name, v),
        SlotRef::I64(v) => scalar(out, depth, name, v),
        SlotRef::Bool(v) => scalar(out, depth, name, v),
        SlotRef::Text(v) => {
            indent(out, depth);
            let _ = writeln!(out, "{}: {:?}", name, v);
        }
        SlotRef::Bytes(bytes) => {
            indent(out, depth);
            let _ = writeln!(out, "{}: {}", name, hex(bytes));
        }
        SlotRef::Record(r) => {
            indent(out, depth);
            let _ = writeln!(out, "{}:", name);
            render_record(r, depth + 1, out)?;
        }
        SlotRef::Seq(s) => {
            indent(out, depth);
            let _ = writeln!(out, "{}: [{}]", name, s.len());
            for i in 0..s.len() {
                match s.ref_at(i) {
                    SlotRef::Record(r) => render_record(r, depth + 1, out)?,
                    element => {
                        indent(out, depth + 1);
                        let _ = writeln!(out, "- {}", scalar_text(&element));
                    }
                }
            }
        }
        SlotRef::Body(body) => match body {
            Body::None => {
                indent(out, depth);
                let _ = writeln!(out, "{}: -", name);
            }
            Body::Raw(bytes) => {
                indent(out, depth);
                let _ = writeln!(out, "{}: raw {}", name, hex(bytes));
            }
            Body::Record(r) => {
                indent(out, depth);
                let _ = writeln!(out, "{}:", name);
                render_record(r.as_ref(), depth + 1, out)?;
            }
        },
        SlotRef::Skip => {}
    }
    Ok(())
}

fn scalar<T: std::fmt::Display>(out: &mut String, depth: usize, name: &str, value: T) {
    indent(out, depth);
    let _ = writeln!(out, "{}: {}", name, value);
}

fn scalar_text(slot: &SlotRef<'_>) -> String {
    match slot {
        SlotRef::U8(v) => v.to_string(),
        SlotRef::U16(v) => v.to_string(),
        SlotRef::U32(v) => v.to_string(),
        SlotRef::U64(v) => v.to_string(),
        SlotRef::I8(v) => v.to_string(),
        SlotRef::I16(v) => v.to_string(),
        SlotRef::I32(v) => v.to_string(),
        SlotRef::I64(v) => v.to_string(),
        SlotRef::Bool(v) => v.to_string(),
        SlotRef::Text(v) => format!("{:?}", v),
        SlotRef::Bytes(bytes) => hex(bytes),
        _ => "…".to_string(),
    }
}

fn hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(2 + bytes.len() * 2);
    s.push_str("0x");
    for b in bytes.iter().take(16) {
        let _ = write!(s, "{:02x}", b);
    }
    if bytes.len() > 16 {
        let _ = write!(s, "… ({} bytes)", bytes.len());
    }
    s
}
