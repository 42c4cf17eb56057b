//! Field descriptors and the process-wide schema cache.
//!
//! A record declares its wire layout as an ordered list of [`FieldDef`]s
//! (declaration order is wire order). On first use the declarations are
//! parsed into a [`Schema`] of [`Descriptor`]s and published in a shared
//! cache keyed by record name; later decodes and encodes of the same record
//! type reuse the published schema. Cached schemas are immutable.

use crate::error::{Error, Result};
use crate::parser::{self, Clause};
use crate::record::Record;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Width unit of a `length=` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Bits,
    Bytes,
}

/// Fixed width of a field: `4b` is four bits, `16B` is sixteen bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Width {
    pub unit: Unit,
    pub count: u64,
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            Unit::Bits => write!(f, "{}b", self.count),
            Unit::Bytes => write!(f, "{}B", self.count),
        }
    }
}

/// Comparator of a `when=` predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Gt,
}

/// Conditional-presence predicate: the field is on the wire only when
/// `sibling cmp literal` holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct When {
    pub field: String,
    pub cmp: Cmp,
    pub value: u64,
}

impl When {
    pub(crate) fn eval(&self, sibling: u64) -> bool {
        match self.cmp {
            Cmp::Gt => sibling > self.value,
        }
    }
}

/// One field as declared by a record: the schema source form.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub annotation: &'static str,
    pub total: bool,
}

impl FieldDef {
    /// A field with no annotation; width follows the slot type.
    pub const fn new(name: &'static str) -> Self {
        FieldDef {
            name,
            annotation: "",
            total: false,
        }
    }

    /// A field carrying an annotation string.
    pub const fn annotated(name: &'static str, annotation: &'static str) -> Self {
        FieldDef {
            name,
            annotation,
            total: false,
        }
    }

    /// Mark this field as the total message length: after decode its value
    /// tightens the end of the record's bounded region.
    pub const fn total_length(mut self) -> Self {
        self.total = true;
        self
    }
}

/// Parsed, cached form of one field's annotations.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub name: &'static str,
    pub width: Option<Width>,
    pub length_from: Option<String>,
    pub count_from: Option<String>,
    pub length_for: bool,
    pub rest: bool,
    pub total: bool,
    pub when: Option<When>,
}

impl Descriptor {
    fn plain(name: &'static str) -> Self {
        Descriptor {
            name,
            width: None,
            length_from: None,
            count_from: None,
            length_for: false,
            rest: false,
            total: false,
            when: None,
        }
    }

    /// True when the field's extent depends on a length source rather than
    /// its slot type.
    fn consumes_by_length(&self) -> bool {
        self.length_from.is_some() || self.length_for || self.rest
    }
}

/// Parsed layout of one record type.
#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub fields: Vec<Descriptor>,
    pub(crate) has_total: bool,
}

static SCHEMAS: OnceLock<RwLock<HashMap<&'static str, Arc<Schema>>>> = OnceLock::new();

fn cache() -> &'static RwLock<HashMap<&'static str, Arc<Schema>>> {
    SCHEMAS.get_or_init(|| RwLock::new(HashMap::new()))
}

fn read_cache() -> RwLockReadGuard<'static, HashMap<&'static str, Arc<Schema>>> {
    match cache().read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_cache() -> RwLockWriteGuard<'static, HashMap<&'static str, Arc<Schema>>> {
    match cache().write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Schema for a record, built on first encounter and memoized. Concurrent
/// first-touch may build twice; the first published schema wins.
pub fn schema_for(record: &dyn Record) -> Result<Arc<Schema>> {
    let name = record.record_name();
    if let Some(schema) = read_cache().get(name) {
        return Ok(Arc::clone(schema));
    }
    let built = Arc::new(build_schema(name, record.field_defs())?);
    let mut guard = write_cache();
    let published = guard.entry(name).or_insert(built);
    Ok(Arc::clone(published))
}

fn build_schema(name: &'static str, defs: &[FieldDef]) -> Result<Schema> {
    let mut fields: Vec<Descriptor> = Vec::with_capacity(defs.len());
    let mut has_total = false;
    for def in defs {
        let mut d = Descriptor::plain(def.name);
        d.total = def.total;
        if !def.annotation.is_empty() {
            let clauses =
                parser::parse_annotation(def.annotation).map_err(|clause| Error::AnnotationParse {
                    clause,
                    record: name,
                    field: def.name,
                })?;
            for clause in clauses {
                apply_clause(&mut d, clause, name, def.name, def.annotation)?;
            }
        }
        check_references(&d, &fields, name)?;
        if d.total {
            if has_total || fields.iter().any(Descriptor::consumes_by_length) {
                return Err(Error::AnnotationParse {
                    clause: "total length must precede length-driven fields".to_string(),
                    record: name,
                    field: def.name,
                });
            }
            has_total = true;
        }
        fields.push(d);
    }
    Ok(Schema {
        name,
        fields,
        has_total,
    })
}

fn apply_clause(
    d: &mut Descriptor,
    clause: Clause,
    record: &'static str,
    field: &'static str,
    annotation: &'static str,
) -> Result<()> {
    let conflict = || Error::AnnotationParse {
        clause: annotation.to_string(),
        record,
        field,
    };
    match clause {
        Clause::Length(width) => {
            if d.width.is_some() || d.consumes_by_length() {
                return Err(conflict());
            }
            d.width = Some(width);
        }
        Clause::LengthFrom(source) => {
            if d.width.is_some() || d.consumes_by_length() {
                return Err(conflict());
            }
            d.length_from = Some(source);
        }
        Clause::LengthFor => {
            if d.width.is_some() || d.consumes_by_length() {
                return Err(conflict());
            }
            d.length_for = true;
        }
        Clause::Rest => {
            if d.width.is_some() || d.consumes_by_length() || d.count_from.is_some() {
                return Err(conflict());
            }
            d.rest = true;
        }
        Clause::CountFrom(source) => {
            if d.count_from.is_some() || d.rest {
                return Err(conflict());
            }
            d.count_from = Some(source);
        }
        Clause::When(when) => {
            if d.when.is_some() {
                return Err(conflict());
            }
            d.when = Some(when);
        }
    }
    Ok(())
}

/// Cross-field references may only name preceding fields of the same record.
fn check_references(d: &Descriptor, preceding: &[Descriptor], record: &'static str) -> Result<()> {
    let referenced = [
        d.length_from.as_deref(),
        d.count_from.as_deref(),
        d.when.as_ref().map(|w| w.field.as_str()),
    ];
    for name in referenced.into_iter().flatten() {
        if !preceding.iter().any(|p| p.name == name) {
            return Err(Error::AnnotationParse {
                clause: format!("reference to {} (not a preceding field)", name),
                record,
                field: d.name,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fields_have_no_width() {
        let defs = [FieldDef::new("a"), FieldDef::new("b")];
        let schema = build_schema("t", &defs).expect("build");
        assert_eq!(schema.fields.len(), 2);
        assert!(schema.fields[0].width.is_none());
        assert!(!schema.has_total);
    }

    #[test]
    fn annotations_populate_descriptors() {
        let defs = [
            FieldDef::annotated("version", "length=4b"),
            FieldDef::annotated("header_len", "length=4b"),
            FieldDef::annotated("options", "lengthfor"),
            FieldDef::annotated("payload", "lengthrest"),
        ];
        let schema = build_schema("header", &defs).expect("build");
        assert_eq!(
            schema.fields[0].width,
            Some(Width {
                unit: Unit::Bits,
                count: 4
            })
        );
        assert!(schema.fields[2].length_for);
        assert!(schema.fields[3].rest);
    }

    #[test]
    fn conflicting_length_sources_rejected() {
        let defs = [
            FieldDef::new("len"),
            FieldDef::annotated("data", "length=4B,lengthfrom=len"),
        ];
        let err = build_schema("t", &defs).expect_err("conflict");
        assert!(matches!(err, Error::AnnotationParse { .. }));
    }

    #[test]
    fn forward_reference_rejected() {
        let defs = [
            FieldDef::annotated("data", "lengthfrom=len"),
            FieldDef::new("len"),
        ];
        assert!(build_schema("t", &defs).is_err());
    }

    #[test]
    fn when_must_name_preceding_field() {
        let defs = [
            FieldDef::new("kind"),
            FieldDef::annotated("extra", "when=kind-gt-0"),
        ];
        assert!(build_schema("t", &defs).is_ok());
        let bad = [FieldDef::annotated("extra", "when=kind-gt-0")];
        assert!(build_schema("t", &bad).is_err());
    }

    #[test]
    fn total_after_length_driven_field_rejected() {
        let defs = [
            FieldDef::new("n"),
            FieldDef::annotated("head", "lengthfrom=n"),
            FieldDef::new("length").total_length(),
        ];
        assert!(build_schema("t", &defs).is_err());
    }

    #[test]
    fn unknown_clause_names_record_and_field() {
        let defs = [FieldDef::annotated("data", "sizefor=other")];
        match build_schema("pkt", &defs) {
            Err(Error::AnnotationParse {
                clause,
                record,
                field,
            }) => {
                assert_eq!(clause, "sizefor=other");
                assert_eq!(record, "pkt");
                assert_eq!(field, "data");
            }
            other => panic!("expected annotation error, got {:?}", other),
        }
    }

    #[test]
    fn when_predicate_is_sibling_gt_literal() {
        let w = When {
            field: "n".to_string(),
            cmp: Cmp::Gt,
            value: 3,
        };
        assert!(w.eval(4));
        assert!(!w.eval(3));
    }
}
