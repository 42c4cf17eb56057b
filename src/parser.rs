//! Parse field annotations into clauses using PEST.
//!
//! An annotation is the comma-separated clause list attached to one field
//! declaration, e.g. `"length=4b"` or `"when=kind-gt-0,lengthrest"`. The
//! grammar lives in `grammar.pest`; this module turns the parse tree into
//! [`Clause`] values. Errors carry the offending clause text so the schema
//! builder can name the field and record in its diagnostic.

use crate::schema::{Cmp, Unit, When, Width};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct AnnotationParser;

/// One parsed annotation clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Clause {
    /// `length=Nb` / `length=NB`
    Length(Width),
    /// `lengthfrom=Name`
    LengthFrom(String),
    /// `lengthfor`
    LengthFor,
    /// `lengthrest`
    Rest,
    /// `countfrom=Name`
    CountFrom(String),
    /// `when=Name-op-Literal`
    When(When),
}

/// Parse a full annotation string. On failure returns the offending clause
/// text (not the whole annotation) for the diagnostic.
pub(crate) fn parse_annotation(annotation: &str) -> Result<Vec<Clause>, String> {
    let mut pairs = AnnotationParser::parse(Rule::annotation, annotation)
        .map_err(|e| offending_clause(annotation, &e))?;
    let root = match pairs.next() {
        Some(p) => p,
        None => return Err(annotation.to_string()),
    };
    let mut clauses = Vec::new();
    for clause in root.into_inner() {
        if clause.as_rule() == Rule::clause {
            clauses.push(build_clause(clause)?);
        }
    }
    Ok(clauses)
}

fn build_clause(pair: Pair<'_, Rule>) -> Result<Clause, String> {
    let text = pair.as_str().to_string();
    let inner = match pair.into_inner().next() {
        Some(p) => p,
        None => return Err(text),
    };
    match inner.as_rule() {
        Rule::length_clause => {
            let mut parts = inner.into_inner();
            let count = next_number(&mut parts, &text)?;
            let unit = match parts.next().map(|p| p.as_str().to_string()) {
                Some(u) if u == "b" => Unit::Bits,
                Some(u) if u == "B" => Unit::Bytes,
                _ => return Err(text),
            };
            Ok(Clause::Length(Width { unit, count }))
        }
        Rule::lengthfrom_clause => {
            let field = next_ident(&mut inner.into_inner(), &text)?;
            Ok(Clause::LengthFrom(field))
        }
        Rule::lengthfor_clause => Ok(Clause::LengthFor),
        Rule::lengthrest_clause => Ok(Clause::Rest),
        Rule::countfrom_clause => {
            let field = next_ident(&mut inner.into_inner(), &text)?;
            Ok(Clause::CountFrom(field))
        }
        Rule::when_clause => {
            let mut parts = inner.into_inner();
            let field = next_ident(&mut parts, &text)?;
            let cmp = match parts.next().map(|p| p.as_str()) {
                Some("gt") => Cmp::Gt,
                _ => return Err(text),
            };
            let value = next_number(&mut parts, &text)?;
            Ok(Clause::When(When { field, cmp, value }))
        }
        _ => Err(text),
    }
}

fn next_number(parts: &mut pest::iterators::Pairs<'_, Rule>, text: &str) -> Result<u64, String> {
    parts
        .next()
        .and_then(|p| p.as_str().parse::<u64>().ok())
        .ok_or_else(|| text.to_string())
}

fn next_ident(parts: &mut pest::iterators::Pairs<'_, Rule>, text: &str) -> Result<String, String> {
    match parts.next() {
        Some(p) => Ok(p.as_str().to_string()),
        None => Err(text.to_string()),
    }
}

/// Locate the comma-separated segment containing the parse failure. A
/// failure reported at a segment boundary belongs to the following clause.
fn offending_clause(annotation: &str, err: &pest::error::Error<Rule>) -> String {
    let pos = match err.location {
        pest::error::InputLocation::Pos(p) => p,
        pest::error::InputLocation::Span((s, _)) => s,
    };
    let mut offset = 0;
    for segment in annotation.split(',') {
        let end = offset + segment.len();
        if pos < end {
            return segment.to_string();
        }
        offset = end + 1;
    }
    annotation.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_and_byte_widths() {
        assert_eq!(
            parse_annotation("length=4b").expect("parse"),
            vec![Clause::Length(Width {
                unit: Unit::Bits,
                count: 4
            })]
        );
        assert_eq!(
            parse_annotation("length=16B").expect("parse"),
            vec![Clause::Length(Width {
                unit: Unit::Bytes,
                count: 16
            })]
        );
    }

    #[test]
    fn length_sources() {
        assert_eq!(
            parse_annotation("lengthfrom=length").expect("parse"),
            vec![Clause::LengthFrom("length".to_string())]
        );
        assert_eq!(
            parse_annotation("lengthfor").expect("parse"),
            vec![Clause::LengthFor]
        );
        assert_eq!(
            parse_annotation("lengthrest").expect("parse"),
            vec![Clause::Rest]
        );
        assert_eq!(
            parse_annotation("countfrom=count").expect("parse"),
            vec![Clause::CountFrom("count".to_string())]
        );
    }

    #[test]
    fn when_predicate() {
        assert_eq!(
            parse_annotation("when=kind-gt-0").expect("parse"),
            vec![Clause::When(When {
                field: "kind".to_string(),
                cmp: Cmp::Gt,
                value: 0
            })]
        );
    }

    #[test]
    fn combined_clauses() {
        let clauses = parse_annotation("when=kind-gt-0,lengthrest").expect("parse");
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[1], Clause::Rest);
    }

    #[test]
    fn unknown_clause_is_named() {
        let err = parse_annotation("length=4b,size_for=value").expect_err("reject");
        assert_eq!(err, "size_for=value");
    }

    #[test]
    fn unknown_comparator_rejected() {
        assert!(parse_annotation("when=kind-lt-3").is_err());
    }

    #[test]
    fn missing_unit_rejected() {
        assert!(parse_annotation("length=4").is_err());
        assert!(parse_annotation("length=4x").is_err());
    }

    #[test]
    fn empty_annotation_rejected() {
        assert!(parse_annotation("").is_err());
    }
}
