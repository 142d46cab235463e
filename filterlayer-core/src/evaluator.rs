//! In-memory evaluation of predicate expressions against BSON documents.
//!
//! Used by the predicate compiler to filter materialized collections and by the
//! in-memory store to answer queries.

use std::{cmp::Ordering, collections::HashMap};

use bson::{Bson, Document, datetime::DateTime};
use chrono::Utc;

use crate::{
    error::{DataLayerError, DataLayerResult},
    query::{Expr, FieldOp, QueryVisitor},
};

/// Reads an RFC 3339 string, the serde form of a chrono timestamp, at BSON millisecond precision.
fn parse_timestamp(value: &str) -> Option<DateTime> {
    chrono::DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| DateTime::from_chrono(parsed.with_timezone(&Utc)))
}

/// Comparable view of a BSON value. All numeric types compare as `f64`, and a string
/// holding an RFC 3339 timestamp compares with a BSON datetime as that instant.
#[derive(Debug)]
pub enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Binary(&'a [u8]),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Binary(binary) => Comparable::Binary(&binary.bytes),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            _ => Comparable::Null,
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::DateTime(a), Comparable::String(b))
            | (Comparable::String(b), Comparable::DateTime(a)) => parse_timestamp(b).as_ref() == Some(a),
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Binary(a), Comparable::Binary(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::String(b)) => parse_timestamp(b).map(|b| a.cmp(&b)),
            (Comparable::String(a), Comparable::DateTime(b)) => parse_timestamp(a).map(|a| a.cmp(b)),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Evaluates an [`Expr`] against a single document.
pub struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Evaluates `expr` against a stored value, which must be a BSON document.
    pub fn matches(document: &Bson, expr: &Expr) -> DataLayerResult<bool> {
        let document = document
            .as_document()
            .ok_or_else(|| DataLayerError::InvalidDocument("Expected document".into()))?;

        DocumentEvaluator::new(document).visit_expr(expr)
    }

    /// Keeps the documents matching `expr`, preserving their order.
    pub fn filter_documents<I>(documents: I, expr: &Expr) -> DataLayerResult<Vec<Bson>>
    where
        I: IntoIterator<Item = Bson>,
    {
        let mut output = Vec::new();

        for document in documents {
            if Self::matches(&document, expr)? {
                output.push(document);
            }
        }

        Ok(output)
    }
}

/// String needles match array elements by substring, other needles by equality.
fn array_contains(items: &[Comparable<'_>], needle: &Comparable<'_>) -> bool {
    items.iter().any(|item| match (item, needle) {
        (Comparable::String(item), Comparable::String(needle)) => item.contains(needle),
        (item, needle) => item == needle,
    })
}

/// `true` when `needle` equals the field value, or any element of an array field value.
fn contains_any(haystack: &Comparable<'_>, needles: &Comparable<'_>) -> bool {
    let needles = match needles {
        Comparable::Array(values) => values.iter().collect::<Vec<_>>(),
        single => vec![single],
    };

    match haystack {
        Comparable::Array(items) => items
            .iter()
            .any(|item| needles.iter().any(|needle| *needle == item)),
        single => needles.iter().any(|needle| *needle == single),
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DataLayerError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(self.document.get(field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = self.document.get(field) else {
            // Missing fields never match, negated or not.
            return Ok(false);
        };

        let left = Comparable::from(field_value);
        let right = Comparable::from(value);

        Ok(match op {
            FieldOp::Eq => left == right,
            FieldOp::Ne => left != right,
            FieldOp::Gt => left.partial_cmp(&right) == Some(Ordering::Greater),
            FieldOp::Gte => matches!(left.partial_cmp(&right), Some(Ordering::Greater | Ordering::Equal)),
            FieldOp::Lt => left.partial_cmp(&right) == Some(Ordering::Less),
            FieldOp::Lte => matches!(left.partial_cmp(&right), Some(Ordering::Less | Ordering::Equal)),
            FieldOp::Contains => match (&left, &right) {
                (Comparable::String(l), Comparable::String(r)) => l.contains(r),
                (Comparable::Array(items), needle) => array_contains(items, needle),
                _ => false,
            },
            FieldOp::NotContains => match (&left, &right) {
                (Comparable::String(l), Comparable::String(r)) => !l.contains(r),
                (Comparable::Array(items), needle) => !array_contains(items, needle),
                _ => true,
            },
            FieldOp::StartsWith => match (&left, &right) {
                (Comparable::String(l), Comparable::String(r)) => l.starts_with(r),
                _ => false,
            },
            FieldOp::EndsWith => match (&left, &right) {
                (Comparable::String(l), Comparable::String(r)) => l.ends_with(r),
                _ => false,
            },
            FieldOp::AnyOf => contains_any(&left, &right),
            FieldOp::NoneOf => !contains_any(&left, &right),
        })
    }
}
