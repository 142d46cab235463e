//! Query translation from compiled predicates to MongoDB query syntax.
//!
//! String operators become escaped regular expressions, so they stay case-sensitive and
//! literal like the in-memory evaluator. A string `Contains` needle matches array elements
//! by substring in both places. `Ne`, `NotContains` and `NoneOf` also require the field to
//! exist, since a missing field never matches them in memory; `Not(..)` becomes a bare
//! `$nor`, which matches missing fields in both places.

use bson::{Bson, Document, doc};

use filterlayer_core::{
    error::DataLayerError,
    query::{Expr, FieldOp, QueryVisitor},
};

/// Characters with a meaning in PCRE patterns.
const REGEX_META: &[char] = &['\\', '^', '$', '.', '|', '?', '*', '+', '(', ')', '[', ']', '{', '}'];

fn escape_regex(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for c in value.chars() {
        if REGEX_META.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

fn string_value<'a>(op: &FieldOp, value: &'a Bson) -> Result<&'a str, DataLayerError> {
    value
        .as_str()
        .ok_or_else(|| DataLayerError::UnsupportedFilter(format!("{op:?} operator requires a string value")))
}

/// Translates predicate expressions into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    fn visit_all(&mut self, exprs: &[Expr]) -> Result<Vec<Document>, DataLayerError> {
        exprs
            .iter()
            .map(|expr| self.visit_expr(expr))
            .collect()
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DataLayerError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        // `$and` rejects an empty array; an empty conjunction matches everything.
        if exprs.is_empty() {
            return Ok(doc! {});
        }

        Ok(doc! { "$and": self.visit_all(exprs)? })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        if exprs.is_empty() {
            return Ok(doc! { "_id": { "$exists": false } });
        }

        Ok(doc! { "$or": self.visit_all(exprs)? })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! { "$nor": [self.visit_expr(expr)?] })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! { field: { "$exists": should_exist } })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let condition = match op {
            FieldOp::Eq => doc! { "$eq": value },
            FieldOp::Ne => doc! { "$exists": true, "$ne": value },
            FieldOp::Gt => doc! { "$gt": value },
            FieldOp::Gte => doc! { "$gte": value },
            FieldOp::Lt => doc! { "$lt": value },
            FieldOp::Lte => doc! { "$lte": value },
            FieldOp::Contains => match value {
                Bson::String(s) => doc! { "$regex": escape_regex(s) },
                other => doc! { "$elemMatch": { "$eq": other } },
            },
            FieldOp::NotContains => match value {
                Bson::String(s) => doc! { "$exists": true, "$not": { "$regex": escape_regex(s) } },
                other => doc! { "$exists": true, "$not": { "$elemMatch": { "$eq": other } } },
            },
            FieldOp::StartsWith => {
                doc! { "$regex": format!("^{}", escape_regex(string_value(op, value)?)) }
            }
            FieldOp::EndsWith => {
                doc! { "$regex": format!("{}$", escape_regex(string_value(op, value)?)) }
            }
            FieldOp::AnyOf => doc! { "$in": as_array(value) },
            FieldOp::NoneOf => doc! { "$exists": true, "$nin": as_array(value) },
        };

        Ok(doc! { field: condition })
    }
}

fn as_array(value: &Bson) -> Bson {
    match value {
        Bson::Array(_) => value.clone(),
        single => Bson::Array(vec![single.clone()]),
    }
}
