//! The filter tree model.
//!
//! A [`FilterNode`] is either a leaf condition on one field (`Id EqualTo 1`) or a
//! composite `And`/`Or` whose values are child nodes. There is no separate composite
//! type: a node is composite when its values are non-empty and every value is a
//! [`FilterValue::Filter`].
//!
//! # Building filters
//!
//! ```ignore
//! use filterlayer::filter::{FilterNode, FilterOperator};
//!
//! let filter = FilterNode::and([
//!     FilterNode::leaf("Id", FilterOperator::In, [1, 2, 3]),
//!     FilterNode::leaf("Name", FilterOperator::StartsWith, ["Ja"]),
//! ]);
//! ```
//!
//! With [`Field`] descriptors the value type is fixed at compile time:
//!
//! ```ignore
//! const ID: Field<Student, i32> = Field::new("Id", "id");
//!
//! let filter = ID.is_in([1, 2, 3]);
//! ```

use std::{fmt, marker::PhantomData};

use bson::{
    Binary, Bson,
    spec::BinarySubtype,
};
use chrono::{DateTime, Utc};

/// The operation a filter node performs.
///
/// `And` and `Or` are reserved for composite nodes; every other variant is a leaf operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    LessThan,
    LessThanOrEqualTo,
    EqualTo,
    NotEqualTo,
    GreaterThanOrEqualTo,
    GreaterThan,
    StartsWith,
    NotStartsWith,
    Contains,
    NotContains,
    EndsWith,
    NotEndsWith,
    In,
    NotIn,
    And,
    Or,
}

impl FilterOperator {
    /// Returns `true` for the composite-only operators `And` and `Or`.
    pub fn is_composite(&self) -> bool {
        matches!(self, FilterOperator::And | FilterOperator::Or)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single entry of [`FilterNode::values`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// A scalar value compared against a record attribute.
    Value(Bson),
    /// A child node of a composite filter.
    Filter(FilterNode),
}

impl FilterValue {
    /// Returns the nested node, if this value is one.
    pub fn as_filter(&self) -> Option<&FilterNode> {
        match self {
            FilterValue::Filter(node) => Some(node),
            FilterValue::Value(_) => None,
        }
    }

    /// Returns the scalar value, if this value is one.
    pub fn as_value(&self) -> Option<&Bson> {
        match self {
            FilterValue::Value(value) => Some(value),
            FilterValue::Filter(_) => None,
        }
    }
}

impl From<FilterNode> for FilterValue {
    fn from(node: FilterNode) -> Self {
        FilterValue::Filter(node)
    }
}

impl From<Bson> for FilterValue {
    fn from(value: Bson) -> Self {
        FilterValue::Value(value)
    }
}

/// One node of a filter tree. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterNode {
    field: String,
    operator: Option<FilterOperator>,
    values: Option<Vec<FilterValue>>,
}

impl FilterNode {
    /// Creates a node from its raw parts.
    ///
    /// Prefer [`FilterNode::leaf`], [`FilterNode::and`] and [`FilterNode::or`]; this
    /// constructor exists for callers that assemble nodes from external input and
    /// rely on validation to reject malformed shapes.
    pub fn new(
        field: impl Into<String>,
        operator: Option<FilterOperator>,
        values: Option<Vec<FilterValue>>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            values,
        }
    }

    /// Creates a leaf condition on `field`.
    ///
    /// The operator should be a leaf operator; a composite operator here produces a node
    /// that validation rejects.
    pub fn leaf<V>(
        field: impl Into<String>,
        operator: FilterOperator,
        values: impl IntoIterator<Item = V>,
    ) -> Self
    where
        V: Into<Bson>,
    {
        Self::new(
            field,
            Some(operator),
            Some(
                values
                    .into_iter()
                    .map(|value| FilterValue::Value(value.into()))
                    .collect(),
            ),
        )
    }

    /// Creates a leaf condition whose values are missing entirely.
    pub fn without_values(field: impl Into<String>, operator: FilterOperator) -> Self {
        Self::new(field, Some(operator), None)
    }

    /// Creates a composite node matching records that satisfy every child.
    pub fn and(children: impl IntoIterator<Item = FilterNode>) -> Self {
        Self::composite(FilterOperator::And, children)
    }

    /// Creates a composite node matching records that satisfy at least one child.
    pub fn or(children: impl IntoIterator<Item = FilterNode>) -> Self {
        Self::composite(FilterOperator::Or, children)
    }

    fn composite(operator: FilterOperator, children: impl IntoIterator<Item = FilterNode>) -> Self {
        Self::new(
            String::new(),
            Some(operator),
            Some(
                children
                    .into_iter()
                    .map(FilterValue::Filter)
                    .collect(),
            ),
        )
    }

    /// The record attribute this node filters on. Empty for composite nodes.
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn operator(&self) -> Option<FilterOperator> {
        self.operator
    }

    /// The node's values, or `None` when they were never supplied.
    pub fn values(&self) -> Option<&[FilterValue]> {
        self.values.as_deref()
    }

    /// Returns `true` when the values are non-empty and every value is a nested node.
    pub fn is_composite(&self) -> bool {
        match &self.values {
            Some(values) => {
                !values.is_empty()
                    && values
                        .iter()
                        .all(|value| matches!(value, FilterValue::Filter(_)))
            }
            None => false,
        }
    }

    /// Iterates over the nested nodes of a composite. Yields nothing for a leaf.
    pub fn children(&self) -> impl Iterator<Item = &FilterNode> {
        self.values
            .iter()
            .flatten()
            .filter_map(FilterValue::as_filter)
    }

    /// Name used when reporting problems with an `And`/`Or` node.
    pub fn composite_kind(&self) -> Option<&'static str> {
        match self.operator {
            Some(FilterOperator::And) => Some("AndFilterChip"),
            Some(FilterOperator::Or) => Some("OrFilterChip"),
            _ => None,
        }
    }

    /// Walks the tree depth-first and returns every node with its depth.
    ///
    /// The root has depth 1 and each level of nesting adds one. Children are listed
    /// before their parent, so the root is always the last entry.
    pub fn flatten(&self) -> Vec<(&FilterNode, usize)> {
        let mut output = Vec::new();
        self.flatten_into(1, &mut output);
        output
    }

    fn flatten_into<'a>(&'a self, depth: usize, output: &mut Vec<(&'a FilterNode, usize)>) {
        if self.is_composite() {
            for child in self.children() {
                child.flatten_into(depth + 1, output);
            }
        }

        output.push((self, depth));
    }

    /// Deepest level found in the tree (1 for a lone leaf).
    pub fn depth(&self) -> usize {
        self.flatten()
            .into_iter()
            .map(|(_, depth)| depth)
            .max()
            .unwrap_or(1)
    }
}

/// The semantic type of a leaf value, checked exactly (no numeric widening).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Int32,
    Int64,
    Double,
    String,
    Boolean,
    DateTime,
    Uuid,
}

impl ValueType {
    /// Classifies a BSON value, or returns `None` for types filters do not carry.
    pub fn of(value: &Bson) -> Option<ValueType> {
        match value {
            Bson::Int32(_) => Some(ValueType::Int32),
            Bson::Int64(_) => Some(ValueType::Int64),
            Bson::Double(_) => Some(ValueType::Double),
            Bson::String(_) => Some(ValueType::String),
            Bson::Boolean(_) => Some(ValueType::Boolean),
            Bson::DateTime(_) => Some(ValueType::DateTime),
            Bson::Binary(binary) if binary.subtype == BinarySubtype::Uuid => Some(ValueType::Uuid),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Int32 => "Int32",
            ValueType::Int64 => "Int64",
            ValueType::Double => "Double",
            ValueType::String => "String",
            ValueType::Boolean => "Boolean",
            ValueType::DateTime => "DateTime",
            ValueType::Uuid => "Uuid",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rust types usable as filter values.
///
/// Each implementation pins one [`ValueType`] and converts to and from the BSON
/// representation carried inside [`FilterNode`].
pub trait FilterValueType: Sized + Send + Sync + 'static {
    const VALUE_TYPE: ValueType;

    fn into_bson(self) -> Bson;

    /// Decodes a value of exactly this type. Returns `None` on any other BSON type.
    fn from_bson(value: &Bson) -> Option<Self>;
}

impl FilterValueType for i32 {
    const VALUE_TYPE: ValueType = ValueType::Int32;

    fn into_bson(self) -> Bson {
        Bson::Int32(self)
    }

    fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::Int32(value) => Some(*value),
            _ => None,
        }
    }
}

impl FilterValueType for i64 {
    const VALUE_TYPE: ValueType = ValueType::Int64;

    fn into_bson(self) -> Bson {
        Bson::Int64(self)
    }

    fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::Int64(value) => Some(*value),
            _ => None,
        }
    }
}

impl FilterValueType for f64 {
    const VALUE_TYPE: ValueType = ValueType::Double;

    fn into_bson(self) -> Bson {
        Bson::Double(self)
    }

    fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::Double(value) => Some(*value),
            _ => None,
        }
    }
}

impl FilterValueType for String {
    const VALUE_TYPE: ValueType = ValueType::String;

    fn into_bson(self) -> Bson {
        Bson::String(self)
    }

    fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::String(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl FilterValueType for bool {
    const VALUE_TYPE: ValueType = ValueType::Boolean;

    fn into_bson(self) -> Bson {
        Bson::Boolean(self)
    }

    fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

impl FilterValueType for DateTime<Utc> {
    const VALUE_TYPE: ValueType = ValueType::DateTime;

    fn into_bson(self) -> Bson {
        Bson::DateTime(bson::DateTime::from_chrono(self))
    }

    fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::DateTime(value) => Some(value.to_chrono()),
            _ => None,
        }
    }
}

impl FilterValueType for uuid::Uuid {
    const VALUE_TYPE: ValueType = ValueType::Uuid;

    fn into_bson(self) -> Bson {
        Bson::Binary(Binary {
            subtype: BinarySubtype::Uuid,
            bytes: self.as_bytes().to_vec(),
        })
    }

    fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::Binary(binary) if binary.subtype == BinarySubtype::Uuid => {
                uuid::Uuid::from_slice(&binary.bytes).ok()
            }
            _ => None,
        }
    }
}

/// A compile-time handle on one attribute of model `M` holding values of type `T`.
///
/// `name` is the key filters use (`"Id"`); `key` is the attribute's name inside the
/// stored document (`"id"`). Rule declarations and predicate registrations take the
/// same descriptor, so the two cannot drift apart. `#[derive(FilterFields)]` generates
/// one constant per struct field.
pub struct Field<M, T> {
    name: &'static str,
    key: &'static str,
    _marker: PhantomData<fn() -> (M, T)>,
}

impl<M, T> Field<M, T> {
    pub const fn new(name: &'static str, key: &'static str) -> Self {
        Self {
            name,
            key,
            _marker: PhantomData,
        }
    }

    /// The field name carried by filter nodes.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The attribute name inside the stored document.
    pub const fn key(&self) -> &'static str {
        self.key
    }
}

impl<M, T> Clone for Field<M, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M, T> Copy for Field<M, T> {}

impl<M, T> fmt::Debug for Field<M, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("key", &self.key)
            .finish()
    }
}

macro_rules! single_value_filters {
    ($($(#[$doc:meta])* $method:ident => $operator:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $method(&self, value: impl Into<T>) -> FilterNode {
                self.filter(FilterOperator::$operator, [value])
            }
        )*
    };
}

impl<M, T: FilterValueType> Field<M, T> {
    /// Creates a leaf on this field with an arbitrary operator and values.
    pub fn filter<V>(&self, operator: FilterOperator, values: impl IntoIterator<Item = V>) -> FilterNode
    where
        V: Into<T>,
    {
        FilterNode::leaf(
            self.name,
            operator,
            values
                .into_iter()
                .map(|value| value.into().into_bson()),
        )
    }

    single_value_filters! {
        equal_to => EqualTo,
        not_equal_to => NotEqualTo,
        less_than => LessThan,
        less_than_or_equal_to => LessThanOrEqualTo,
        greater_than => GreaterThan,
        greater_than_or_equal_to => GreaterThanOrEqualTo,
        starts_with => StartsWith,
        not_starts_with => NotStartsWith,
        contains => Contains,
        not_contains => NotContains,
        ends_with => EndsWith,
        not_ends_with => NotEndsWith,
    }

    /// Matches records whose attribute equals any of `values`.
    pub fn is_in<V: Into<T>>(&self, values: impl IntoIterator<Item = V>) -> FilterNode {
        self.filter(FilterOperator::In, values)
    }

    /// Matches records whose attribute equals none of `values`.
    pub fn not_in<V: Into<T>>(&self, values: impl IntoIterator<Item = V>) -> FilterNode {
        self.filter(FilterOperator::NotIn, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct Student;

    const ID: Field<Student, i32> = Field::new("Id", "id");
    const NAME: Field<Student, String> = Field::new("Name", "name");

    #[test]
    fn leaf_is_not_composite() {
        let filter = FilterNode::leaf("Id", FilterOperator::EqualTo, [1]);

        assert!(!filter.is_composite());
        assert_eq!(filter.field(), "Id");
        assert_eq!(filter.operator(), Some(FilterOperator::EqualTo));
        assert_eq!(filter.values().map(<[_]>::len), Some(1));
    }

    #[test]
    fn empty_composite_is_not_composite() {
        let filter = FilterNode::or([]);

        assert!(!filter.is_composite());
        assert_eq!(filter.composite_kind(), Some("OrFilterChip"));
    }

    #[test]
    fn mixed_values_are_not_composite() {
        let filter = FilterNode::new(
            "",
            Some(FilterOperator::And),
            Some(vec![
                FilterValue::Filter(FilterNode::leaf("Id", FilterOperator::EqualTo, [1])),
                FilterValue::Value(Bson::Int32(2)),
            ]),
        );

        assert!(!filter.is_composite());
        assert_eq!(filter.flatten().len(), 1);
    }

    #[test]
    fn flatten_lists_children_before_parent() {
        let filter = FilterNode::and([
            ID.equal_to(1),
            FilterNode::or([NAME.starts_with("J"), NAME.ends_with("e")]),
        ]);

        let flattened = filter
            .flatten()
            .into_iter()
            .map(|(node, depth)| (node.field().to_string(), depth))
            .collect::<Vec<_>>();

        assert_eq!(
            flattened,
            vec![
                ("Id".to_string(), 2),
                ("Name".to_string(), 3),
                ("Name".to_string(), 3),
                (String::new(), 2),
                (String::new(), 1),
            ]
        );
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 2)]
    #[case(3, 4)]
    fn depth_counts_nesting_levels(#[case] levels: usize, #[case] expected: usize) {
        let mut filter = ID.equal_to(1);
        for _ in 0..levels {
            filter = FilterNode::and([filter]);
        }

        assert_eq!(filter.depth(), expected);
    }

    #[test]
    fn typed_field_produces_exact_bson_types() {
        let filter = ID.is_in([1, 2, 3]);

        assert_eq!(filter.operator(), Some(FilterOperator::In));
        assert!(filter
            .values()
            .unwrap_or_default()
            .iter()
            .all(|value| value.as_value().and_then(ValueType::of) == Some(ValueType::Int32)));
    }

    #[rstest]
    #[case(Bson::Int32(1), Some(ValueType::Int32))]
    #[case(Bson::Int64(1), Some(ValueType::Int64))]
    #[case(Bson::Double(1.1), Some(ValueType::Double))]
    #[case(Bson::String("a".into()), Some(ValueType::String))]
    #[case(Bson::Boolean(true), Some(ValueType::Boolean))]
    #[case(Bson::Null, None)]
    fn value_type_classification(#[case] value: Bson, #[case] expected: Option<ValueType>) {
        assert_eq!(ValueType::of(&value), expected);
    }

    #[test]
    fn uuid_values_decode_back() {
        let id = uuid::Uuid::new_v4();
        let bson = id.into_bson();

        assert_eq!(ValueType::of(&bson), Some(ValueType::Uuid));
        assert_eq!(uuid::Uuid::from_bson(&bson), Some(id));
    }

    #[test]
    fn decoding_is_exact() {
        assert_eq!(i32::from_bson(&Bson::Double(1.0)), None);
        assert_eq!(i64::from_bson(&Bson::Int32(1)), None);
        assert_eq!(String::from_bson(&Bson::String("x".into())), Some("x".to_string()));
    }
}
