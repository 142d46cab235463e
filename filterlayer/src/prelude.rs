//! Convenient re-exports of commonly used types from filterlayer.
//!
//! ```ignore
//! use filterlayer::prelude::*;
//! ```
//!
//! This provides access to:
//! - Filter trees and field descriptors
//! - Rule sets, compilers and filter sets
//! - Documents, collections and the data manager
//! - Store backends, the predicate AST and error types

pub use filterlayer_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    collection::TypedCollection,
    compile::{PredicateCompiler, PredicateCompilerBuilder, bson_array},
    document::{Document, DocumentExt},
    error::{ConfigError, DataLayerError, DataLayerResult},
    filter::{Field, FilterNode, FilterOperator, FilterValue, FilterValueType, ValueType},
    filter_set::{FilterSet, FilterSetBuilder},
    key::KeyGenerator,
    manager::DataManager,
    page::Pagination,
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor},
    validate::{FilterRule, RuleSet, RuleSetBuilder, ValidationResult, ValidationStep},
};
pub use filterlayer_macros::FilterFields;
