//! Validated filter trees compiled into predicates over pluggable document stores.
//!
//! This crate is the core of the filterlayer project and provides:
//!
//! - **Filter trees** ([`filter`]) - Leaf conditions and `And`/`Or` composites, plus typed field descriptors
//! - **Validation** ([`validate`]) - Declarative rule sets that accept or reject a filter tree with a message
//! - **Compilation** ([`compile`]) - Registered predicate constructors turning accepted trees into expressions
//! - **Filter sets** ([`filter_set`]) - Rules and constructors for one entity type, declared together
//! - **Predicate AST** ([`query`]) - The expression tree and query envelope backends execute
//! - **Evaluation** ([`evaluator`]) - In-memory evaluation of expressions against BSON documents
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing different storage backends
//! - **Collections** ([`collection`]) - Typed CRUD and filtered queries over one backend collection
//! - **Key generation** ([`key`]) - Sequential ids assigned on insert
//! - **Data manager** ([`manager`]) - Per-type dispatch of CRUD and filter calls
//! - **Error handling** ([`error`]) - Runtime and configuration error types
//! - **Pagination** ([`page`]) - Zero-based page windows
//!
//! # Example
//!
//! ```ignore
//! use filterlayer::{document::Document, filter::{Field, FilterOperator}, filter_set::FilterSet, query::Filter};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Student {
//!     pub id: i32,
//!     pub name: String,
//! }
//!
//! impl Document for Student {
//!     type Id = i32;
//!
//!     fn id(&self) -> &i32 {
//!         &self.id
//!     }
//!
//!     fn collection_name() -> &'static str {
//!         "students"
//!     }
//! }
//!
//! const NAME: Field<Student, String> = Field::new("Name", "name");
//!
//! let filters = FilterSet::<Student>::builder()
//!     .with_filter(NAME, false, 1, 1, FilterOperator::StartsWith, |names| {
//!         Filter::starts_with("name", names[0].clone())
//!     })
//!     .build()?;
//! ```

pub mod backend;
pub mod collection;
pub mod compile;
pub mod document;
pub mod error;
pub mod evaluator;
pub mod filter;
pub mod filter_set;
pub mod key;
pub mod manager;
pub mod page;
pub mod query;
pub mod validate;
