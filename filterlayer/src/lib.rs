//! Main filterlayer crate: validated filter trees compiled into predicates over
//! pluggable document stores.
//!
//! This crate is the primary entry point for users of filterlayer. It re-exports the
//! core types from the sub-crates and provides access to the storage backends.
//!
//! # Features
//!
//! - **Declarative validation** - Rule sets decide which filter trees an entity accepts
//! - **Registered predicates** - Each accepted field/operator pair compiles through a constructor you supply
//! - **Multiple backends** - In-memory and MongoDB storage behind one backend trait
//! - **Per-type dispatch** - A data manager routes CRUD and filter calls to the right collection
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use filterlayer::{prelude::*, memory::InMemoryStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, FilterFields)]
//! pub struct Student {
//!     pub id: i32,
//!     pub name: String,
//! }
//!
//! impl Document for Student {
//!     type Id = i32;
//!
//!     fn id(&self) -> &i32 { &self.id }
//!     fn collection_name() -> &'static str { "students" }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let filters = FilterSet::<Student>::builder()
//!         .with_filter(Student::ID, false, 1, 10, FilterOperator::In, |ids| {
//!             Filter::any_of("id", bson_array(ids))
//!         })
//!         .with_filter(Student::NAME, false, 1, 1, FilterOperator::StartsWith, |names| {
//!             Filter::starts_with("name", names[0].clone())
//!         })
//!         .rules(|rules| rules.has_distinct_fields())
//!         .build()?;
//!
//!     let backend = Arc::new(InMemoryStore::builder().build().await?);
//!     let manager = DataManager::new()
//!         .with_collection(TypedCollection::<Student>::new(backend, filters));
//!
//!     manager
//!         .create_range(vec![
//!             Student { id: 1, name: "John Doe".into() },
//!             Student { id: 2, name: "Jane Doe".into() },
//!         ], None)
//!         .await?;
//!
//!     let filter = FilterNode::or([Student::ID.is_in([1]), Student::NAME.starts_with("Ja")]);
//!     let students = manager
//!         .find_by_filter::<Student>(Some(&filter), None, None)
//!         .await?;
//!
//!     println!("Found students: {:?}", students);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use filterlayer_core::{
    backend, collection, compile, document, error, evaluator, filter, filter_set, key, manager, page, query, validate,
};
pub use filterlayer_macros::FilterFields;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use filterlayer_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use filterlayer_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
