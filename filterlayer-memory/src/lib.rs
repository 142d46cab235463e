//! In-memory storage backend for filterlayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! Documents are kept in insertion order and filtered with the same evaluator the
//! predicate compiler uses, so results come back in the order they were inserted.
//! It suits development, tests and small datasets.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use filterlayer::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Arc::new(InMemoryStore::builder().build().await?);
//!     let students = TypedCollection::<Student>::new(backend, student_filters()?);
//!
//!     students.insert(vec![Student { id: 1, name: "John Doe".into() }]).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
