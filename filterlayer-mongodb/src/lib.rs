//! MongoDB backend implementation for filterlayer.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Compiled predicates are translated into MongoDB query documents, so filtering,
//! offsets and limits run inside the database.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! filterlayer = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Dates
//!
//! MongoDB orders dates only against native BSON dates. A `chrono::DateTime<Utc>` field
//! serializes as an RFC 3339 string by default, so declare such fields as `bson::DateTime`
//! or serialize them through bson's chrono serde helpers before filtering on them here.
//! The in-memory store accepts either form.
//!
//! # Example
//!
//! ```ignore
//! use filterlayer::{backend::StoreBackendBuilder, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "school")
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod store;
pub(crate) mod query;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
