//! Storage backend abstraction.
//!
//! The [`StoreBackend`] trait is the seam between typed collections and a concrete
//! store. Backends hold BSON documents keyed by string ids and answer [`Query`]s: they
//! evaluate (or translate) the query's predicate expression and apply its offset and
//! limit after filtering.
//!
//! Implementations are required to be thread-safe (`Send + Sync`). The trait is object
//! safe, so collections hold backends as `Arc<dyn StoreBackend>`.
//!
//! # Examples
//!
//! ```ignore
//! use filterlayer::backend::StoreBackend;
//! use bson::{Bson, doc};
//!
//! let backend = MyBackendImpl::new();
//!
//! let doc = Bson::Document(doc! { "id": 1, "name": "John Doe" });
//! backend.insert_documents(vec![("1".to_string(), doc)], "students").await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::Bson;
use std::fmt::Debug;

use crate::{error::DataLayerResult, query::Query};

/// Abstract interface for document storage backends.
///
/// # Ordering
///
/// `query_documents` returns matches in the order the store presents them. The
/// in-memory store uses insertion order; persistent stores use their natural order.
/// Pagination windows are taken over that order.
///
/// # Error Handling
///
/// Operations return [`DataLayerResult<T>`](crate::error::DataLayerResult). Implementers
/// should document which error variants each operation may return.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents into a collection.
    ///
    /// The collection is created if it doesn't exist. Whether an existing id is
    /// overwritten or rejected is backend specific.
    ///
    /// # Arguments
    ///
    /// * `documents` - (id, BSON document) pairs to insert
    /// * `collection` - The name of the collection to insert into
    async fn insert_documents(
        &self,
        documents: Vec<(String, Bson)>,
        collection: &str,
    ) -> DataLayerResult<()>;

    /// Replaces existing documents in a collection.
    async fn update_documents(
        &self,
        documents: Vec<(String, Bson)>,
        collection: &str,
    ) -> DataLayerResult<()>;

    /// Deletes documents from a collection by id. Whether a missing id is an error is
    /// backend specific.
    async fn delete_documents(&self, ids: Vec<String>, collection: &str) -> DataLayerResult<()>;

    /// Retrieves documents from a collection by id. Missing ids are omitted from the result.
    async fn get_documents(
        &self,
        ids: Vec<String>,
        collection: &str,
    ) -> DataLayerResult<Vec<Bson>>;

    /// Returns the documents matching `query.filter` (every document when it is `None`),
    /// skipping `query.offset` matches and returning at most `query.limit`.
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DataLayerResult<Vec<Bson>>;

    /// Counts the documents [`StoreBackend::query_documents`] would return for `query`.
    async fn count_documents(&self, query: Query, collection: &str) -> DataLayerResult<u64>;

    /// Creates an empty collection. Creating an existing collection is a no-op.
    async fn create_collection(&self, name: &str) -> DataLayerResult<()>;

    /// Drops a collection and every document in it.
    async fn drop_collection(&self, name: &str) -> DataLayerResult<()>;

    async fn list_collections(&self) -> DataLayerResult<Vec<String>>;

    /// Releases connections and other resources.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(&self) -> DataLayerResult<()> {
        Ok(())
    }
}

/// Factory for backends that need asynchronous setup (connections, pings).
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DataLayerResult<Self::Backend>;
}
