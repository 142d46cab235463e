//! Typed collections: one document type, one backend, one filter set.
//!
//! A [`TypedCollection`] serializes documents for its backend and runs validated
//! filter queries against it. Filters are checked by the collection's
//! [`FilterSet`] before compilation, so callers only see compiled predicates
//! for filters the rule set accepted.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use filterlayer::{collection::TypedCollection, memory::InMemoryStore};
//!
//! let students = TypedCollection::<Student>::new(Arc::new(InMemoryStore::new()), student_filters()?);
//! students.insert(vec![john, jane]).await?;
//!
//! let matches = students
//!     .find_by_filter(Some(&Student::NAME.starts_with("Ja")), None, None)
//!     .await?;
//! ```

use std::{fmt, sync::Arc};

use bson::Bson;
use tracing::debug;

use crate::{
    backend::StoreBackend,
    document::{Document, DocumentExt},
    error::{DataLayerError, DataLayerResult},
    filter::FilterNode,
    filter_set::FilterSet,
    key::KeyGenerator,
    query::Query,
    validate::ValidationResult,
};

/// A collection of documents of type `D` held by a shared backend.
pub struct TypedCollection<D: Document> {
    name: String,
    backend: Arc<dyn StoreBackend>,
    filters: Arc<FilterSet<D>>,
    keys: Option<Arc<KeyGenerator<D>>>,
}

impl<D: Document> TypedCollection<D> {
    /// Creates a collection named after [`Document::collection_name`].
    pub fn new(backend: Arc<dyn StoreBackend>, filters: FilterSet<D>) -> Self {
        Self::with_name(D::collection_name(), backend, filters)
    }

    pub fn with_name(name: impl Into<String>, backend: Arc<dyn StoreBackend>, filters: FilterSet<D>) -> Self {
        Self {
            name: name.into(),
            backend,
            filters: Arc::new(filters),
            keys: None,
        }
    }

    /// Assigns keys from `generator` to every document this collection inserts.
    pub fn with_key_generator(mut self, generator: KeyGenerator<D>) -> Self {
        self.keys = Some(Arc::new(generator));
        self
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filters(&self) -> &FilterSet<D> {
        &self.filters
    }

    fn to_entries(documents: &[D]) -> DataLayerResult<Vec<(String, Bson)>> {
        documents
            .iter()
            .map(|document| Ok((document.document_id(), document.to_bson()?)))
            .collect()
    }

    fn from_entries(documents: Vec<Bson>) -> DataLayerResult<Vec<D>> {
        documents
            .into_iter()
            .map(D::from_bson)
            .collect()
    }

    /// Inserts new documents and returns them as stored, keyed by the collection's
    /// [`KeyGenerator`] when it has one.
    ///
    /// # Errors
    ///
    /// Returns a [`DataLayerError`] if serialization or insertion fails.
    pub async fn insert(&self, mut documents: Vec<D>) -> DataLayerResult<Vec<D>> {
        if let Some(keys) = &self.keys {
            keys.assign(&mut documents).await;
        }

        self.backend
            .insert_documents(Self::to_entries(&documents)?, &self.name)
            .await?;

        Ok(documents)
    }

    /// Replaces existing documents, matched by id.
    pub async fn update(&self, documents: Vec<D>) -> DataLayerResult<()> {
        self.backend
            .update_documents(Self::to_entries(&documents)?, &self.name)
            .await
    }

    /// Deletes documents by id.
    pub async fn delete(&self, ids: Vec<D::Id>) -> DataLayerResult<()> {
        self.backend
            .delete_documents(
                ids.iter()
                    .map(ToString::to_string)
                    .collect(),
                &self.name,
            )
            .await
    }

    /// Deletes the stored copies of `documents`, matched by id.
    pub async fn delete_documents(&self, documents: &[D]) -> DataLayerResult<()> {
        self.backend
            .delete_documents(
                documents
                    .iter()
                    .map(DocumentExt::document_id)
                    .collect(),
                &self.name,
            )
            .await
    }

    /// Retrieves documents by id. Ids that don't exist are omitted.
    pub async fn get(&self, ids: Vec<D::Id>) -> DataLayerResult<Vec<D>> {
        let documents = self
            .backend
            .get_documents(
                ids.iter()
                    .map(ToString::to_string)
                    .collect(),
                &self.name,
            )
            .await?;

        Self::from_entries(documents)
    }

    /// Validates a filter against this collection's rule set.
    pub fn validate(&self, filter: Option<&FilterNode>) -> ValidationResult {
        self.filters.validate(filter)
    }

    fn validated_query(
        &self,
        filter: Option<&FilterNode>,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> DataLayerResult<Query> {
        let result = self.validate(filter);
        if !result.is_success {
            return Err(DataLayerError::UnsupportedFilter(result.message));
        }

        self.filters
            .to_query(filter, page, page_size)
    }

    /// Returns the documents matching `filter`, windowed by `page` and `page_size`.
    ///
    /// # Errors
    ///
    /// [`DataLayerError::UnsupportedFilter`] when the filter fails validation or has no
    /// registered predicate, otherwise whatever the backend reports.
    pub async fn find_by_filter(
        &self,
        filter: Option<&FilterNode>,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> DataLayerResult<Vec<D>> {
        let query = self.validated_query(filter, page, page_size)?;

        debug!(collection = %self.name, ?query, "finding documents by filter");

        let documents = self
            .backend
            .query_documents(query, &self.name)
            .await?;

        Self::from_entries(documents)
    }

    /// Counts the documents [`TypedCollection::find_by_filter`] would return.
    pub async fn count_by_filter(
        &self,
        filter: Option<&FilterNode>,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> DataLayerResult<u64> {
        let query = self.validated_query(filter, page, page_size)?;

        debug!(collection = %self.name, ?query, "counting documents by filter");

        self.backend
            .count_documents(query, &self.name)
            .await
    }
}

impl<D: Document> Clone for TypedCollection<D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            backend: Arc::clone(&self.backend),
            filters: Arc::clone(&self.filters),
            keys: self.keys.clone(),
        }
    }
}

impl<D: Document> fmt::Debug for TypedCollection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedCollection")
            .field("name", &self.name)
            .field("backend", &self.backend)
            .field("keyed", &self.keys.is_some())
            .finish()
    }
}
