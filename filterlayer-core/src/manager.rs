//! The CRUD dispatcher.
//!
//! A [`DataManager`] routes calls to the collection registered for a view type. A view
//! may be the stored document type itself ([`DataManager::with_collection`]) or a
//! separate type converted on the way in and out ([`DataManager::with_view_collection`]).
//!
//! ```ignore
//! let manager = DataManager::new()
//!     .with_collection(students)
//!     .with_view_collection(courses, CourseRecord::from, CourseView::from);
//!
//! manager.create_range(vec![john, jane], Some(100)).await?;
//!
//! let found = manager
//!     .find_by_filter::<Student>(Some(&Student::NAME.starts_with("Ja")), Some(0), Some(20))
//!     .await?;
//! ```
//!
//! A filter that fails validation surfaces as [`DataLayerError::UnsupportedFilter`]
//! carrying the validation message.

use std::{
    any::{Any, TypeId, type_name},
    collections::HashMap,
    fmt,
    sync::Arc,
};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    collection::TypedCollection,
    document::Document,
    error::{DataLayerError, DataLayerResult},
    filter::FilterNode,
    validate::ValidationResult,
};

/// Operations the manager dispatches, expressed in terms of the view type.
#[async_trait]
trait ViewCollection<V>: Send + Sync {
    async fn create(&self, views: Vec<V>) -> DataLayerResult<Vec<V>>;

    async fn update(&self, view: V) -> DataLayerResult<V>;

    async fn delete(&self, view: V) -> DataLayerResult<()>;

    fn validate(&self, filter: Option<&FilterNode>) -> ValidationResult;

    async fn find_by_filter(
        &self,
        filter: Option<&FilterNode>,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> DataLayerResult<Vec<V>>;

    async fn count_by_filter(
        &self,
        filter: Option<&FilterNode>,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> DataLayerResult<u64>;
}

type Convert<A, B> = Arc<dyn Fn(A) -> B + Send + Sync>;

struct ConvertingCollection<V, M: Document> {
    collection: TypedCollection<M>,
    to_model: Convert<V, M>,
    to_view: Convert<M, V>,
}

#[async_trait]
impl<V, M> ViewCollection<V> for ConvertingCollection<V, M>
where
    V: Send + Sync + 'static,
    M: Document,
{
    async fn create(&self, views: Vec<V>) -> DataLayerResult<Vec<V>> {
        let models = views
            .into_iter()
            .map(|view| (self.to_model)(view))
            .collect::<Vec<_>>();

        Ok(self
            .collection
            .insert(models)
            .await?
            .into_iter()
            .map(|model| (self.to_view)(model))
            .collect())
    }

    async fn update(&self, view: V) -> DataLayerResult<V> {
        let model = (self.to_model)(view);

        self.collection
            .update(vec![model.clone()])
            .await?;

        Ok((self.to_view)(model))
    }

    async fn delete(&self, view: V) -> DataLayerResult<()> {
        let model = (self.to_model)(view);

        self.collection
            .delete_documents(&[model])
            .await
    }

    fn validate(&self, filter: Option<&FilterNode>) -> ValidationResult {
        self.collection.validate(filter)
    }

    async fn find_by_filter(
        &self,
        filter: Option<&FilterNode>,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> DataLayerResult<Vec<V>> {
        Ok(self
            .collection
            .find_by_filter(filter, page, page_size)
            .await?
            .into_iter()
            .map(|model| (self.to_view)(model))
            .collect())
    }

    async fn count_by_filter(
        &self,
        filter: Option<&FilterNode>,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> DataLayerResult<u64> {
        self.collection
            .count_by_filter(filter, page, page_size)
            .await
    }
}

/// Registry of collections keyed by view type.
///
/// Built once at wiring time, then shared read-only (wrap it in an `Arc`).
#[derive(Default)]
pub struct DataManager {
    collections: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    names: HashMap<TypeId, &'static str>,
}

impl DataManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a collection whose document type is also the view type.
    pub fn with_collection<M: Document>(self, collection: TypedCollection<M>) -> Self {
        self.with_view_collection(collection, |model: M| model, |model: M| model)
    }

    /// Registers a collection under view type `V`, converting views to stored documents
    /// with `to_model` and back with `to_view`. A later registration for the same view
    /// type replaces the earlier one.
    pub fn with_view_collection<V, M>(
        mut self,
        collection: TypedCollection<M>,
        to_model: impl Fn(V) -> M + Send + Sync + 'static,
        to_view: impl Fn(M) -> V + Send + Sync + 'static,
    ) -> Self
    where
        V: Send + Sync + 'static,
        M: Document,
    {
        let view_collection: Arc<dyn ViewCollection<V>> = Arc::new(ConvertingCollection {
            collection,
            to_model: Arc::new(to_model),
            to_view: Arc::new(to_view),
        });

        self.collections
            .insert(TypeId::of::<V>(), Box::new(view_collection));
        self.names
            .insert(TypeId::of::<V>(), type_name::<V>());
        self
    }

    /// Returns `true` when a collection is registered for view type `V`.
    pub fn is_registered<V: 'static>(&self) -> bool {
        self.collections
            .contains_key(&TypeId::of::<V>())
    }

    /// Names of the registered view types, sorted.
    pub fn registered_types(&self) -> Vec<&'static str> {
        let mut names = self
            .names
            .values()
            .copied()
            .collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    fn collection<V: 'static>(&self) -> DataLayerResult<&Arc<dyn ViewCollection<V>>> {
        self.collections
            .get(&TypeId::of::<V>())
            .and_then(|collection| collection.downcast_ref::<Arc<dyn ViewCollection<V>>>())
            .ok_or_else(|| DataLayerError::TypeNotRegistered(type_name::<V>().to_string()))
    }

    /// Inserts one view and returns it as stored, carrying its generated key if the
    /// collection assigns keys.
    pub async fn create<V: Send + Sync + 'static>(&self, view: V) -> DataLayerResult<V> {
        self.collection::<V>()?
            .create(vec![view])
            .await?
            .pop()
            .ok_or_else(|| DataLayerError::Backend(format!("no {} returned from insert", type_name::<V>())))
    }

    /// Inserts many views. With a batch size, inserts run sequentially in chunks of at
    /// most that many; without one (or with zero), everything goes in one insert.
    pub async fn create_range<V: Send + Sync + 'static>(
        &self,
        views: Vec<V>,
        batch_size: Option<usize>,
    ) -> DataLayerResult<()> {
        let collection = self.collection::<V>()?;

        if views.is_empty() {
            return Ok(());
        }

        let batch_size = batch_size
            .filter(|size| *size > 0)
            .unwrap_or(views.len());

        let mut remaining = views;
        while !remaining.is_empty() {
            let rest = remaining.split_off(batch_size.min(remaining.len()));

            debug!(view = type_name::<V>(), count = remaining.len(), "inserting batch");
            collection.create(remaining).await?;

            remaining = rest;
        }

        Ok(())
    }

    /// Replaces the stored copy of `view` and returns it.
    pub async fn update<V: Send + Sync + 'static>(&self, view: V) -> DataLayerResult<V> {
        self.collection::<V>()?
            .update(view)
            .await
    }

    pub async fn delete<V: Send + Sync + 'static>(&self, view: V) -> DataLayerResult<()> {
        self.collection::<V>()?
            .delete(view)
            .await
    }

    /// Validates a filter against the rule set of `V`'s collection.
    pub fn validate<V: 'static>(&self, filter: Option<&FilterNode>) -> DataLayerResult<ValidationResult> {
        Ok(self.collection::<V>()?.validate(filter))
    }

    /// Returns the views matching `filter`, windowed by `page` and `page_size`.
    ///
    /// # Errors
    ///
    /// - [`DataLayerError::TypeNotRegistered`] when no collection serves `V`.
    /// - [`DataLayerError::UnsupportedFilter`] when the filter fails validation.
    pub async fn find_by_filter<V: Send + Sync + 'static>(
        &self,
        filter: Option<&FilterNode>,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> DataLayerResult<Vec<V>> {
        self.collection::<V>()?
            .find_by_filter(filter, page, page_size)
            .await
    }

    /// Counts the views [`DataManager::find_by_filter`] would return.
    pub async fn count_by_filter<V: Send + Sync + 'static>(
        &self,
        filter: Option<&FilterNode>,
        page: Option<usize>,
        page_size: Option<usize>,
    ) -> DataLayerResult<u64> {
        self.collection::<V>()?
            .count_by_filter(filter, page, page_size)
            .await
    }
}

impl fmt::Debug for DataManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataManager")
            .field("collections", &self.registered_types())
            .finish()
    }
}
