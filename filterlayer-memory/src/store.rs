//! In-memory storage implementation.
//!
//! Documents are kept as BSON values per collection, in insertion order, behind an
//! async-aware read-write lock.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use bson::Bson;
use mea::rwlock::RwLock;
use tracing::trace;

use filterlayer_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DataLayerError, DataLayerResult},
    evaluator::DocumentEvaluator,
    query::Query,
};

/// One collection: documents by insertion sequence, plus an id index.
#[derive(Debug, Default)]
struct CollectionMap {
    next: u64,
    documents: BTreeMap<u64, Bson>,
    index: HashMap<String, u64>,
}

impl CollectionMap {
    fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    fn get(&self, id: &str) -> Option<&Bson> {
        self.index
            .get(id)
            .and_then(|seq| self.documents.get(seq))
    }

    fn push(&mut self, id: String, document: Bson) {
        let seq = self.next;
        self.next += 1;

        self.index.insert(id, seq);
        self.documents.insert(seq, document);
    }

    /// Replaces a document in place, keeping its position. Unknown ids are ignored.
    fn replace(&mut self, id: &str, document: Bson) {
        if let Some(seq) = self.index.get(id) {
            self.documents.insert(*seq, document);
        }
    }

    fn remove(&mut self, id: &str) {
        if let Some(seq) = self.index.remove(id) {
            self.documents.remove(&seq);
        }
    }

    fn matching(&self, query: &Query) -> DataLayerResult<Vec<Bson>> {
        let documents = self.documents.values().cloned();

        let matched = match &query.filter {
            Some(filter) => DocumentEvaluator::filter_documents(documents, filter)?,
            None => documents.collect(),
        };

        Ok(matched
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }
}

type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, so clones
/// share the same data.
///
/// Queries scan the whole collection in insertion order; there are no indexes
/// beyond the id lookup. Inserting an existing id fails with
/// [`DataLayerError::DocumentAlreadyExists`], and updating or deleting a missing one
/// fails with [`DataLayerError::DocumentNotFound`].
///
/// # Example
///
/// ```ignore
/// use filterlayer_memory::InMemoryStore;
/// use filterlayer::backend::StoreBackend;
/// use bson::{Bson, doc};
///
/// let store = InMemoryStore::new();
///
/// let doc = Bson::Document(doc! { "id": 1, "name": "John Doe" });
/// store.insert_documents(vec![("1".to_string(), doc)], "students").await?;
///
/// let docs = store.get_documents(vec!["1".to_string()], "students").await?;
/// assert_eq!(docs.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection_name -> documents
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(&self, documents: Vec<(String, Bson)>, collection: &str) -> DataLayerResult<()> {
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();

        let mut batch = HashSet::with_capacity(documents.len());
        for (id, _) in &documents {
            if collection_map.contains(id) || !batch.insert(id.as_str()) {
                return Err(DataLayerError::DocumentAlreadyExists(id.clone(), collection.to_string()));
            }
        }

        for (id, doc) in documents {
            collection_map.push(id, doc);
        }

        Ok(())
    }

    async fn update_documents(&self, documents: Vec<(String, Bson)>, collection: &str) -> DataLayerResult<()> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Err(DataLayerError::CollectionNotFound(collection.to_string())),
        };

        if let Some((id, _)) = documents.iter().find(|(id, _)| !collection_map.contains(id)) {
            return Err(DataLayerError::DocumentNotFound(id.clone(), collection.to_string()));
        }

        for (id, doc) in documents {
            collection_map.replace(&id, doc);
        }

        Ok(())
    }

    async fn delete_documents(&self, ids: Vec<String>, collection: &str) -> DataLayerResult<()> {
        let mut store = self.store.write().await;
        let collection_map = match store.get_mut(collection) {
            Some(col) => col,
            None => return Err(DataLayerError::CollectionNotFound(collection.to_string())),
        };

        if let Some(id) = ids.iter().find(|id| !collection_map.contains(id)) {
            return Err(DataLayerError::DocumentNotFound(id.clone(), collection.to_string()));
        }

        for id in ids {
            collection_map.remove(&id);
        }

        Ok(())
    }

    async fn get_documents(&self, ids: Vec<String>, collection: &str) -> DataLayerResult<Vec<Bson>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        Ok(ids
            .iter()
            .filter_map(|id| collection_map.get(id))
            .cloned()
            .collect())
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DataLayerResult<Vec<Bson>> {
        let store = self.store.read().await;
        let Some(collection_map) = store.get(collection) else {
            return Ok(vec![]);
        };

        let documents = collection_map.matching(&query)?;
        trace!(collection, matched = documents.len(), "in-memory query");

        Ok(documents)
    }

    async fn count_documents(&self, query: Query, collection: &str) -> DataLayerResult<u64> {
        let store = self.store.read().await;
        let Some(collection_map) = store.get(collection) else {
            return Ok(0);
        };

        Ok(collection_map.matching(&query)?.len() as u64)
    }

    async fn create_collection(&self, name: &str) -> DataLayerResult<()> {
        self.store
            .write()
            .await
            .entry(name.to_string())
            .or_default();

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DataLayerResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(DataLayerError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self) -> DataLayerResult<Vec<String>> {
        let mut names = self
            .store
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort();

        Ok(names)
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DataLayerResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use filterlayer_core::query::{Filter, QueryBuilder};

    fn student(id: i32, name: &str) -> (String, Bson) {
        (id.to_string(), Bson::Document(doc! { "id": id, "name": name }))
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::builder().build().await.unwrap();
        store
            .insert_documents(
                vec![
                    student(1, "John Doe"),
                    student(2, "Jane Doe"),
                    student(3, "John Smith"),
                    student(4, "Jane Smith"),
                ],
                "students",
            )
            .await
            .unwrap();
        store
    }

    fn ids(documents: &[Bson]) -> Vec<i32> {
        documents
            .iter()
            .filter_map(|doc| doc.as_document())
            .filter_map(|doc| doc.get_i32("id").ok())
            .collect()
    }

    #[tokio::test]
    async fn query_keeps_insertion_order() {
        let store = seeded().await;
        let query = QueryBuilder::new()
            .filter(Filter::or([Filter::eq("id", 1), Filter::starts_with("name", "Ja")]))
            .build();

        let found = store.query_documents(query, "students").await.unwrap();

        assert_eq!(ids(&found), vec![1, 2, 4]);
    }

    #[tokio::test]
    async fn update_keeps_position() {
        let store = seeded().await;

        store
            .update_documents(vec![student(1, "Johnny Doe")], "students")
            .await
            .unwrap();

        let found = store
            .query_documents(Query::new(), "students")
            .await
            .unwrap();
        assert_eq!(ids(&found), vec![1, 2, 3, 4]);
        assert_eq!(
            found[0]
                .as_document()
                .and_then(|doc| doc.get_str("name").ok()),
            Some("Johnny Doe")
        );
    }

    #[tokio::test]
    async fn offset_and_limit_apply_after_filter() {
        let store = seeded().await;
        let query = QueryBuilder::new()
            .filter(Filter::ends_with("name", "Smith"))
            .offset(1)
            .limit(5)
            .build();

        let found = store.query_documents(query.clone(), "students").await.unwrap();

        assert_eq!(ids(&found), vec![4]);
        assert_eq!(store.count_documents(query, "students").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected_atomically() {
        let store = seeded().await;

        let err = store
            .insert_documents(vec![student(5, "Ann Lee"), student(2, "Jane Doe")], "students")
            .await
            .unwrap_err();

        assert!(matches!(err, DataLayerError::DocumentAlreadyExists(id, _) if id == "2"));
        assert_eq!(store.count_documents(Query::new(), "students").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn delete_removes_and_reports_missing() {
        let store = seeded().await;

        store
            .delete_documents(vec!["3".to_string()], "students")
            .await
            .unwrap();
        let err = store
            .delete_documents(vec!["3".to_string()], "students")
            .await
            .unwrap_err();

        assert!(matches!(err, DataLayerError::DocumentNotFound(..)));
        assert_eq!(
            ids(&store.get_documents(vec!["1".into(), "3".into(), "4".into()], "students").await.unwrap()),
            vec![1, 4]
        );
    }

    #[tokio::test]
    async fn update_with_missing_id_changes_nothing() {
        let store = seeded().await;

        let err = store
            .update_documents(vec![student(1, "CHANGED"), student(9, "Nobody")], "students")
            .await
            .unwrap_err();

        assert!(matches!(err, DataLayerError::DocumentNotFound(id, _) if id == "9"));
        let found = store.get_documents(vec!["1".into()], "students").await.unwrap();
        assert_eq!(
            found[0]
                .as_document()
                .and_then(|doc| doc.get_str("name").ok()),
            Some("John Doe")
        );
    }

    #[tokio::test]
    async fn delete_with_missing_id_removes_nothing() {
        let store = seeded().await;

        let err = store
            .delete_documents(vec!["2".to_string(), "9".to_string()], "students")
            .await
            .unwrap_err();

        assert!(matches!(err, DataLayerError::DocumentNotFound(id, _) if id == "9"));
        assert_eq!(store.count_documents(Query::new(), "students").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn unknown_collection_is_empty() {
        let store = InMemoryStore::new();

        assert!(store.query_documents(Query::new(), "nothing").await.unwrap().is_empty());
        assert_eq!(store.count_documents(Query::new(), "nothing").await.unwrap(), 0);
        assert!(matches!(
            store.drop_collection("nothing").await,
            Err(DataLayerError::CollectionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn collections_are_listed_sorted() {
        let store = InMemoryStore::new();
        store.create_collection("teachers").await.unwrap();
        store.create_collection("courses").await.unwrap();

        assert_eq!(store.list_collections().await.unwrap(), vec!["courses", "teachers"]);
    }
}
