use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream::iter};
use bson::{Bson, Document, doc};
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, CountOptions, FindOptions},
};
use tracing::{debug, trace};
use filterlayer_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DataLayerError, DataLayerResult},
    query::{Query, QueryVisitor},
};

use crate::query::MongoQueryTranslator;

const DUPLICATE_KEY: i32 = 11000;

fn backend_error(err: MongoError) -> DataLayerError {
    DataLayerError::Backend(err.to_string())
}

/// Index within the batch of the first document rejected for a duplicate `_id`.
fn duplicate_key_index(err: &MongoError) -> Option<usize> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY => Some(0),
        ErrorKind::InsertMany(insert) => insert
            .write_errors
            .iter()
            .flatten()
            .find(|write| write.code == DUPLICATE_KEY)
            .map(|write| write.index),
        _ => None,
    }
}

/// Stores `id` as `_id`, replacing any `_id` the serialized document carried.
fn prepare_document(id: &str, document: Bson) -> DataLayerResult<Document> {
    let Bson::Document(document) = document else {
        return Err(DataLayerError::InvalidDocument("Expected document".into()));
    };

    Ok(Document::from_iter(
        document
            .into_iter()
            .filter(|(key, _)| key != "_id")
            .chain([("_id".to_string(), Bson::String(id.to_string()))]),
    ))
}

fn restore_document(mut document: Document) -> Bson {
    document.remove("_id");
    Bson::Document(document)
}

fn translate(query: &Query) -> DataLayerResult<Document> {
    match &query.filter {
        Some(expr) => MongoQueryTranslator.visit_expr(expr),
        None => Ok(doc! {}),
    }
}

/// A zero limit selects nothing. MongoDB reads `limit: 0` as "no limit", so such queries
/// never reach the server.
fn is_empty_window(query: &Query) -> bool {
    query.limit == Some(0)
}

fn find_options(query: &Query) -> FindOptions {
    let mut options = FindOptions::default();

    if let Some(limit) = query.limit {
        options.limit = Some(i64::try_from(limit).unwrap_or(i64::MAX));
    }
    if let Some(skip) = query.offset {
        options.skip = Some(u64::try_from(skip).unwrap_or(u64::MAX));
    }

    options
}

fn count_options(query: &Query) -> CountOptions {
    let mut options = CountOptions::default();

    if let Some(limit) = query.limit {
        options.limit = Some(u64::try_from(limit).unwrap_or(u64::MAX));
    }
    if let Some(skip) = query.offset {
        options.skip = Some(u64::try_from(skip).unwrap_or(u64::MAX));
    }

    options
}

/// MongoDB-backed document store.
///
/// Each document is stored with its string id as `_id`; the `_id` key is stripped again
/// when documents are read back. Documents come back in MongoDB's natural order.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    async fn find(&self, filter: Document, options: FindOptions, collection: &str) -> DataLayerResult<Vec<Bson>> {
        Ok(
            self.get_collection(collection)
                .find(filter)
                .with_options(options)
                .await
                .map_err(backend_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(backend_error)?
                .into_iter()
                .map(restore_document)
                .collect()
        )
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_documents(&self, documents: Vec<(String, Bson)>, collection: &str) -> DataLayerResult<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let ids = documents
            .iter()
            .map(|(id, _)| id.clone())
            .collect::<Vec<_>>();

        self.get_collection(collection)
            .insert_many(
                documents
                    .into_iter()
                    .map(|(id, doc)| prepare_document(&id, doc))
                    .collect::<DataLayerResult<Vec<Document>>>()?,
            )
            .await
            .map_err(|e| match duplicate_key_index(&e).and_then(|index| ids.get(index)) {
                Some(id) => DataLayerError::DocumentAlreadyExists(id.clone(), collection.to_string()),
                None => backend_error(e),
            })?;

        Ok(())
    }

    async fn update_documents(&self, documents: Vec<(String, Bson)>, collection: &str) -> DataLayerResult<()> {
        iter(documents)
            .then(async |(id, doc)| {
                let result = self.get_collection(collection)
                    .replace_one(doc! { "_id": &id }, prepare_document(&id, doc)?)
                    .await
                    .map_err(backend_error)?;

                if result.matched_count == 0 {
                    return Err(DataLayerError::DocumentNotFound(id, collection.to_string()));
                }

                Ok(())
            })
            .try_collect::<Vec<_>>()
            .await?;

        Ok(())
    }

    async fn delete_documents(&self, ids: Vec<String>, collection: &str) -> DataLayerResult<()> {
        self.get_collection(collection)
            .delete_many(doc! { "_id": { "$in": ids } })
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn get_documents(&self, ids: Vec<String>, collection: &str) -> DataLayerResult<Vec<Bson>> {
        self.find(doc! { "_id": { "$in": ids } }, FindOptions::default(), collection)
            .await
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DataLayerResult<Vec<Bson>> {
        let filter = translate(&query)?;
        if is_empty_window(&query) {
            return Ok(vec![]);
        }

        debug!(collection, %filter, "mongodb find");

        self.find(filter, find_options(&query), collection)
            .await
    }

    async fn count_documents(&self, query: Query, collection: &str) -> DataLayerResult<u64> {
        let filter = translate(&query)?;
        if is_empty_window(&query) {
            return Ok(0);
        }

        debug!(collection, %filter, "mongodb count");

        self.get_collection(collection)
            .count_documents(filter)
            .with_options(count_options(&query))
            .await
            .map_err(backend_error)
    }

    async fn create_collection(&self, name: &str) -> DataLayerResult<()> {
        if self.list_collections().await?.iter().any(|existing| existing == name) {
            trace!(collection = name, "collection already exists");
            return Ok(());
        }

        self.client
            .database(&self.database)
            .create_collection(name)
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DataLayerResult<()> {
        self.get_collection(name)
            .drop()
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn list_collections(&self) -> DataLayerResult<Vec<String>> {
        let mut names = self.client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(backend_error)?;
        names.sort();

        Ok(names)
    }

    async fn shutdown(&self) -> DataLayerResult<()> {
        self.client
            .clone()
            .shutdown()
            .await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DataLayerResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DataLayerError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DataLayerError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
