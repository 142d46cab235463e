//! Error types and result types for filter and store operations.
//!
//! Two error families live here:
//!
//! - [`DataLayerError`] covers everything that can go wrong while a query or a CRUD call runs.
//!   Use [`DataLayerResult<T>`] as the return type for those operations.
//! - [`ConfigError`] covers invalid arguments handed to the rule set and compiler builders.
//!   These surface once, at wiring time, from the builders' `build()` methods.
//!
//! A filter that fails validation is not an error at all; it is reported as a
//! [`ValidationResult`](crate::validate::ValidationResult).

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible runtime errors raised by the filter layer and its stores.
#[derive(Error, Debug)]
pub enum DataLayerError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested document was not found in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// The document has an invalid structure (for example, it is not a BSON document).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// A filter reached the compiler without a matching predicate registration,
    /// or was rejected by validation at the dispatcher.
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),
    /// No collection is registered for the requested view type.
    #[error("Model type: {0} not registered")]
    TypeNotRegistered(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for filter layer operations.
pub type DataLayerResult<T> = Result<T, DataLayerError>;

impl From<BsonError> for DataLayerError {
    fn from(err: BsonError) -> Self {
        DataLayerError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DataLayerError {
    fn from(err: SerdeJsonError) -> Self {
        DataLayerError::Serialization(err.to_string())
    }
}

/// Invalid arguments supplied while assembling rule sets or predicate compilers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("minValueCount must be greater than or equal to 1")]
    MinValueCount,
    #[error("maxValueCount must be greater than or equal to minValueCount ({0})")]
    MaxValueCount(usize),
    #[error("maxFilterDepth must be greater than or equal to 1")]
    MaxFilterDepth,
    #[error("{0} filter requires at least one supported operator")]
    NoOperators(String),
    #[error("{0} is a composite operator and cannot be declared for field {1}")]
    CompositeOperator(String, String),
    #[error("A {0} filter definition already exists for the {1} operator")]
    DuplicateDefinition(String, String),
}
