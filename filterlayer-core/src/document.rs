//! Core traits for records stored in a collection.
//!
//! Every stored record implements [`Document`]; [`DocumentExt`] adds the BSON and JSON
//! conversions the stores and the predicate evaluator rely on.

use std::fmt::Display;

use bson::{Bson, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};

use crate::error::DataLayerResult;

/// Core trait that all stored records must implement.
///
/// A document has an identifier, rendered as a string key by the stores, and names the
/// collection it lives in. The serialized form is what filters are evaluated against, so
/// document keys used by predicate constructors must match the serde field names.
///
/// # Example
///
/// ```ignore
/// use filterlayer::document::Document;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Student {
///     pub id: i32,
///     pub name: String,
/// }
///
/// impl Document for Student {
///     type Id = i32;
///
///     fn id(&self) -> &i32 {
///         &self.id
///     }
///
///     fn collection_name() -> &'static str {
///         "students"
///     }
/// }
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// The identifier type. Its `Display` output is the storage key.
    type Id: Display + Clone + Send + Sync + 'static;

    /// Returns a reference to this document's identifier.
    fn id(&self) -> &Self::Id;

    /// Returns the name of the collection this document belongs to.
    ///
    /// This should be a static, lowercase identifier (e.g., "students", "courses").
    fn collection_name() -> &'static str;
}

/// Conversion helpers, implemented for every [`Document`].
pub trait DocumentExt: Document {
    /// The storage key for this document.
    fn document_id(&self) -> String;

    /// Converts this document to a BSON value for storage.
    fn to_bson(&self) -> DataLayerResult<Bson>;

    /// Creates a document from a BSON value.
    fn from_bson(bson: Bson) -> DataLayerResult<Self>;

    /// Converts this document to a JSON value.
    fn to_json(&self) -> DataLayerResult<Value>;

    /// Creates a document from a JSON value.
    fn from_json(value: Value) -> DataLayerResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn document_id(&self) -> String {
        self.id().to_string()
    }

    fn to_bson(&self) -> DataLayerResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    fn from_bson(bson: Bson) -> DataLayerResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    fn to_json(&self) -> DataLayerResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DataLayerResult<Self> {
        Ok(from_value(value)?)
    }
}
