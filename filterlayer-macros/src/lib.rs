//! Procedural macros for the filterlayer project.
//!
//! `#[derive(FilterFields)]` generates one [`Field`] descriptor constant per struct
//! field, so filter rules, predicate registrations and filter trees can name fields
//! without repeating string keys.
//!
//! ```ignore
//! use filterlayer::FilterFields;
//!
//! #[derive(Serialize, Deserialize, FilterFields)]
//! pub struct Student {
//!     pub id: i32,
//!     #[serde(rename = "fullName")]
//!     pub name: String,
//!     #[filter(skip)]
//!     pub notes: Vec<String>,
//! }
//!
//! // Student::ID   == Field::<Student, i32>::new("Id", "id")
//! // Student::NAME == Field::<Student, String>::new("Name", "fullName")
//! ```
//!
//! Field attributes:
//!
//! - `#[filter(name = "...")]` overrides the filter name (PascalCase of the field by default).
//! - `#[filter(skip)]` generates nothing for the field. `#[serde(skip)]` does the same.
//!
//! The document key follows `#[serde(rename = "...")]` and a container-level
//! `#[serde(rename_all = "...")]`. A container-level `#[filter(crate = "...")]` changes
//! the path the generated code uses to reach the `filterlayer` crate.
//!
//! [`Field`]: https://docs.rs/filterlayer/latest/filterlayer/filter/struct.Field.html

mod case;
mod filter_fields;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

#[proc_macro_derive(FilterFields, attributes(filter))]
pub fn derive_filter_fields(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    filter_fields::expand(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
