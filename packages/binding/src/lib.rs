//! dEF-Pi document binding - Validate and bind XML payloads against compiled
//! schema types.
//!
//! Schema compilation has already happened elsewhere; this crate consumes the
//! resulting type descriptors and content automata, validates inbound
//! documents against them, and renders bound instances back to XML.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use defpi_binding::{catalogue, Binder, Value};
//!
//! let registry = catalogue::create_books_registry().unwrap();
//! let binder = Binder::new(Arc::new(registry));
//!
//! let books = binder.bind_document("<books/>").unwrap();
//! assert_eq!(books.get("book"), Some(&Value::List(vec![])));
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Size, nesting and diagnosis limits
//! - [`error`]: Error types and Result alias
//! - [`schema`]: Qualified names, type descriptors, content automata, type registry
//! - [`value`]: Bound values and document instances
//! - [`binder`]: Validation, binding and rendering
//! - [`catalogue`]: Descriptors of the `urn:books` catalogue schema
//! - [`xml`]: XML utilities

pub mod binder;
pub mod catalogue;
pub mod config;
pub mod error;
pub mod schema;
pub mod value;
pub mod xml;

pub use binder::Binder;
pub use error::{BindingError, Result};
pub use schema::{
    Cardinality, ContentAutomaton, FieldDescriptor, QName, SchemaType, SchemaTypeBuilder,
    TypeRegistry, ValueKind,
};
pub use value::{DocumentInstance, Value};
