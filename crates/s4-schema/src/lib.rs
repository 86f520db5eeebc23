//! Schema files for S4 dispatch.
//!
//! An `s4.toml` file declares classes, unions, generics and methods. It is
//! parsed with [`Schema::from_str`]/[`Schema::from_file`] and turned into a
//! `Dispatcher<String>` with [`load`]. Every error carries the byte span of
//! the entry it concerns so it can be rendered against the file.

pub mod error;
pub mod load;
pub mod schema;

pub use error::SchemaError;
pub use load::{load, load_str};
pub use schema::{ClassEntry, GenericEntry, MethodEntry, Schema, UnionEntry};
