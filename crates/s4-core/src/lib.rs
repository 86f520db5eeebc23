//! S4 dispatch: multiple dispatch over a user-declared class hierarchy.
//!
//! A generic function owns a table of methods, each keyed by a tuple of
//! declared classes. A call supplies the concrete class of every dispatch
//! argument; the resolver picks the applicable method whose classes sit
//! closest to the concrete ones, with `ANY` as a last resort and `missing`
//! for absent arguments. Ties are settled by canonical signature order and
//! reported as ambiguity warnings. Outcomes are memoized per class tuple.
//!
//! # Architecture
//!
//! - [`class`]: Class names, ids and the reserved dispatch tokens
//! - [`hierarchy`]: Class registry with cycle checks, unions and distances
//! - [`table`]: Generic functions and their method signatures
//! - [`resolve`]: Ranking of applicable methods and next-method selection
//! - [`cache`]: Memoized resolutions with per-generic invalidation
//! - [`dispatcher`]: The thread-safe facade hosts embed
//! - [`error`]: Error taxonomy and ambiguity warnings
//! - [`diagnostics`]: Ariadne and JSON rendering of errors and warnings
//! - [`config`]: Dispatcher configuration

pub mod cache;
pub mod class;
pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod hierarchy;
pub mod resolve;
pub mod table;

pub use cache::CacheStats;
pub use class::{classes, render_signature, ClassId, ClassName, GenericId, MethodId, ANY, MISSING};
pub use config::DispatchConfig;
pub use diagnostics::{Diagnostic, DiagnosticOptions};
pub use dispatcher::{CallContext, Dispatcher, Handler};
pub use error::{AmbiguousDispatch, DispatchError};
pub use hierarchy::{ClassDef, ClassHierarchy, ClassNode};
pub use resolve::{Resolution, ANY_DISTANCE};
pub use table::MethodSignature;
