//! # sqlens-db
//!
//! Database access for the sqlens server. This crate owns:
//!
//! - **Dialect selection**: product-name and URL matching, per-dialect
//!   row-limit rendering and bind-placeholder syntax.
//! - **The data-source seam**: [`QueryExecutor`] and [`CatalogReader`]
//!   traits, so the query engine and introspector never touch a concrete
//!   driver. [`AnySource`] implements both over a sqlx `AnyPool`.
//! - **The secure query engine**: the sole gate between caller-supplied
//!   query text and the database. SELECT-only, forbidden-keyword scan,
//!   row cap injection.
//! - **Catalog introspection**: schema structure, table details and
//!   trigger listing, normalized into one response shape per dialect,
//!   with a TTL cache keyed by input.

pub mod cache;
pub mod dialect;
pub mod introspect;
pub mod query;
pub mod source;

mod any;

pub use any::AnySource;
pub use cache::{MetadataCache, TtlCache};
pub use dialect::Dialect;
pub use introspect::Introspector;
pub use query::SecureQueryEngine;
pub use source::{
    CatalogColumn, CatalogConstraint, CatalogForeignKey, CatalogIndex, CatalogReader,
    QueryExecutor, RelationEntry, SourceError, SourceResult,
};
