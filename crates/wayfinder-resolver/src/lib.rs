//! OpenAPI 3.x and Swagger 2.0 spec resolver.
//!
//! Fetches YAML/JSON specs from a URL or the filesystem, inlines `$ref`
//! pointers (with cycle protection), and flattens `paths` into a list of
//! normalized endpoints ready for cataloging and search.

pub mod error;
pub mod fetch;
pub mod model;
pub mod resolver;

pub use error::{FetchError, ResolveError};
pub use fetch::fetch_spec;
pub use model::{Endpoint, Parameter, ParsedSpec};
pub use resolver::resolve_spec;
