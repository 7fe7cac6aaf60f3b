//! Route-tree introspection for Ravelin.
//!
//! Turns a host framework's compiled routing tree into a canonical endpoint
//! registry:
//! - [`decoder`] recovers `/users/:id` style templates from compiled matchers
//! - [`walker`] flattens the tree depth-first, merging duplicate paths
//! - [`registry`] indexes the result and resolves request paths
//!
//! # Usage
//!
//! ```ignore
//! use ravelin_routes::{load_tree, Registry, RouteMatch};
//!
//! let tree = load_tree(Path::new("routes.json"))?;
//! let registry = Registry::build(&tree);
//!
//! if let RouteMatch::Found { endpoint, params } = registry.lookup("/users/42") {
//!     println!("{} {:?}", endpoint.path, params);
//! }
//! ```

pub mod decoder;
pub mod error;
pub mod layer;
pub mod registry;
pub mod template;
pub mod walker;

pub use decoder::{decode, DecodedPath};
pub use error::RouteError;
pub use layer::{
    load_tree, Capabilities, CompiledMatcher, HandlerRef, Layer, MountLayer, ParamKey,
    RouteLayer, RoutePath,
};
pub use registry::{normalize_path, Registry, RouteMatch};
pub use template::{PathTemplate, Segment};
pub use walker::{EndpointKind, EndpointRecord, RouteTable, Walker};
