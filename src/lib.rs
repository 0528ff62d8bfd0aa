//! # formdrop
//!
//! Decode an HTTP `multipart/form-data` body into two structured trees:
//! scalar and nested form-field values, and uploaded-file handles, keyed by
//! bracket-notation field names (`a[b][]=1`).
//!
//! The whole pipeline runs over a fully buffered body: boundary extraction
//! from the `Content-Type` header value, segmentation on the boundary
//! delimiter, per-part header parsing, content-disposition classification,
//! and reconstruction of nested trees from flat bracket-notation keys.
//! Concrete file objects are never constructed here — file parts go through
//! the caller-supplied [`UploadFactory`] and the opaque handles it returns
//! end up at the leaves of the file tree.

pub mod error;
pub mod header;
pub mod parser;
pub mod registry;
pub mod segment;
pub mod tree;

pub use crate::error::ParseError;
pub use crate::header::HeaderLine;
pub use crate::parser::{FormData, FormRequest, Parser, UploadFactory};
pub use crate::registry::UploadRegistry;
pub use crate::tree::{Node, build_tree};
