//! JSON-Pointer access for form data trees
//!
//! `formbind-pointer` resolves pointer strings against `serde_json::Value` trees.
//! It is the only code in formbind that mutates a data tree.
//!
//! # Pointer Syntax
//!
//! - Segments are separated by `/` and the pointer is root-relative
//! - A single leading `#` is accepted and stripped (`#/a/b` == `/a/b`)
//! - A missing leading `/` is added (`a/b` == `/a/b`)
//! - Empty segments are dropped when a [`Pointer`] is built (`/a//b/` == `/a/b`)
//! - `~1` decodes to `/` and `~0` decodes to `~` inside a segment
//! - Pure-digit segments address array indices, `-` appends to an array
//! - An index more than [`MAX_INDEX_GAP`] past the end of an array appends
//!
//! # Auto-vivification
//!
//! [`set_value`] never fails. Missing intermediate containers are created as
//! it walks: an array when the next segment is an index, an object otherwise.
//!
//! ```
//! use formbind_pointer::{get_value, set_value};
//! use serde_json::json;
//!
//! let mut data = json!({});
//! set_value(&mut data, "#/names/0", json!("x"));
//! assert_eq!(data, json!({"names": ["x"]}));
//! assert_eq!(get_value(&data, "/names/0"), Some(&json!("x")));
//! ```

pub mod access;
pub mod error;
pub mod flatten;
pub mod pointer;
pub mod schema;

pub use access::{get_value, get_value_mut, resolve_write_segments, set_value, MAX_INDEX_GAP};
pub use error::{PointerError, Result};
pub use flatten::object_flat;
pub use pointer::{escape_segment, normalize, segments, unescape_segment, Pointer};
pub use schema::{get_schema_value, schema_pointer};
