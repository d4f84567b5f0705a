//! Change-description trees for ikarhu.
//!
//! A [`ChangeTree`] describes what changed in a mutable graph, shaped like the
//! changed part of the graph itself. A key that is absent means "unchanged";
//! removal and explicit null are marked with the [`Change::Deleted`] and
//! [`Change::Null`] sentinels, and a structure that must be assigned rather
//! than merged into is wrapped in [`Change::Replace`].
//!
//! # Example
//!
//! ```
//! use ikarhu_tree::{codec, merge_deep, Change, ChangeTree};
//! use serde_json::json;
//!
//! let mut batch = ChangeTree::new();
//! merge_deep(&mut batch, codec::from_json(&json!({"a": {"b": 1}})).unwrap());
//! merge_deep(&mut batch, codec::from_json(&json!({"a": {"c": "__deleted__"}})).unwrap());
//!
//! assert_eq!(codec::to_json(&batch), json!({"a": {"b": 1, "c": "__deleted__"}}));
//! assert!(matches!(batch.get("a"), Some(Change::Tree(_))));
//! ```

use thiserror::Error;

pub mod change;
pub mod codec;
pub mod merge;
pub mod order;
pub mod path;
pub mod sentinel;

pub use change::{Change, ChangeTree, Shape};
pub use merge::{merge_deep, merge_entry};
pub use order::{is_index, key_cmp, patch_order};
pub use path::{format_pointer, parse_pointer};
pub use sentinel::{DELETED, NULL_MARKER, REPLACE};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("a change tree must be an object or an array, got {0}")]
    NotATree(&'static str),
}
