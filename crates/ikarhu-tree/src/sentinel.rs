//! Out-of-band markers used inside change trees.
//!
//! In memory the sentinels are the [`Change::Deleted`](crate::Change::Deleted),
//! [`Change::Null`](crate::Change::Null) and
//! [`Change::Replace`](crate::Change::Replace) variants. These constants are
//! their JSON spelling, used by [`crate::codec`].

/// JSON spelling of the "remove this key" marker.
pub const DELETED: &str = "__deleted__";

/// JSON spelling of the "set this key to null" marker.
///
/// Only diff mode produces it; a plain `null` in a change tree already means
/// "assign null" in apply mode.
pub const NULL_MARKER: &str = "__null__";


/// JSON key of the "assign this structure wholesale" wrapper:
/// `{"__replace__": {...}}` or `{"__replace__": [...]}`.
pub const REPLACE: &str = "__replace__";
