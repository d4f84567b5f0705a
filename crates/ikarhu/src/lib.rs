//! Observable nested graphs.
//!
//! Wrap a mapping or sequence in an [`Observed`] root and mutate it through
//! views. Every write, at any depth, is described as a [`ChangeTree`] shaped
//! like the changed part of the graph, merged into one batch per root and
//! delivered to listeners once the [`Scheduler`] runs the deferred flush.
//! The same trees can be applied to another graph with [`Observed::patch`],
//! or used as a full document with [`Observed::diff`], so two graphs can be
//! kept in sync by forwarding batches.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use ikarhu::{codec, Observed};
//! use serde_json::json;
//!
//! let root = Observed::from_json(json!({"a": {"b": {"c": 1}}})).unwrap();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! root.listen(move |changes, _priors| sink.borrow_mut().push(codec::to_json(changes)));
//!
//! let b = root.at_ptr("/a/b").and_then(|f| f.into_view()).unwrap();
//! b.set("c", 2).unwrap();
//! b.set("d", "new").unwrap();
//! assert!(seen.borrow().is_empty());
//!
//! ikarhu::run_pending();
//! assert_eq!(*seen.borrow(), vec![json!({"a": {"b": {"c": 2, "d": "new"}}})]);
//! ```

pub mod cli;
mod dispatch;
mod error;
mod identity;
mod listeners;
pub mod node;
pub mod patch;
pub mod scheduler;
pub mod value;
mod view;

pub use error::ObserveError;
pub use ikarhu_tree::{codec, Change, ChangeTree, Shape, DELETED, NULL_MARKER, REPLACE};
pub use listeners::ListenerId;
pub use node::{Node, NodeError, NodeId};
pub use patch::{PatchOptions, PatchReport};
pub use scheduler::{run_pending, Scheduler, Task, TaskHandle, TaskQueue};
pub use value::Value;
pub use view::{Field, Observed, Relay};
