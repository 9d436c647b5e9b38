//! Form core: aggregation, bracket decoding and completion.
//!
//! Parts arrive as `(name, value)` pairs. Repeated names are folded by an
//! [`EntryAggregator`], bracketed names are expanded by [`decode`], and
//! [`Completion`] makes sure each request ends in exactly one [`Outcome`].
//!
//! ## Example
//!
//! ```rust
//! use formtree::form::{decode, EntryAggregator};
//!
//! let mut fields = EntryAggregator::new();
//! fields.record("user[name][first]", "tobi");
//! fields.record("user[age]", "1");
//!
//! let body = decode(fields.into_flat_map()).unwrap();
//! let user = body.get("user").unwrap();
//! assert_eq!(user.get("age").and_then(|age| age.as_str()), Some("1"));
//! ```

mod aggregator;
mod completion;
mod decoder;
mod entry;
mod error;
mod tree;

pub use aggregator::{EntryAggregator, FlatMap};
pub use completion::{Completion, CompletionState, Outcome, ParsedForm, parse_form};
pub use decoder::{DecodeError, Segment, decode, parse_path};
pub use entry::{AggregatedValue, Entry, FileHandle};
pub use error::FormError;
pub use tree::{NestedTree, NodeKind};
