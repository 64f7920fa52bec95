//! # radix-array
//!
//! Persistent (immutable) indexed sequences with structural sharing, built on
//! a 32-way radix-balanced tree, plus the flat mutable array they build on.
//!
//! ## Overview
//!
//! The crate provides three collaborating structures:
//!
//! - [`MutableArray`]: a flat, fixed-length buffer with O(1) indexed
//!   read/write, in-place quicksort and rotation, and the usual traversal
//!   repertoire. Negative indices wrap from the end.
//! - [`PersistentArray`]: an immutable indexed sequence with O(log32 N)
//!   random access, update, and append (amortized O(1) via a tail buffer).
//!   Every operation returns a new array sharing untouched subtrees with its
//!   predecessor.
//! - [`PersistentList`]: an immutable cons list used for list interop and
//!   as the substrate of list-level sorting.
//!
//! ## Feature Flags
//!
//! - `arc`: use `Arc` instead of `Rc` for structural sharing, making the
//!   persistent structures `Send`/`Sync` for read-side sharing.
//! - `serde`: serialization support for all three structures.
//!
//! ## Example
//!
//! ```rust
//! use radix_array::persistent::PersistentArray;
//!
//! let array: PersistentArray<i32> = (0..1000).collect();
//! assert_eq!(array.get(500), Ok(&500));
//!
//! // Structural sharing: the original array is preserved
//! let updated = array.set(500, -1).unwrap();
//! assert_eq!(array.get(500), Ok(&500));
//! assert_eq!(updated.get(500), Ok(&-1));
//! ```
//!
//! [`MutableArray`]: crate::mutable::MutableArray
//! [`PersistentArray`]: crate::persistent::PersistentArray
//! [`PersistentList`]: crate::persistent::PersistentList

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod error;
pub mod mutable;
pub mod persistent;

pub use error::{Error, Result};

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types.
///
/// # Usage
///
/// ```rust
/// use radix_array::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::mutable::MutableArray;
    pub use crate::persistent::{PersistentArray, PersistentList};
}
