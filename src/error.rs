//! Error types for the crate boundary.
//!
//! Only two things can go wrong on well-typed inputs: an index (after
//! negative wrapping) falls outside the addressable range, or an in-place
//! range operation is given an inverted or oversized range. Everything else
//! in the crate is total.

use thiserror::Error;

/// The error type returned by fallible operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The (possibly negative-wrapped) index falls outside `[0, length)`.
    ///
    /// Raised by [`PersistentArray::get`] and [`PersistentArray::set`].
    /// Derived traversals never raise this because they route through total
    /// iteration.
    ///
    /// [`PersistentArray::get`]: crate::persistent::PersistentArray::get
    /// [`PersistentArray::set`]: crate::persistent::PersistentArray::set
    #[error("index {index} is out of bounds for length {length}")]
    IndexOutOfBounds {
        /// The offending index, as supplied (before negative wrapping).
        index: isize,
        /// The length of the sequence that was indexed.
        length: usize,
    },

    /// An argument violated an operation's documented precondition.
    ///
    /// Raised by [`MutableArray::fill_range`] when `start > length` or
    /// `start > stop`.
    ///
    /// [`MutableArray::fill_range`]: crate::mutable::MutableArray::fill_range
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// A short description of the violated precondition.
        reason: &'static str,
    },
}

/// Convenience alias for `Result` with this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
