//! Mutable flat arrays.
//!
//! This module provides [`MutableArray`], a fixed-length contiguous buffer
//! with O(1) indexed access, in-place algorithms (fill, quicksort, rotation),
//! and the traversal repertoire shared with the persistent structures. It is
//! the substrate the persistent radix tree builds its nodes from.

mod array;

pub use array::MutableArray;
