//! Persistent (immutable) array based on a radix-balanced tree.
//!
//! This module provides [`PersistentArray`], an immutable indexed sequence
//! backed by a 32-way branching radix tree of [`MutableArray`]-backed nodes
//! plus a tail buffer of at most 31 elements.
//!
//! # Overview
//!
//! `PersistentArray` provides:
//!
//! - O(log32 N) random access and update (effectively O(1) in practice)
//! - amortized O(1) `push_back` via the tail buffer
//! - O(min(N, M)) append with bulk reconstruction for large right operands
//! - O(1) `len` and `is_empty`
//!
//! All operations return new arrays without modifying the original, and
//! structural sharing keeps updates cheap: a point update copies one
//! root-to-leaf path and shares every sibling.
//!
//! # Internal Structure
//!
//! The array consists of:
//! - a root, held as its sequence of top-level nodes (so the empty case is
//!   just an empty sequence),
//! - a tail buffer collecting appended elements until 32 have accumulated,
//!   at which point the full tail is promoted into the tree as a new leaf.
//!
//! Because promotion is eager, the tree portion always holds an exact
//! multiple of 32 elements, every leaf is full, and only the rightmost
//! internal node at each level may have fewer than 32 children. Indices
//! below `tail_start = (length >> 5) << 5` live in the tree; the rest live
//! in the tail. That split is the only routing decision access needs.
//!
//! # Examples
//!
//! ```rust
//! use radix_array::persistent::PersistentArray;
//!
//! let array = PersistentArray::new()
//!     .push_back(1)
//!     .push_back(2)
//!     .push_back(3);
//!
//! assert_eq!(array.get(0), Ok(&1));
//! assert_eq!(array.get(-1), Ok(&3));
//!
//! // Structural sharing: the original array is preserved
//! let extended = array.push_back(4);
//! assert_eq!(array.len(), 3);
//! assert_eq!(extended.len(), 4);
//! ```

use std::fmt;
use std::iter::FromIterator;

use smallvec::SmallVec;

use super::ReferenceCounter;
use crate::error::{Error, Result};
use crate::mutable::MutableArray;
use crate::persistent::PersistentList;

// =============================================================================
// Constants
// =============================================================================

/// Branching factor (2^5 = 32)
const BRANCHING_FACTOR: usize = 32;

/// Bits per level in the tree
const BITS_PER_LEVEL: usize = 5;

/// Bit mask for extracting the slot within a node
const MASK: usize = BRANCHING_FACTOR - 1;

/// Right-hand operands larger than this are appended by rebuilding through
/// the builder instead of leaf-by-leaf tail fusion. The constant factor of
/// flattening the left operand pays off only against sufficiently large
/// right-hand sides.
const BUILDER_THRESHOLD: usize = 4 * BRANCHING_FACTOR;

// =============================================================================
// Node Definition
// =============================================================================

/// A tree node: an internal node holding 1..=32 children, or a leaf holding
/// exactly 32 values. All children of an internal node are of one kind, and
/// depth is uniform across the tree.
enum Node<T> {
    Internal(MutableArray<NodeRef<T>>),
    Leaf(MutableArray<T>),
}

/// Shared handle to a published, immutable node.
type NodeRef<T> = ReferenceCounter<Node<T>>;

// =============================================================================
// PersistentArray Definition
// =============================================================================

/// A persistent (immutable) array based on a radix-balanced tree.
///
/// `PersistentArray` is an immutable data structure that uses structural
/// sharing to efficiently support functional programming patterns. Negative
/// indices wrap from the end wherever an index parameter appears.
///
/// # Time Complexity
///
/// | Operation   | Complexity                 |
/// |-------------|----------------------------|
/// | `new`       | O(1)                       |
/// | `get`/`set` | O(log32 N)                 |
/// | `push_back` | O(log32 N), amortized O(1) |
/// | `pop_back`  | O(log32 N)                 |
/// | `append`    | O(min(N, M))               |
/// | `len`       | O(1)                       |
/// | `slice`     | O(end - start)             |
///
/// # Examples
///
/// ```rust
/// use radix_array::persistent::PersistentArray;
///
/// let array: PersistentArray<i32> = (0..100).collect();
/// assert_eq!(array.len(), 100);
/// assert_eq!(array.get(50), Ok(&50));
/// ```
pub struct PersistentArray<T> {
    /// Total number of elements.
    length: usize,
    /// Bit shift of the root level: `BITS_PER_LEVEL * depth`, never below
    /// `BITS_PER_LEVEL` even when the root is empty.
    shift: usize,
    /// The root's child sequence.
    root: ReferenceCounter<MutableArray<NodeRef<T>>>,
    /// Tail buffer holding the last `length % 32` elements.
    tail: ReferenceCounter<MutableArray<T>>,
}

impl<T> PersistentArray<T> {
    /// Creates a new empty array.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use radix_array::persistent::PersistentArray;
    ///
    /// let array: PersistentArray<i32> = PersistentArray::new();
    /// assert!(array.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            length: 0,
            shift: BITS_PER_LEVEL,
            root: ReferenceCounter::new(MutableArray::new()),
            tail: ReferenceCounter::new(MutableArray::new()),
        }
    }

    /// Creates an array containing a single element.
    #[inline]
    #[must_use]
    pub fn singleton(element: T) -> Self {
        Self {
            length: 1,
            shift: BITS_PER_LEVEL,
            root: ReferenceCounter::new(MutableArray::new()),
            tail: ReferenceCounter::new(MutableArray::from_vec(vec![element])),
        }
    }

    /// Returns the number of elements in the array. O(1).
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the array contains no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// First index that lives in the tail rather than the tree.
    const fn tail_start(length: usize) -> usize {
        (length >> BITS_PER_LEVEL) << BITS_PER_LEVEL
    }

    /// Wraps a possibly-negative index and bounds-checks it.
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn wrap_index(&self, index: isize) -> Result<usize> {
        let length = self.length as isize;
        let wrapped = if index < 0 { index + length } else { index };
        if (0..length).contains(&wrapped) {
            Ok(wrapped as usize)
        } else {
            Err(Error::IndexOutOfBounds {
                index,
                length: self.length,
            })
        }
    }

    /// Returns a reference to the element at the given index.
    ///
    /// Negative indices wrap from the end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] when the wrapped index falls
    /// outside `[0, length)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use radix_array::persistent::PersistentArray;
    ///
    /// let array: PersistentArray<i32> = (1..=5).collect();
    /// assert_eq!(array.get(0), Ok(&1));
    /// assert_eq!(array.get(-1), Ok(&5));
    /// assert!(array.get(10).is_err());
    /// ```
    pub fn get(&self, index: isize) -> Result<&T> {
        let position = self.wrap_index(index)?;
        if position >= Self::tail_start(self.length) {
            Ok(&self.tail[position & MASK])
        } else {
            Ok(&self.leaf_for(position)[position & MASK])
        }
    }

    /// Descends the tree to the leaf holding `position`.
    ///
    /// The caller guarantees `position < tail_start(length)`.
    fn leaf_for(&self, position: usize) -> &MutableArray<T> {
        let mut children = self.root.as_ref();
        let mut level = self.shift;
        loop {
            match children[(position >> level) & MASK].as_ref() {
                Node::Internal(next_children) => {
                    children = next_children;
                    level -= BITS_PER_LEVEL;
                }
                Node::Leaf(values) => return values,
            }
        }
    }

    /// Returns a reference to the first element, or `None` if empty.
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.get(0).ok()
    }

    /// Returns a reference to the last element, or `None` if empty.
    ///
    /// O(1) whenever the tail is non-empty, which is every length that is
    /// not a multiple of 32.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        if self.tail.is_empty() {
            if self.length == 0 {
                None
            } else {
                self.get(-1).ok()
            }
        } else {
            self.tail.last()
        }
    }

    /// Returns an iterator over references to the elements, front to back.
    #[must_use]
    pub const fn iter(&self) -> PersistentArrayIterator<'_, T> {
        PersistentArrayIterator {
            array: self,
            current_index: 0,
        }
    }

    /// Calls `function` on each element in ascending index order.
    pub fn for_each<F>(&self, function: F)
    where
        F: FnMut(&T),
    {
        self.iter().for_each(function);
    }

    /// Runs the ascending traversal `times` times over.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use radix_array::persistent::PersistentArray;
    ///
    /// let array: PersistentArray<i32> = (1..=3).collect();
    /// let mut visited = Vec::new();
    /// array.cycle(2, |element| visited.push(*element));
    /// assert_eq!(visited, vec![1, 2, 3, 1, 2, 3]);
    /// ```
    pub fn cycle<F>(&self, times: usize, mut function: F)
    where
        F: FnMut(&T),
    {
        for _ in 0..times {
            for element in self.iter() {
                function(element);
            }
        }
    }

    /// Builds a new array by applying `function` to each element.
    ///
    /// Preserves length.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use radix_array::persistent::PersistentArray;
    ///
    /// let array: PersistentArray<i32> = (1..=3).collect();
    /// let doubled = array.map(|element| element * 2);
    /// assert_eq!(doubled.to_vec(), vec![2, 4, 6]);
    /// ```
    #[must_use]
    pub fn map<B, F>(&self, mut function: F) -> PersistentArray<B>
    where
        F: FnMut(&T) -> B,
    {
        let mut builder = Builder::new();
        for element in self.iter() {
            builder.push(function(element));
        }
        builder.finish()
    }

    /// Folds the elements in ascending index order.
    pub fn reduce<B, F>(&self, initial: B, mut function: F) -> B
    where
        F: FnMut(B, &T) -> B,
    {
        self.iter()
            .fold(initial, |accumulator, element| function(accumulator, element))
    }

    /// Folds the elements in descending index order.
    pub fn reduce_right<B, F>(&self, initial: B, mut function: F) -> B
    where
        F: FnMut(&T, B) -> B,
    {
        let elements: Vec<&T> = self.iter().collect();
        elements
            .into_iter()
            .rev()
            .fold(initial, |accumulator, element| function(element, accumulator))
    }

    /// Returns `true` if `predicate` holds for every element.
    ///
    /// Vacuously `true` on the empty array.
    pub fn every<P>(&self, predicate: P) -> bool
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().all(predicate)
    }

    /// Returns `true` if `predicate` holds for at least one element.
    pub fn some<P>(&self, predicate: P) -> bool
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().any(predicate)
    }

    /// Counts the elements for which `predicate` holds.
    pub fn count<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().filter(|element| predicate(element)).count()
    }

    /// Returns the first element for which `predicate` holds.
    pub fn find<P>(&self, mut predicate: P) -> Option<&T>
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().find(|element| predicate(element))
    }

    /// Returns the index of the first element for which `predicate` holds.
    pub fn find_index<P>(&self, predicate: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().position(predicate)
    }

    /// Returns `true` if some element equals `value`.
    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.iter().any(|element| element == value)
    }

    /// Renders the elements as a string with `separator` between them.
    #[must_use]
    pub fn join(&self, separator: &str) -> String
    where
        T: fmt::Display,
    {
        let mut rendered = String::new();
        for (index, element) in self.iter().enumerate() {
            if index > 0 {
                rendered.push_str(separator);
            }
            rendered.push_str(&element.to_string());
        }
        rendered
    }

    /// Applies `function` pairwise to this array and `other`, producing an
    /// array sized by the shorter operand.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use radix_array::persistent::PersistentArray;
    ///
    /// let left: PersistentArray<i32> = (1..=3).collect();
    /// let right: PersistentArray<i32> = (4..=5).collect();
    /// let products = left.zip_with(&right, |a, b| a * b);
    /// assert_eq!(products.to_vec(), vec![4, 10]);
    /// ```
    #[must_use]
    pub fn zip_with<U, C, F>(&self, other: &PersistentArray<U>, mut function: F) -> PersistentArray<C>
    where
        F: FnMut(&T, &U) -> C,
    {
        let mut builder = Builder::new();
        for (left, right) in self.iter().zip(other.iter()) {
            builder.push(function(left, right));
        }
        builder.finish()
    }

    /// Visits every leaf under `children` in left-to-right order.
    fn for_each_leaf<F>(children: &MutableArray<NodeRef<T>>, visit: &mut F)
    where
        F: FnMut(&NodeRef<T>),
    {
        for child in children.iter() {
            match child.as_ref() {
                Node::Internal(next_children) => Self::for_each_leaf(next_children, visit),
                Node::Leaf(_) => visit(child),
            }
        }
    }
}

impl<T: Clone> PersistentArray<T> {
    /// Builds an array of the given length, filling slot `index` with
    /// `function(index)`.
    ///
    /// Goes through the builder, so the tree is assembled leaf by leaf
    /// without intermediate promotions.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use radix_array::persistent::PersistentArray;
    ///
    /// let array = PersistentArray::init(5, |index| index + 3);
    /// assert_eq!(array.to_vec(), vec![3, 4, 5, 6, 7]);
    /// ```
    #[must_use]
    pub fn init<F>(length: usize, mut function: F) -> Self
    where
        F: FnMut(usize) -> T,
    {
        let mut builder = Builder::new();
        for index in 0..length {
            builder.push(function(index));
        }
        builder.finish()
    }

    /// Builds an array of the given length with every slot set to `value`.
    #[must_use]
    pub fn make(length: usize, value: T) -> Self {
        Self::init(length, |_| value.clone())
    }

    /// Builds an array from the elements of a [`PersistentList`], in order.
    #[must_use]
    pub fn from_list(list: &PersistentList<T>) -> Self {
        let mut builder = Builder::new();
        for element in list {
            builder.push(element.clone());
        }
        builder.finish()
    }

    /// Clones the elements into a [`PersistentList`], preserving order.
    #[must_use]
    pub fn to_list(&self) -> PersistentList<T> {
        self.iter().cloned().collect()
    }

    /// Clones the elements into a `Vec`, preserving order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    /// Returns a new array with `value` written at the given index.
    ///
    /// Only the root-to-leaf path of the touched slot is copied; every other
    /// node is shared with the original. A tail index copies only the tail
    /// buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] when the wrapped index falls
    /// outside `[0, length)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use radix_array::persistent::PersistentArray;
    ///
    /// let array: PersistentArray<i32> = (0..10).collect();
    /// let updated = array.set(5, 100).unwrap();
    /// assert_eq!(updated.get(5), Ok(&100));
    /// assert_eq!(array.get(5), Ok(&5)); // Original unchanged
    /// ```
    pub fn set(&self, index: isize, value: T) -> Result<Self> {
        let position = self.wrap_index(index)?;
        if position >= Self::tail_start(self.length) {
            let mut new_tail = self.tail.copy();
            new_tail[position & MASK] = value;
            Ok(Self {
                length: self.length,
                shift: self.shift,
                root: self.root.clone(),
                tail: ReferenceCounter::new(new_tail),
            })
        } else {
            let new_root = Self::set_in_tree(&self.root, self.shift, position, value);
            Ok(Self {
                length: self.length,
                shift: self.shift,
                root: ReferenceCounter::new(new_root),
                tail: self.tail.clone(),
            })
        }
    }

    /// Path-copies the spine down to `position` and writes `value` into the
    /// copied leaf. Off-path children are shared.
    fn set_in_tree(
        children: &MutableArray<NodeRef<T>>,
        level: usize,
        position: usize,
        value: T,
    ) -> MutableArray<NodeRef<T>> {
        let slot = (position >> level) & MASK;
        let mut new_children = children.copy();
        let replacement = match children[slot].as_ref() {
            Node::Internal(next_children) => Node::Internal(Self::set_in_tree(
                next_children,
                level - BITS_PER_LEVEL,
                position,
                value,
            )),
            Node::Leaf(values) => {
                let mut new_values = values.copy();
                new_values[position & MASK] = value;
                Node::Leaf(new_values)
            }
        };
        new_children[slot] = ReferenceCounter::new(replacement);
        new_children
    }

    /// Appends an element to the back of the array.
    ///
    /// Amortized O(1): 31 out of every 32 calls only copy the tail buffer;
    /// the 32nd promotes the full tail into the tree as a new leaf.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use radix_array::persistent::PersistentArray;
    ///
    /// let array = PersistentArray::new().push_back(1).push_back(2);
    /// assert_eq!(array.to_vec(), vec![1, 2]);
    /// ```
    #[must_use]
    pub fn push_back(&self, element: T) -> Self {
        let mut new_tail = self.tail.to_vec();
        new_tail.push(element);
        self.replace_tail(MutableArray::from_vec(new_tail))
    }

    /// Removes the last element, returning the shortened array and the
    /// element. Returns `None` on the empty array.
    ///
    /// When the pop empties the tail's window, the rightmost leaf is pulled
    /// back out of the tree to become the new tail, shrinking the root (and
    /// the depth) as needed.
    #[allow(clippy::cast_possible_wrap)]
    #[must_use]
    pub fn pop_back(&self) -> Option<(Self, T)> {
        if self.length == 0 {
            return None;
        }

        if self.tail.is_empty() {
            // Length is a multiple of 32: un-promote the rightmost leaf.
            let last_leaf = self.leaf_for(self.length - 1).copy();
            let element = last_leaf.last()?.clone();
            let new_tail = last_leaf.slice(0, last_leaf.len() as isize - 1);
            let trimmed = Self::remove_last_leaf(&self.root, self.shift, self.length - 1);
            let (new_root, new_shift) = Self::shrink_root(trimmed, self.shift);
            Some((
                Self {
                    length: self.length - 1,
                    shift: new_shift,
                    root: ReferenceCounter::new(new_root),
                    tail: ReferenceCounter::new(new_tail),
                },
                element,
            ))
        } else {
            let element = self.tail.last()?.clone();
            let shortened = self.tail.slice(0, self.tail.len() as isize - 1);
            Some((self.replace_tail(shortened), element))
        }
    }

    /// Swaps in a candidate tail of at most 32 elements.
    ///
    /// A tail shorter than 32 just replaces the old one (adjusting the
    /// length by the difference). A full tail of exactly 32 is promoted into
    /// the tree as a new leaf: if the root is already at capacity the depth
    /// grows by one level first, then the leaf is inserted along the
    /// rightmost spine.
    fn replace_tail(&self, new_tail: MutableArray<T>) -> Self {
        debug_assert!(new_tail.len() <= BRANCHING_FACTOR);

        if new_tail.len() < BRANCHING_FACTOR {
            return Self {
                length: self.length + new_tail.len() - self.tail.len(),
                shift: self.shift,
                root: self.root.clone(),
                tail: ReferenceCounter::new(new_tail),
            };
        }

        let new_length = self.length + (BRANCHING_FACTOR - self.tail.len());
        let leaf = ReferenceCounter::new(Node::Leaf(new_tail));
        let root_overflow = (new_length >> BITS_PER_LEVEL) > (1 << self.shift);

        let (new_shift, new_root) = if root_overflow {
            let wrapped = MutableArray::from_vec(vec![ReferenceCounter::new(Node::Internal(
                self.root.as_ref().copy(),
            ))]);
            let new_shift = self.shift + BITS_PER_LEVEL;
            (
                new_shift,
                Self::insert_leaf(&wrapped, new_shift, self.length, leaf),
            )
        } else {
            (
                self.shift,
                Self::insert_leaf(&self.root, self.shift, self.length, leaf),
            )
        };

        Self {
            length: new_length,
            shift: new_shift,
            root: ReferenceCounter::new(new_root),
            tail: ReferenceCounter::new(MutableArray::new()),
        }
    }

    /// Inserts a promoted leaf along the rightmost spine, path-copying.
    ///
    /// `old_length` is the length before promotion; shifting it by the
    /// current level selects the rightmost slot at that level.
    fn insert_leaf(
        children: &MutableArray<NodeRef<T>>,
        level: usize,
        old_length: usize,
        leaf: NodeRef<T>,
    ) -> MutableArray<NodeRef<T>> {
        let slot = (old_length >> level) & MASK;

        if slot >= children.len() {
            // Fresh rightmost slot: grow a branch down to the leaf level.
            let mut extended = children.to_vec();
            extended.push(Self::branch_to_leaf(level, leaf));
            return MutableArray::from_vec(extended);
        }

        let mut new_children = children.copy();
        new_children[slot] = match children[slot].as_ref() {
            Node::Internal(next_children) => ReferenceCounter::new(Node::Internal(
                Self::insert_leaf(next_children, level - BITS_PER_LEVEL, old_length, leaf),
            )),
            // This shouldn't happen in a well-formed tree: a leaf only ever
            // sits where `slot` is fresh.
            Node::Leaf(_) => leaf,
        };
        new_children
    }

    /// Wraps a leaf in empty internal nodes down from `level` to the leaf
    /// level.
    fn branch_to_leaf(level: usize, leaf: NodeRef<T>) -> NodeRef<T> {
        if level == BITS_PER_LEVEL {
            leaf
        } else {
            ReferenceCounter::new(Node::Internal(MutableArray::from_vec(vec![
                Self::branch_to_leaf(level - BITS_PER_LEVEL, leaf),
            ])))
        }
    }

    /// Removes the rightmost leaf, path-copying the spine. Returns the
    /// trimmed child sequence, which may be empty.
    #[allow(clippy::cast_possible_wrap)]
    fn remove_last_leaf(
        children: &MutableArray<NodeRef<T>>,
        level: usize,
        last_position: usize,
    ) -> MutableArray<NodeRef<T>> {
        let slot = (last_position >> level) & MASK;
        debug_assert_eq!(slot + 1, children.len());

        match children[slot].as_ref() {
            Node::Leaf(_) => children.slice(0, slot as isize),
            Node::Internal(next_children) => {
                let trimmed =
                    Self::remove_last_leaf(next_children, level - BITS_PER_LEVEL, last_position);
                if trimmed.is_empty() {
                    children.slice(0, slot as isize)
                } else {
                    let mut new_children = children.copy();
                    new_children[slot] = ReferenceCounter::new(Node::Internal(trimmed));
                    new_children
                }
            }
        }
    }

    /// Collapses single-child root levels left behind by leaf removal.
    fn shrink_root(
        root: MutableArray<NodeRef<T>>,
        shift: usize,
    ) -> (MutableArray<NodeRef<T>>, usize) {
        let mut root = root;
        let mut shift = shift;
        while shift > BITS_PER_LEVEL && root.len() == 1 {
            let collapsed = match root[0].as_ref() {
                Node::Internal(children) => children.copy(),
                Node::Leaf(_) => break,
            };
            root = collapsed;
            shift -= BITS_PER_LEVEL;
        }
        (root, shift)
    }

    /// Appends another array to this one.
    ///
    /// Small right operands (at most 128 elements) are fused into the tail
    /// leaf by leaf. Larger ones rebuild the result through the builder:
    /// the left operand is flattened to its leaves, the right operand's
    /// leaves and tail are streamed in, and the tree is reassembled
    /// bottom-up.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use radix_array::persistent::PersistentArray;
    ///
    /// let left: PersistentArray<i32> = (1..=2).collect();
    /// let right: PersistentArray<i32> = (3..=5).collect();
    /// assert_eq!(left.append(&right).to_vec(), vec![1, 2, 3, 4, 5]);
    /// ```
    #[must_use]
    pub fn append(&self, other: &Self) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }

        if other.length <= BUILDER_THRESHOLD {
            let mut combined = self.clone();
            Self::for_each_leaf(&other.root, &mut |leaf| {
                if let Node::Leaf(values) = leaf.as_ref() {
                    combined = combined.append_chunk(values);
                }
            });
            combined.append_chunk(&other.tail)
        } else {
            let mut builder = Builder::from_array(self);
            Self::for_each_leaf(&other.root, &mut |leaf| builder.push_leaf(leaf));
            builder.push_chunk(&other.tail);
            builder.finish()
        }
    }

    /// Fuses a chunk of at most 32 elements onto the end of the array.
    ///
    /// Fills the tail up to capacity first (promoting it when it reaches
    /// 32), then installs any remaining elements as the new tail.
    fn append_chunk(&self, chunk: &MutableArray<T>) -> Self {
        if chunk.is_empty() {
            return self.clone();
        }
        debug_assert!(chunk.len() <= BRANCHING_FACTOR);

        let room = BRANCHING_FACTOR - self.tail.len();
        let taken = room.min(chunk.len());
        let mut fused = self.tail.to_vec();
        fused.extend_from_slice(&chunk.as_slice()[..taken]);
        let promoted = self.replace_tail(MutableArray::from_vec(fused));

        if taken == chunk.len() {
            promoted
        } else {
            promoted.replace_tail(MutableArray::from_slice(&chunk.as_slice()[taken..]))
        }
    }

    /// Concatenates the arrays in order: a left fold of [`append`] starting
    /// from the empty array.
    ///
    /// [`append`]: PersistentArray::append
    ///
    /// # Examples
    ///
    /// ```rust
    /// use radix_array::persistent::PersistentArray;
    ///
    /// let parts: Vec<PersistentArray<i32>> =
    ///     vec![(1..=2).collect(), (3..=4).collect(), (5..=6).collect()];
    /// let combined = PersistentArray::concat(parts);
    /// assert_eq!(combined.to_vec(), vec![1, 2, 3, 4, 5, 6]);
    /// ```
    #[must_use]
    pub fn concat<I>(arrays: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        arrays
            .into_iter()
            .fold(Self::new(), |accumulator, array| accumulator.append(&array))
    }

    /// Returns a new array holding the elements in `[start, end)`.
    ///
    /// Negative bounds wrap from the end; both bounds are then clamped to
    /// `[0, length]`. An empty range yields the empty array.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use radix_array::persistent::PersistentArray;
    ///
    /// let array: PersistentArray<char> = vec!['a', 'b', 'c'].into_iter().collect();
    /// assert_eq!(array.slice(1, -1).to_vec(), vec!['b']);
    /// assert!(array.slice(2, 2).is_empty());
    /// ```
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    #[must_use]
    pub fn slice(&self, start: isize, end: isize) -> Self {
        let length = self.length as isize;
        let start = (if start < 0 { start + length } else { start }).clamp(0, length);
        let end = (if end < 0 { end + length } else { end }).clamp(0, length);
        if end <= start {
            return Self::new();
        }
        self.iter()
            .skip(start as usize)
            .take((end - start) as usize)
            .cloned()
            .collect()
    }

    /// Builds a new array holding only the elements for which `predicate`
    /// holds, in their original order.
    #[must_use]
    pub fn filter<P>(&self, mut predicate: P) -> Self
    where
        P: FnMut(&T) -> bool,
    {
        let mut builder = Builder::new();
        for element in self.iter() {
            if predicate(element) {
                builder.push(element.clone());
            }
        }
        builder.finish()
    }

    /// Applies `function` to each element and concatenates the results.
    #[must_use]
    pub fn flat_map<B, F>(&self, mut function: F) -> PersistentArray<B>
    where
        B: Clone,
        F: FnMut(&T) -> PersistentArray<B>,
    {
        let mut builder = Builder::new();
        for element in self.iter() {
            for mapped in function(element).iter() {
                builder.push(mapped.clone());
            }
        }
        builder.finish()
    }

    /// Returns a new array with the elements in reverse order.
    #[must_use]
    pub fn reverse(&self) -> Self {
        let elements: Vec<&T> = self.iter().collect();
        let mut builder = Builder::new();
        for element in elements.into_iter().rev() {
            builder.push(element.clone());
        }
        builder.finish()
    }

    /// Pairs this array's elements with `other`'s, sized by the shorter.
    #[must_use]
    pub fn zip<U: Clone>(&self, other: &PersistentArray<U>) -> PersistentArray<(T, U)> {
        self.zip_with(other, |left, right| (left.clone(), right.clone()))
    }

    /// Builds the cartesian product of two arrays as an array of pairs,
    /// ordered by the left operand first.
    #[must_use]
    pub fn product<U: Clone>(&self, other: &PersistentArray<U>) -> PersistentArray<(T, U)> {
        let mut builder = Builder::new();
        for left in self.iter() {
            for right in other.iter() {
                builder.push((left.clone(), right.clone()));
            }
        }
        builder.finish()
    }

    /// Builds a new array keeping only the first occurrence of each element.
    #[must_use]
    pub fn unique(&self) -> Self
    where
        T: PartialEq,
    {
        let mut kept: Vec<T> = Vec::new();
        for element in self.iter() {
            if !kept.contains(element) {
                kept.push(element.clone());
            }
        }
        kept.into_iter().collect()
    }

    /// Returns a new array sorted by the comparator.
    ///
    /// Sorting happens at the list level: the elements are drained into a
    /// [`PersistentList`], sorted there, and rebuilt into an array.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use radix_array::persistent::PersistentArray;
    ///
    /// let array: PersistentArray<i32> = vec![3, 1, 2].into_iter().collect();
    /// let sorted = array.sort_by(|a, b| a.cmp(b));
    /// assert_eq!(sorted.to_vec(), vec![1, 2, 3]);
    /// ```
    #[must_use]
    pub fn sort_by<F>(&self, comparator: F) -> Self
    where
        F: FnMut(&T, &T) -> std::cmp::Ordering,
    {
        Self::from_list(&self.to_list().sort_by(comparator))
    }

    /// Rotates the array left by `n` positions.
    ///
    /// `n` is taken modulo the length; a negative `n` rotates right. The
    /// result is `slice(k, length)` followed by `slice(0, k)`. Rotating the
    /// empty array is a no-op.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use radix_array::persistent::PersistentArray;
    ///
    /// let array: PersistentArray<i32> = (1..=5).collect();
    /// assert_eq!(array.rotate(2).to_vec(), vec![3, 4, 5, 1, 2]);
    /// assert_eq!(array.rotate(-1).to_vec(), vec![5, 1, 2, 3, 4]);
    /// ```
    #[allow(clippy::cast_possible_wrap)]
    #[must_use]
    pub fn rotate(&self, n: isize) -> Self {
        if self.is_empty() {
            return self.clone();
        }
        let length = self.length as isize;
        let split = n.rem_euclid(length);
        self.slice(split, length).append(&self.slice(0, split))
    }
}

// =============================================================================
// Specialized Methods for Tuple Elements
// =============================================================================

impl<A: Clone, B: Clone> PersistentArray<(A, B)> {
    /// Separates an array of pairs into two arrays.
    ///
    /// This is the inverse of [`zip`](PersistentArray::zip).
    #[must_use]
    pub fn unzip(&self) -> (PersistentArray<A>, PersistentArray<B>) {
        let mut lefts = Builder::new();
        let mut rights = Builder::new();
        for (left, right) in self.iter() {
            lefts.push(left.clone());
            rights.push(right.clone());
        }
        (lefts.finish(), rights.finish())
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Scratch structure for bulk construction.
///
/// Elements are packed into a partial tail; each time the tail fills, it is
/// flushed into a completed leaf. `finish` assembles the tree bottom-up by
/// repeatedly grouping 32 nodes under a fresh internal node, so building an
/// array of n elements performs O(n / 32) node allocations instead of the
/// O(n) promotions of repeated `push_back`.
///
/// The builder is thread-confined scratch owned by the operation that
/// creates it; nothing it holds is published until `finish` returns.
struct Builder<T> {
    /// Partial tail of 0..=31 pending values.
    tail: SmallVec<[T; BRANCHING_FACTOR]>,
    /// Completed leaves in logical left-to-right order.
    nodes: Vec<NodeRef<T>>,
}

impl<T> Builder<T> {
    fn new() -> Self {
        Self {
            tail: SmallVec::new(),
            nodes: Vec::new(),
        }
    }

    /// Adds one element, flushing the tail into a leaf when it fills.
    fn push(&mut self, element: T) {
        self.tail.push(element);
        if self.tail.len() == BRANCHING_FACTOR {
            let values: Vec<T> = self.tail.drain(..).collect();
            self.nodes
                .push(ReferenceCounter::new(Node::Leaf(MutableArray::from_vec(
                    values,
                ))));
        }
    }

    /// Assembles the final array: leaves are grouped 32 at a time under
    /// internal nodes until a single node remains, whose children become
    /// the root. The pending tail becomes the array's tail.
    fn finish(self) -> PersistentArray<T> {
        let Builder { tail, nodes } = self;
        let tail = MutableArray::from_vec(tail.into_vec());

        if nodes.is_empty() {
            return PersistentArray {
                length: tail.len(),
                shift: BITS_PER_LEVEL,
                root: ReferenceCounter::new(MutableArray::new()),
                tail: ReferenceCounter::new(tail),
            };
        }

        let tree_size = nodes.len() * BRANCHING_FACTOR;

        // Depth of the finished tree: how many times the highest tree index
        // can be shifted down a level before it vanishes.
        let mut depth = 0;
        let mut capacity = (tree_size - 1) >> BITS_PER_LEVEL;
        while capacity > 0 {
            depth += 1;
            capacity >>= BITS_PER_LEVEL;
        }

        let mut level_nodes = nodes;
        while level_nodes.len() > 1 {
            level_nodes = level_nodes
                .chunks(BRANCHING_FACTOR)
                .map(|chunk| ReferenceCounter::new(Node::Internal(MutableArray::from_slice(chunk))))
                .collect();
        }

        let top = level_nodes.remove(0);
        let root = match top.as_ref() {
            Node::Internal(children) => children.copy(),
            // A single leaf sits directly under the root.
            Node::Leaf(_) => MutableArray::from_vec(vec![top.clone()]),
        };

        PersistentArray {
            length: tree_size + tail.len(),
            shift: depth.max(1) * BITS_PER_LEVEL,
            root: ReferenceCounter::new(root),
            tail: ReferenceCounter::new(tail),
        }
    }
}

impl<T: Clone> Builder<T> {
    /// Seeds a builder with an existing array: its leaves become the
    /// completed-node list wholesale and its tail becomes the pending tail.
    fn from_array(array: &PersistentArray<T>) -> Self {
        let mut nodes = Vec::with_capacity(array.length >> BITS_PER_LEVEL);
        PersistentArray::for_each_leaf(&array.root, &mut |leaf| nodes.push(leaf.clone()));
        let mut tail = SmallVec::new();
        tail.extend(array.tail.iter().cloned());
        Self { tail, nodes }
    }

    /// Streams a shared leaf in. An aligned builder (empty pending tail)
    /// adopts the leaf wholesale; otherwise the values are re-packed.
    fn push_leaf(&mut self, leaf: &NodeRef<T>) {
        debug_assert!(matches!(leaf.as_ref(), Node::Leaf(_)));
        if self.tail.is_empty() {
            self.nodes.push(leaf.clone());
            return;
        }
        if let Node::Leaf(values) = leaf.as_ref() {
            for element in values.iter() {
                self.push(element.clone());
            }
        }
    }

    /// Streams a chunk of at most 32 values in.
    fn push_chunk(&mut self, values: &MutableArray<T>) {
        for element in values.iter() {
            self.push(element.clone());
        }
    }
}

// =============================================================================
// Iterator Implementations
// =============================================================================

/// An iterator over references to elements of a [`PersistentArray`].
pub struct PersistentArrayIterator<'a, T> {
    array: &'a PersistentArray<T>,
    current_index: usize,
}

impl<'a, T> Iterator for PersistentArrayIterator<'a, T> {
    type Item = &'a T;

    #[allow(clippy::cast_possible_wrap)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.current_index >= self.array.length {
            return None;
        }
        let item = self.array.get(self.current_index as isize).ok();
        self.current_index += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.array.length.saturating_sub(self.current_index);
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for PersistentArrayIterator<'_, T> {
    fn len(&self) -> usize {
        self.array.length.saturating_sub(self.current_index)
    }
}

/// An owning iterator over elements of a [`PersistentArray`].
pub struct PersistentArrayIntoIterator<T> {
    array: PersistentArray<T>,
    current_index: usize,
}

impl<T: Clone> Iterator for PersistentArrayIntoIterator<T> {
    type Item = T;

    #[allow(clippy::cast_possible_wrap)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.current_index >= self.array.length {
            return None;
        }
        let item = self.array.get(self.current_index as isize).ok().cloned();
        self.current_index += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.array.length.saturating_sub(self.current_index);
        (remaining, Some(remaining))
    }
}

impl<T: Clone> ExactSizeIterator for PersistentArrayIntoIterator<T> {
    fn len(&self) -> usize {
        self.array.length.saturating_sub(self.current_index)
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Clone for PersistentArray<T> {
    fn clone(&self) -> Self {
        Self {
            length: self.length,
            shift: self.shift,
            root: self.root.clone(),
            tail: self.tail.clone(),
        }
    }
}

impl<T> Default for PersistentArray<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for PersistentArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut builder = Builder::new();
        for element in iter {
            builder.push(element);
        }
        builder.finish()
    }
}

impl<T: Clone> IntoIterator for PersistentArray<T> {
    type Item = T;
    type IntoIter = PersistentArrayIntoIterator<T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        PersistentArrayIntoIterator {
            array: self,
            current_index: 0,
        }
    }
}

impl<'a, T> IntoIterator for &'a PersistentArray<T> {
    type Item = &'a T;
    type IntoIter = PersistentArrayIterator<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: PartialEq> PartialEq for PersistentArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<T: Eq> Eq for PersistentArray<T> {}

impl<T: fmt::Debug> fmt::Debug for PersistentArray<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for PersistentArray<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(feature = "serde")]
struct PersistentArrayVisitor<T> {
    marker: std::marker::PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<'de, T> serde::de::Visitor<'de> for PersistentArrayVisitor<T>
where
    T: serde::Deserialize<'de>,
{
    type Value = PersistentArray<T>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        // Note: streaming through the builder keeps memory proportional to
        // the finished tree even for large inputs.
        let mut builder = Builder::new();
        while let Some(element) = access.next_element()? {
            builder.push(element);
        }
        Ok(builder.finish())
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for PersistentArray<T>
where
    T: serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(PersistentArrayVisitor {
            marker: std::marker::PhantomData,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
impl<T> PersistentArray<T> {
    /// Walks the whole tree asserting the structural invariants: the tail
    /// bound, full leaves, non-rightmost fullness at every level, uniform
    /// depth, and the length bookkeeping.
    fn check_invariants(&self) {
        assert!(self.shift >= BITS_PER_LEVEL, "shift below minimum");
        assert!(
            self.tail.len() < BRANCHING_FACTOR,
            "tail was not promoted at capacity"
        );
        assert_eq!(
            self.tail.len(),
            self.length & MASK,
            "tail length out of step with total length"
        );

        let mut tree_total = 0;
        for (index, child) in self.root.iter().enumerate() {
            let must_be_full = index + 1 < self.root.len();
            tree_total += Self::check_node(child, self.shift, must_be_full);
        }
        assert_eq!(
            tree_total,
            Self::tail_start(self.length),
            "tree element count out of step with total length"
        );
    }

    fn check_node(node: &NodeRef<T>, level: usize, must_be_full: bool) -> usize {
        match node.as_ref() {
            Node::Leaf(values) => {
                assert_eq!(level, BITS_PER_LEVEL, "leaf at the wrong depth");
                assert_eq!(values.len(), BRANCHING_FACTOR, "partial leaf in the tree");
                values.len()
            }
            Node::Internal(children) => {
                assert!(level > BITS_PER_LEVEL, "internal node at leaf depth");
                assert!(!children.is_empty(), "empty internal node");
                assert!(children.len() <= BRANCHING_FACTOR, "overfull internal node");
                if must_be_full {
                    assert_eq!(
                        children.len(),
                        BRANCHING_FACTOR,
                        "non-rightmost node not full"
                    );
                }
                let mut total = 0;
                for (index, child) in children.iter().enumerate() {
                    let child_full = must_be_full || index + 1 < children.len();
                    total += Self::check_node(child, level - BITS_PER_LEVEL, child_full);
                }
                total
            }
        }
    }

    /// Number of children directly under the root, for promotion tests.
    fn root_width(&self) -> usize {
        self.root.len()
    }

    /// Current tail occupancy, for promotion tests.
    fn tail_len(&self) -> usize {
        self.tail.len()
    }
}
