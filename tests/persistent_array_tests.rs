//! Unit tests for `PersistentArray`.
//!
//! This module contains behavioral tests for the persistent array,
//! organized by operation group.

use radix_array::error::Error;
use radix_array::mutable::MutableArray;
use radix_array::persistent::{PersistentArray, PersistentList};
use rstest::rstest;

// =============================================================================
// Construction
// =============================================================================

#[rstest]
fn test_new_creates_empty_array() {
    let array: PersistentArray<i32> = PersistentArray::new();
    assert!(array.is_empty());
    assert_eq!(array.len(), 0);
    assert!(array.get(0).is_err());
}

#[rstest]
fn test_init_fills_by_index() {
    let array = PersistentArray::init(5, |index| index + 3);
    assert_eq!(array.to_vec(), vec![3, 4, 5, 6, 7]);
}

#[rstest]
fn test_init_zero_length() {
    let array: PersistentArray<usize> = PersistentArray::init(0, |index| index);
    assert!(array.is_empty());
}

#[rstest]
fn test_make_repeats_value() {
    let array = PersistentArray::make(40, 'z');
    assert_eq!(array.len(), 40);
    assert!(array.every(|element| *element == 'z'));
}

#[rstest]
fn test_init_large() {
    let array = PersistentArray::init(1000, |index| index);
    assert_eq!(array.len(), 1000);
    for index in [0_usize, 31, 32, 500, 999] {
        assert_eq!(array.get(index as isize), Ok(&index));
    }
}

#[rstest]
fn test_from_list_and_to_list_round_trip() {
    let list: PersistentList<i32> = (1..=100).collect();
    let array = PersistentArray::from_list(&list);
    assert_eq!(array.len(), 100);
    assert_eq!(array.to_list(), list);

    let back: PersistentArray<i32> = PersistentArray::from_list(&array.to_list());
    assert_eq!(back, array);
}

// =============================================================================
// get / set
// =============================================================================

#[rstest]
fn test_get_routes_tail_and_tree() {
    let array: PersistentArray<usize> = (0..100).collect();
    // Indices 0..96 live in the tree, 96..100 in the tail.
    assert_eq!(array.get(0), Ok(&0));
    assert_eq!(array.get(95), Ok(&95));
    assert_eq!(array.get(96), Ok(&96));
    assert_eq!(array.get(99), Ok(&99));
}

#[rstest]
fn test_get_negative_wraps() {
    let array: PersistentArray<i32> = (1..=5).collect();
    assert_eq!(array.get(-1), Ok(&5));
    assert_eq!(array.get(-5), Ok(&1));
    assert_eq!(
        array.get(-6),
        Err(Error::IndexOutOfBounds {
            index: -6,
            length: 5
        })
    );
}

#[rstest]
fn test_set_preserves_original() {
    let array = PersistentArray::init(1000, |index| index as i64);
    let updated = array.set(500, -1).unwrap();

    assert_eq!(array.len(), 1000);
    assert_eq!(updated.len(), 1000);
    assert_eq!(updated.get(500), Ok(&-1));
    assert_eq!(array.get(500), Ok(&500));
}

#[rstest]
fn test_set_neighbors_untouched() {
    let array: PersistentArray<i32> = (0..200).collect();
    let updated = array.set(100, -1).unwrap();
    for index in 0..200 {
        let expected = if index == 100 { -1 } else { index };
        assert_eq!(updated.get(index as isize), Ok(&expected));
    }
}

#[rstest]
fn test_set_out_of_bounds() {
    let array: PersistentArray<i32> = (0..3).collect();
    assert_eq!(
        array.set(3, 9),
        Err(Error::IndexOutOfBounds {
            index: 3,
            length: 3
        })
    );
}

// =============================================================================
// push_back / pop_back
// =============================================================================

#[rstest]
fn test_push_back_sequence() {
    let mut array = PersistentArray::new();
    for index in 0..100_usize {
        array = array.push_back(index);
    }
    assert_eq!(array.len(), 100);
    for index in 0..100_usize {
        assert_eq!(array.get(index as isize), Ok(&index));
    }
}

#[rstest]
fn test_pop_back_inverts_push_back() {
    let array: PersistentArray<i32> = (0..50).collect();
    let pushed = array.push_back(99);
    let (popped, element) = pushed.pop_back().unwrap();
    assert_eq!(element, 99);
    assert_eq!(popped, array);
}

#[rstest]
fn test_pop_back_on_empty() {
    let array: PersistentArray<i32> = PersistentArray::new();
    assert!(array.pop_back().is_none());
}

// =============================================================================
// append / concat
// =============================================================================

#[rstest]
fn test_append_small() {
    let left = PersistentArray::from_list(&PersistentList::from_slice(&[1, 2]));
    let right = PersistentArray::from_list(&PersistentList::from_slice(&[3, 4, 5]));
    let combined = left.append(&right);
    assert_eq!(combined.to_vec(), vec![1, 2, 3, 4, 5]);
}

#[rstest]
fn test_append_prefix_and_suffix_preserved() {
    let left: PersistentArray<usize> = (0..70).collect();
    let right: PersistentArray<usize> = (70..450).collect();
    let combined = left.append(&right);

    assert_eq!(combined.len(), left.len() + right.len());
    for index in 0..70_usize {
        assert_eq!(combined.get(index as isize), left.get(index as isize));
    }
    for index in 70..450_usize {
        assert_eq!(
            combined.get(index as isize),
            right.get((index - 70) as isize)
        );
    }
}

#[rstest]
fn test_append_stress_singletons() {
    let mut accumulator = PersistentArray::new();
    for index in 0..100_usize {
        accumulator = accumulator.append(&PersistentArray::singleton(index));
    }
    assert_eq!(accumulator.len(), 100);
    for index in 0..100_usize {
        assert_eq!(accumulator.get(index as isize), Ok(&index));
    }
}

#[rstest]
fn test_append_empty_identities() {
    let array: PersistentArray<i32> = (0..10).collect();
    let empty = PersistentArray::new();
    assert_eq!(empty.append(&array), array);
    assert_eq!(array.append(&empty), array);
}

#[rstest]
fn test_concat_folds_left() {
    let parts: Vec<PersistentArray<i32>> = vec![
        (0..3).collect(),
        PersistentArray::new(),
        (3..40).collect(),
        (40..41).collect(),
    ];
    let expected = parts
        .iter()
        .fold(PersistentArray::new(), |accumulator, part| {
            accumulator.append(part)
        });
    assert_eq!(PersistentArray::concat(parts), expected);
    assert_eq!(expected.to_vec(), (0..41).collect::<Vec<_>>());
}

// =============================================================================
// slice / rotate
// =============================================================================

#[rstest]
fn test_slice_with_negative_end() {
    let array: PersistentArray<char> = vec!['a', 'b', 'c'].into_iter().collect();
    assert_eq!(array.slice(1, -1).to_vec(), vec!['b']);
}

#[rstest]
fn test_slice_identity_and_empty() {
    let array: PersistentArray<i32> = (0..50).collect();
    assert_eq!(array.slice(0, 50), array);
    assert!(array.slice(7, 7).is_empty());
    assert!(array.slice(-100, -100).is_empty());
}

#[rstest]
fn test_slice_split_recombines() {
    let array: PersistentArray<i32> = (0..75).collect();
    for split in [0_isize, 1, 31, 32, 33, 74, 75] {
        let recombined = array.slice(0, split).append(&array.slice(split, 75));
        assert_eq!(recombined, array, "split at {split}");
    }
}

#[rstest]
fn test_rotate_examples() {
    let array: PersistentArray<i32> = (1..=5).collect();
    assert_eq!(array.rotate(2).to_vec(), vec![3, 4, 5, 1, 2]);
    assert_eq!(array.rotate(-1).to_vec(), vec![5, 1, 2, 3, 4]);
    assert_eq!(array.rotate(0), array);
    assert_eq!(array.rotate(5), array);
    assert_eq!(array.rotate(7), array.rotate(2));
}

#[rstest]
fn test_rotate_empty_is_noop() {
    let array: PersistentArray<i32> = PersistentArray::new();
    assert!(array.rotate(3).is_empty());
}

// =============================================================================
// Derived traversals
// =============================================================================

#[rstest]
fn test_zip_with_products() {
    let left: PersistentArray<i32> = vec![1, 2, 3].into_iter().collect();
    let right: PersistentArray<i32> = vec![4, 5].into_iter().collect();
    let products = left.zip_with(&right, |a, b| a * b);
    assert_eq!(products.to_vec(), vec![4, 10]);
}

#[rstest]
fn test_zip_unzip_round_trip() {
    let numbers: PersistentArray<i32> = (0..40).collect();
    let doubled = numbers.map(|element| element * 2);
    let zipped = numbers.zip(&doubled);
    let (left, right) = zipped.unzip();
    assert_eq!(left, numbers);
    assert_eq!(right, doubled);
}

#[rstest]
fn test_map_preserves_length_and_order() {
    let array: PersistentArray<i32> = (0..300).collect();
    let mapped = array.map(|element| element + 1);
    assert_eq!(mapped.len(), array.len());
    assert_eq!(mapped.to_vec(), (1..=300).collect::<Vec<_>>());
}

#[rstest]
fn test_reduce_matches_list_fold() {
    let array: PersistentArray<i32> = (1..=100).collect();
    let list = array.to_list();
    assert_eq!(
        array.reduce(0, |accumulator, element| accumulator + element),
        list.fold_left(0, |accumulator, element| accumulator + element)
    );
}

#[rstest]
fn test_reduce_right_descending_order() {
    let array: PersistentArray<i32> = (1..=4).collect();
    let mut visited = Vec::new();
    array.reduce_right((), |element, ()| visited.push(*element));
    assert_eq!(visited, vec![4, 3, 2, 1]);
}

#[rstest]
fn test_filter_every_some_find() {
    let array: PersistentArray<i32> = (0..64).collect();
    let evens = array.filter(|element| element % 2 == 0);
    assert_eq!(evens.len(), 32);
    assert!(evens.every(|element| element % 2 == 0));
    assert!(array.some(|element| *element == 63));
    assert_eq!(array.find(|element| *element > 60), Some(&61));
    assert_eq!(array.find_index(|element| *element > 60), Some(61));
    assert_eq!(array.count(|element| element % 4 == 0), 16);
    assert!(array.contains(&33));
    assert!(!array.contains(&64));
}

#[rstest]
fn test_flat_map() {
    let array: PersistentArray<i32> = (1..=3).collect();
    let expanded = array.flat_map(|element| PersistentArray::make(2, *element));
    assert_eq!(expanded.to_vec(), vec![1, 1, 2, 2, 3, 3]);
}

#[rstest]
fn test_reverse_involution() {
    let array: PersistentArray<i32> = (0..150).collect();
    assert_eq!(array.reverse().reverse(), array);
    assert_eq!(array.reverse().get(0), Ok(&149));
}

#[rstest]
fn test_unique_and_join() {
    let array: PersistentArray<i32> = vec![2, 1, 2, 3, 1].into_iter().collect();
    assert_eq!(array.unique().to_vec(), vec![2, 1, 3]);
    assert_eq!(array.join("-"), "2-1-2-3-1");
}

#[rstest]
fn test_sort_by() {
    let array: PersistentArray<i32> = vec![9, 2, 7, 2, 5, 1].into_iter().collect();
    let ascending = array.sort_by(|a, b| a.cmp(b));
    assert_eq!(ascending.to_vec(), vec![1, 2, 2, 5, 7, 9]);
    let descending = array.sort_by(|a, b| b.cmp(a));
    assert_eq!(descending.to_vec(), vec![9, 7, 5, 2, 2, 1]);
}

#[rstest]
fn test_cycle() {
    let array: PersistentArray<i32> = (1..=3).collect();
    let mut visited = Vec::new();
    array.cycle(2, |element| visited.push(*element));
    assert_eq!(visited, vec![1, 2, 3, 1, 2, 3]);

    let mut untouched = true;
    array.cycle(0, |_| untouched = false);
    assert!(untouched);
}

#[rstest]
fn test_for_each_ascending() {
    let array: PersistentArray<usize> = (0..70).collect();
    let mut expected = 0;
    array.for_each(|element| {
        assert_eq!(*element, expected);
        expected += 1;
    });
    assert_eq!(expected, 70);
}

// =============================================================================
// Interop with MutableArray
// =============================================================================

#[rstest]
fn test_mutable_array_bridge() {
    let mutable = MutableArray::init(50, |index| index);
    let persistent: PersistentArray<usize> = mutable.iter().copied().collect();
    assert_eq!(persistent.len(), 50);
    assert_eq!(persistent.to_vec(), mutable.to_vec());
}

// =============================================================================
// Equality and iteration
// =============================================================================

#[rstest]
fn test_into_iterator() {
    let array: PersistentArray<i32> = (0..10).collect();
    let owned: Vec<i32> = array.clone().into_iter().collect();
    assert_eq!(owned, (0..10).collect::<Vec<_>>());

    let borrowed: Vec<&i32> = (&array).into_iter().collect();
    assert_eq!(borrowed.len(), 10);
}

#[rstest]
fn test_debug_format() {
    let array: PersistentArray<i32> = (1..=3).collect();
    assert_eq!(format!("{array:?}"), "[1, 2, 3]");
}

#[rstest]
fn test_default_is_empty() {
    let array: PersistentArray<i32> = PersistentArray::default();
    assert!(array.is_empty());
}
