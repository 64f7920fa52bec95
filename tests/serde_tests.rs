#![cfg(feature = "serde")]

//! Integration tests for serde support.
//!
//! These tests verify that all data structures correctly serialize and
//! deserialize as plain sequences.

use radix_array::mutable::MutableArray;
use radix_array::persistent::{PersistentArray, PersistentList};
use rstest::rstest;

// =============================================================================
// PersistentArray
// =============================================================================

#[rstest]
fn test_array_serializes_as_sequence() {
    let array: PersistentArray<i32> = (1..=3).collect();
    let json = serde_json::to_string(&array).unwrap();
    assert_eq!(json, "[1,2,3]");
}

#[rstest]
fn test_array_json_roundtrip() {
    let array: PersistentArray<i32> = (0..500).collect();
    let json = serde_json::to_string(&array).unwrap();
    let restored: PersistentArray<i32> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, array);
}

#[rstest]
fn test_array_empty_roundtrip() {
    let array: PersistentArray<i32> = PersistentArray::new();
    let json = serde_json::to_string(&array).unwrap();
    assert_eq!(json, "[]");
    let restored: PersistentArray<i32> = serde_json::from_str(&json).unwrap();
    assert!(restored.is_empty());
}

#[rstest]
fn test_array_nested_roundtrip() {
    let inner1: PersistentArray<i32> = (1..=3).collect();
    let inner2: PersistentArray<i32> = (4..=6).collect();
    let outer: PersistentArray<PersistentArray<i32>> =
        vec![inner1, inner2].into_iter().collect();

    let json = serde_json::to_string(&outer).unwrap();
    let restored: PersistentArray<PersistentArray<i32>> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, outer);
}

// =============================================================================
// PersistentList
// =============================================================================

#[rstest]
fn test_list_json_roundtrip() {
    let list: PersistentList<i32> = (1..=10).collect();
    let json = serde_json::to_string(&list).unwrap();
    assert_eq!(json, "[1,2,3,4,5,6,7,8,9,10]");
    let restored: PersistentList<i32> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, list);
}

// =============================================================================
// MutableArray
// =============================================================================

#[rstest]
fn test_mutable_array_json_roundtrip() {
    let array = MutableArray::init(20, |index| index as i64);
    let json = serde_json::to_string(&array).unwrap();
    let restored: MutableArray<i64> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, array);
}

// =============================================================================
// Cross-structure
// =============================================================================

#[rstest]
fn test_array_and_list_share_wire_format() {
    let array: PersistentArray<i32> = (1..=40).collect();
    let json = serde_json::to_string(&array).unwrap();
    let as_list: PersistentList<i32> = serde_json::from_str(&json).unwrap();
    assert_eq!(as_list, array.to_list());
}
