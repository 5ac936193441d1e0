//! Sort engine
//!
//! In-place partition-exchange sort by record key. The pivot is the last
//! element of each range (Lomuto scheme). Ranges are tracked on an explicit
//! work stack instead of recursing, and the smaller side is always handled
//! first so the stack stays at O(log n) entries.
//!
//! Average O(n log n) comparisons; adversarial inputs (already sorted, all
//! keys equal) degrade to O(n²). Equal keys may be reordered.

use crate::record::Record;
use std::cmp::Ordering;

/// Sort records ascending by key, in place
pub fn sort_records(records: &mut [Record]) {
    if records.len() < 2 {
        return;
    }

    // Inclusive ranges [low, high]
    let mut stack: Vec<(usize, usize)> = vec![(0, records.len() - 1)];

    while let Some((low, high)) = stack.pop() {
        if low >= high {
            continue;
        }

        let pivot = partition_range(records, low, high);

        let left = (pivot > low).then(|| (low, pivot - 1));
        let right = (pivot < high).then(|| (pivot + 1, high));

        // Push the larger side first so the smaller one is popped next.
        match (left, right) {
            (Some(l), Some(r)) => {
                if l.1 - l.0 > r.1 - r.0 {
                    stack.push(l);
                    stack.push(r);
                } else {
                    stack.push(r);
                    stack.push(l);
                }
            }
            (Some(l), None) => stack.push(l),
            (None, Some(r)) => stack.push(r),
            (None, None) => {}
        }
    }
}

/// Lomuto partition of `records[low..=high]` around the last element
///
/// Returns the pivot's final index.
fn partition_range(records: &mut [Record], low: usize, high: usize) -> usize {
    let mut store = low;
    for j in low..high {
        if records[j].cmp_key(&records[high]) == Ordering::Less {
            records.swap(store, j);
            store += 1;
        }
    }
    records.swap(store, high);
    store
}

/// True when records are non-decreasing by key
pub fn is_sorted_by_key(records: &[Record]) -> bool {
    records
        .windows(2)
        .all(|pair| pair[0].cmp_key(&pair[1]) != Ordering::Greater)
}
