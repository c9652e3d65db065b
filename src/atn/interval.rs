//! Ordered sets of integer intervals
//!
//! [`IntervalSet`] is the label type of set, not-set and merged transitions. It
//! holds closed intervals that are sorted, non-overlapping and non-adjacent, so
//! two sets with the same members always compare equal and hash the same.

use std::fmt;

/// A closed interval `start..=end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
    pub start: i32,
    pub end: i32,
}

impl Interval {
    pub fn new(start: i32, end: i32) -> Self {
        Interval { start, end }
    }

    /// Number of values covered by this interval
    pub fn len(&self) -> usize {
        (self.end as i64 - self.start as i64 + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, value: i32) -> bool {
        self.start <= value && value <= self.end
    }
}

/// Set of integers stored as sorted disjoint intervals
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IntervalSet {
    intervals: Vec<Interval>,
}

impl IntervalSet {
    pub fn new() -> Self {
        IntervalSet {
            intervals: Vec::new(),
        }
    }

    /// A set containing exactly one value
    pub fn of(value: i32) -> Self {
        let mut set = IntervalSet::new();
        set.add(value);
        set
    }

    /// A set containing `start..=end`
    pub fn of_range(start: i32, end: i32) -> Self {
        let mut set = IntervalSet::new();
        set.add_range(start, end);
        set
    }

    pub fn add(&mut self, value: i32) {
        self.add_range(value, value);
    }

    /// Add `start..=end`, merging with any overlapping or adjacent interval
    pub fn add_range(&mut self, start: i32, end: i32) {
        if start > end {
            return;
        }

        let mut merged = Interval::new(start, end);
        let lo = self
            .intervals
            .partition_point(|iv| (iv.end as i64) + 1 < start as i64);
        let mut hi = lo;
        while hi < self.intervals.len() && (self.intervals[hi].start as i64) <= (end as i64) + 1 {
            merged.start = merged.start.min(self.intervals[hi].start);
            merged.end = merged.end.max(self.intervals[hi].end);
            hi += 1;
        }
        self.intervals.splice(lo..hi, std::iter::once(merged));
    }

    /// Add every member of `other`
    pub fn add_set(&mut self, other: &IntervalSet) {
        for iv in &other.intervals {
            self.add_range(iv.start, iv.end);
        }
    }

    /// Remove a single value, splitting its interval when needed
    pub fn remove(&mut self, value: i32) {
        let Some(pos) = self.intervals.iter().position(|iv| iv.contains(value)) else {
            return;
        };
        let iv = self.intervals[pos];
        let mut replacement = Vec::with_capacity(2);
        if iv.start < value {
            replacement.push(Interval::new(iv.start, value - 1));
        }
        if value < iv.end {
            replacement.push(Interval::new(value + 1, iv.end));
        }
        self.intervals.splice(pos..pos + 1, replacement);
    }

    pub fn contains(&self, value: i32) -> bool {
        let pos = self.intervals.partition_point(|iv| iv.end < value);
        self.intervals
            .get(pos)
            .is_some_and(|iv| iv.start <= value)
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Number of values in the set
    pub fn len(&self) -> usize {
        self.intervals.iter().map(Interval::len).sum()
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn min_element(&self) -> Option<i32> {
        self.intervals.first().map(|iv| iv.start)
    }

    pub fn max_element(&self) -> Option<i32> {
        self.intervals.last().map(|iv| iv.end)
    }

    /// Values of `min..=max` that are not in this set
    pub fn complement(&self, min: i32, max: i32) -> IntervalSet {
        let mut result = IntervalSet::new();
        let mut next = min as i64;
        for iv in &self.intervals {
            if (iv.end as i64) < next {
                continue;
            }
            if iv.start as i64 > max as i64 {
                break;
            }
            if (iv.start as i64) > next {
                result.add_range(next as i32, iv.start - 1);
            }
            next = iv.end as i64 + 1;
        }
        if next <= max as i64 {
            result.add_range(next as i32, max);
        }
        result
    }

    /// Iterate over every member in ascending order
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.intervals.iter().flat_map(|iv| iv.start..=iv.end)
    }

    /// Render the set with a custom element formatter, e.g. token names
    pub fn to_string_with<F>(&self, mut name: F) -> String
    where
        F: FnMut(i32) -> String,
    {
        let elements: Vec<String> = if self.len() <= 32 {
            self.iter().map(&mut name).collect()
        } else {
            self.intervals
                .iter()
                .map(|iv| format!("{}..{}", name(iv.start), name(iv.end)))
                .collect()
        };

        if elements.len() == 1 {
            elements[0].clone()
        } else {
            format!("{{{}}}", elements.join(", "))
        }
    }
}

impl fmt::Display for IntervalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .intervals
            .iter()
            .map(|iv| {
                if iv.start == iv.end {
                    iv.start.to_string()
                } else {
                    format!("{}..{}", iv.start, iv.end)
                }
            })
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

impl FromIterator<i32> for IntervalSet {
    fn from_iter<T: IntoIterator<Item = i32>>(iter: T) -> Self {
        let mut set = IntervalSet::new();
        for value in iter {
            set.add(value);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_adjacent_ranges_merge() {
        let mut set = IntervalSet::new();
        set.add_range(1, 3);
        set.add_range(7, 9);
        set.add_range(4, 6);
        assert_eq!(set.intervals(), &[Interval::new(1, 9)]);
        assert_eq!(set.len(), 9);
    }

    #[test]
    fn test_remove_splits_interval() {
        let mut set = IntervalSet::of_range(1, 5);
        set.remove(3);
        assert_eq!(set.intervals(), &[Interval::new(1, 2), Interval::new(4, 5)]);
        set.remove(1);
        assert_eq!(set.min_element(), Some(2));
    }

    #[test]
    fn test_complement_within_vocabulary() {
        let set: IntervalSet = [2, 3, 7].into_iter().collect();
        let complement = set.complement(1, 8);
        assert_eq!(
            complement.intervals(),
            &[Interval::new(1, 1), Interval::new(4, 6), Interval::new(8, 8)]
        );
    }

    #[test]
    fn test_eof_member() {
        let mut set = IntervalSet::of(-1);
        set.add_range(0, 4);
        assert_eq!(set.intervals(), &[Interval::new(-1, 4)]);
        assert!(set.contains(-1));
        assert_eq!(set.to_string(), "{-1..4}");
    }

    proptest! {
        #[test]
        fn prop_matches_naive_membership(ranges in prop::collection::vec((-5i32..60, 0i32..8), 0..12)) {
            let mut set = IntervalSet::new();
            let mut naive = BTreeSet::new();
            for (start, width) in ranges {
                set.add_range(start, start + width);
                naive.extend(start..=start + width);
            }

            for value in -6..70 {
                prop_assert_eq!(set.contains(value), naive.contains(&value));
            }
            prop_assert_eq!(set.len(), naive.len());

            // intervals stay sorted, disjoint and non-adjacent
            for pair in set.intervals().windows(2) {
                prop_assert!(pair[0].end + 1 < pair[1].start);
            }
        }

        #[test]
        fn prop_complement_partitions_range(values in prop::collection::vec(0i32..40, 0..20)) {
            let set: IntervalSet = values.iter().copied().collect();
            let complement = set.complement(0, 39);
            for value in 0..40 {
                prop_assert_ne!(set.contains(value), complement.contains(value));
            }
        }
    }
}
