use std::{cmp::Reverse, collections::BinaryHeap};

/// Merge sorted index lists into the indexes occurring in the most lists.
///
/// Every input list must be sorted ascending. The output holds the indexes
/// found in the highest number of input lists, sorted ascending and capped at
/// `max_results`. When more indexes share the highest count than fit, the
/// numerically smallest ones are kept. A single input list comes back as-is
/// (up to the cap).
///
/// ```
/// use devmatch_core::algo::most_frequent;
///
/// let lists: [&[u32]; 3] = [&[1, 4, 9], &[4, 7, 9], &[0, 4]];
/// assert_eq!(most_frequent(&lists, 10), vec![4]);
/// ```
#[must_use]
pub fn most_frequent<L: AsRef<[u32]>>(lists: &[L], max_results: usize) -> Vec<u32> {
    most_frequent_with_count(lists, max_results).0
}

/// Like [`most_frequent`], also returning how many lists each
/// returned index occurred in.
#[must_use]
pub fn most_frequent_with_count<L: AsRef<[u32]>>(
    lists: &[L],
    max_results: usize,
) -> (Vec<u32>, usize) {
    if max_results == 0 {
        return (Vec::new(), 0);
    }
    if let [single] = lists {
        let single = single.as_ref();
        let mut out = Vec::with_capacity(single.len().min(max_results));
        for &value in single {
            if out.last() != Some(&value) {
                out.push(value);
                if out.len() == max_results {
                    break;
                }
            }
        }
        let count = usize::from(!out.is_empty());
        return (out, count);
    }

    // (next value, list, position in list)
    let mut heap: BinaryHeap<Reverse<(u32, usize, usize)>> = lists
        .iter()
        .enumerate()
        .filter_map(|(list_idx, list)| {
            list.as_ref()
                .first()
                .map(|&value| Reverse((value, list_idx, 0)))
        })
        .collect();

    let mut best_count = 0;
    let mut out = Vec::new();

    while let Some(Reverse((value, _, _))) = heap.peek().copied() {
        let mut count = 0;
        while let Some(&Reverse((next, list_idx, pos))) = heap.peek() {
            if next != value {
                break;
            }
            heap.pop();
            count += 1;
            let list = lists[list_idx].as_ref();
            let mut pos = pos + 1;
            while list.get(pos) == Some(&value) {
                pos += 1;
            }
            if let Some(&following) = list.get(pos) {
                heap.push(Reverse((following, list_idx, pos)));
            }
        }

        if count > best_count {
            best_count = count;
            out.clear();
            out.push(value);
        } else if count == best_count && out.len() < max_results {
            out.push(value);
        }
    }

    (out, best_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;
    use std::collections::BTreeMap;

    #[test]
    fn single_list_is_returned_unchanged() {
        let lists = [vec![2, 3, 5, 8]];
        assert_eq!(most_frequent(&lists, 10), vec![2, 3, 5, 8]);
        assert_eq!(most_frequent(&lists, 2), vec![2, 3]);
    }

    #[test]
    fn empty_input() {
        let lists: [Vec<u32>; 0] = [];
        assert!(most_frequent(&lists, 10).is_empty());
        assert!(most_frequent(&[Vec::<u32>::new(), Vec::new()], 10).is_empty());
        assert!(most_frequent(&[vec![1]], 0).is_empty());
    }

    #[test]
    fn ties_prefer_smallest_indexes() {
        let lists = [vec![1, 3, 5, 7], vec![3, 5, 7], vec![0, 3, 5, 7]];
        assert_eq!(most_frequent(&lists, 2), vec![3, 5]);
        assert_eq!(most_frequent_with_count(&lists, 8), (vec![3, 5, 7], 3));
    }

    #[test]
    fn later_higher_count_replaces_earlier() {
        let lists = [vec![1, 2, 9], vec![2, 9], vec![9]];
        assert_eq!(most_frequent_with_count(&lists, 8), (vec![9], 3));
    }

    fn count_occurrences(lists: &[Vec<u32>]) -> BTreeMap<u32, usize> {
        let mut counts = BTreeMap::new();
        for list in lists {
            let mut list = list.clone();
            list.dedup();
            for value in list {
                *counts.entry(value).or_default() += 1;
            }
        }
        counts
    }

    #[quickcheck]
    fn output_invariants(mut lists: Vec<Vec<u32>>, cap: u8) -> bool {
        let cap = usize::from(cap % 16);
        for list in &mut lists {
            list.iter_mut().for_each(|v| *v %= 64);
            list.sort_unstable();
        }
        let out = most_frequent(&lists, cap);
        let counts = count_occurrences(&lists);

        let sorted = out.windows(2).all(|w| w[0] < w[1]);
        let within_cap = out.len() <= cap;
        let present = out.iter().all(|v| counts.contains_key(v));
        let min_out_count = out.iter().map(|v| counts[v]).min().unwrap_or(usize::MAX);
        let dominates = counts
            .iter()
            .filter(|(v, _)| !out.contains(v))
            .all(|(_, &c)| out.len() == cap || c <= min_out_count);
        let expected_len = if cap == 0 {
            0
        } else {
            let best = counts.values().copied().max().unwrap_or(0);
            counts.values().filter(|&&c| c == best).count().min(cap)
        };

        sorted && within_cap && present && dominates && out.len() == expected_len
    }
}
