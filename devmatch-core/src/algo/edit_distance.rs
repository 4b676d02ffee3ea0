use smallvec::{SmallVec, smallvec};

/// Returned by [`edit_distance`] when the distance exceeds the cutoff.
pub const DISTANCE_OVER_LIMIT: usize = usize::MAX;

type Row = SmallVec<[usize; 128]>;

/// Levenshtein distance between `a` and `b`, bounded by `max_value`.
///
/// Only two rows of the distance matrix are kept, sized to the shorter input.
/// As soon as every cell of a row exceeds `max_value` the computation is
/// abandoned: the final distance can never be lower than the smallest value
/// of any row.
///
/// Returns [`DISTANCE_OVER_LIMIT`] exactly when the true distance is larger
/// than `max_value`.
///
/// ```
/// use devmatch_core::algo::{DISTANCE_OVER_LIMIT, edit_distance};
///
/// assert_eq!(edit_distance("Nokia6230/2.0", "Nokia6230i/2.0", 4), 1);
/// assert_eq!(edit_distance("Nokia", "Samsung", 2), DISTANCE_OVER_LIMIT);
/// ```
#[must_use]
pub fn edit_distance(a: impl AsRef<[u8]>, b: impl AsRef<[u8]>, max_value: usize) -> usize {
    let (mut long, mut short) = (a.as_ref(), b.as_ref());
    if long.len() < short.len() {
        std::mem::swap(&mut long, &mut short);
    }

    if long.len() - short.len() > max_value {
        return DISTANCE_OVER_LIMIT;
    }
    if short.is_empty() {
        return long.len();
    }

    let mut prev: Row = (0..=short.len()).collect();
    let mut curr: Row = smallvec![0; short.len() + 1];

    for (i, &lc) in long.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];
        for (j, &sc) in short.iter().enumerate() {
            let substitute = prev[j] + usize::from(lc != sc);
            let delete = prev[j + 1] + 1;
            let insert = curr[j] + 1;
            let value = substitute.min(delete).min(insert);
            curr[j + 1] = value;
            row_min = row_min.min(value);
        }
        if row_min > max_value {
            return DISTANCE_OVER_LIMIT;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    match prev[short.len()] {
        distance if distance > max_value => DISTANCE_OVER_LIMIT,
        distance => distance,
    }
}
