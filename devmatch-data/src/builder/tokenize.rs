//! Splitting of target strings into node fragments.
//!
//! A fragment ends after a separator character, or where a run of digits
//! meets a character that is neither a digit nor a separator. The rule only
//! looks at two adjacent characters, so two target strings agreeing on a
//! window agree on the boundaries inside it. That is what allows the
//! matcher to recover the nodes of a signature from its literal pattern.

/// Characters ending a fragment.
pub const SEPARATORS: &[u8] = b" /;(),_-";

#[inline]
fn is_separator(byte: u8) -> bool {
    SEPARATORS.contains(&byte)
}

/// Byte ranges of the fragments of `target`, left to right.
pub fn fragments(target: &[u8]) -> Vec<std::ops::Range<usize>> {
    let mut out = Vec::new();
    let mut start = 0;
    for (idx, &byte) in target.iter().enumerate() {
        let boundary = match target.get(idx + 1) {
            None => true,
            Some(&next) => {
                is_separator(byte)
                    || (!is_separator(next) && byte.is_ascii_digit() != next.is_ascii_digit())
            }
        };
        if boundary {
            out.push(start..idx + 1);
            start = idx + 1;
        }
    }
    out
}
