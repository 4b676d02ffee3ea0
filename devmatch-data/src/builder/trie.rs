//! Construction of the per end position radix tries.

use std::collections::BTreeMap;

/// Longest numeric edge label turned into a numeric child.
const MAX_NUMERIC_DIGITS: usize = 9;

/// Node of a trie under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TrieNode {
    /// Position right after the last character.
    pub(crate) end: usize,
    /// Full string of the node, empty for roots.
    pub(crate) characters: Vec<u8>,
    pub(crate) parent: Option<usize>,
    /// Ranks of the signatures holding this node as a fragment.
    pub(crate) ranked: Vec<u32>,
    /// Key and arena index of every child, sorted by key.
    pub(crate) children: Vec<(u8, usize)>,
    /// Value and arena index of every child with a numeric label.
    pub(crate) numeric_children: Vec<(u32, usize)>,
}

impl TrieNode {
    pub(crate) fn position(&self) -> usize {
        self.end - self.characters.len()
    }
}

/// All tries of a data set, in one arena.
///
/// Arena order is breadth first per trie, tries ordered by end position,
/// which is also the order nodes are written in.
#[derive(Debug, Default)]
pub(crate) struct Forest {
    pub(crate) nodes: Vec<TrieNode>,
    /// Arena index of the root ending at each position.
    pub(crate) roots: BTreeMap<usize, usize>,
    fragments: BTreeMap<(usize, Vec<u8>), usize>,
}

impl Forest {
    /// Build the forest for `fragments`, a map of (end position, fragment)
    /// to the sorted ranks of the signatures containing it.
    pub(crate) fn build(fragments: &BTreeMap<(usize, Vec<u8>), Vec<u32>>) -> Self {
        let mut by_end: BTreeMap<usize, Vec<(Vec<u8>, &[u32])>> = BTreeMap::new();
        for ((end, fragment), ranks) in fragments {
            let reversed: Vec<u8> = fragment.iter().rev().copied().collect();
            by_end.entry(*end).or_default().push((reversed, ranks));
        }

        let mut forest = Self::default();
        for (end, mut entries) in by_end {
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            forest.build_trie(end, &entries);
        }
        forest
    }

    /// Arena index of the complete node for `fragment` ending at `end`.
    pub(crate) fn fragment(&self, end: usize, fragment: &[u8]) -> Option<usize> {
        self.fragments.get(&(end, fragment.to_vec())).copied()
    }

    fn build_trie(&mut self, end: usize, entries: &[(Vec<u8>, &[u32])]) {
        // Each pending item: arena index, depth and the entries below it.
        let root = self.push(end, Vec::new(), None);
        self.roots.insert(end, root);

        let mut queue = std::collections::VecDeque::from([(root, 0usize, entries)]);
        while let Some((idx, depth, group)) = queue.pop_front() {
            let mut rest = group;
            while let Some(((key, ranks), tail)) = rest.split_first() {
                if key.len() == depth {
                    self.nodes[idx].ranked.extend_from_slice(ranks);
                    rest = tail;
                } else {
                    break;
                }
            }
            if !self.nodes[idx].ranked.is_empty() {
                self.nodes[idx].ranked.sort_unstable();
                self.nodes[idx].ranked.dedup();
                let characters = self.nodes[idx].characters.clone();
                self.fragments.insert((end, characters), idx);
            }

            let mut start = 0;
            while start < rest.len() {
                let byte = rest[start].0[depth];
                let len = rest[start..]
                    .iter()
                    .take_while(|(key, _)| key[depth] == byte)
                    .count();
                let child_group = &rest[start..start + len];
                let child_depth = common_prefix(child_group);

                let reversed = &child_group[0].0[..child_depth];
                let characters: Vec<u8> = reversed.iter().rev().copied().collect();
                let parent_len = self.nodes[idx].characters.len();
                let label = &characters[..characters.len() - parent_len];
                let numeric = numeric_label(label);

                let child = self.push(end, characters, Some(idx));
                self.nodes[idx].children.push((byte, child));
                if let Some(value) = numeric {
                    self.nodes[idx].numeric_children.push((value, child));
                }
                queue.push_back((child, child_depth, child_group));
                start += len;
            }
            self.nodes[idx].numeric_children.sort_unstable();
        }
    }

    fn push(&mut self, end: usize, characters: Vec<u8>, parent: Option<usize>) -> usize {
        self.nodes.push(TrieNode {
            end,
            characters,
            parent,
            ranked: Vec::new(),
            children: Vec::new(),
            numeric_children: Vec::new(),
        });
        self.nodes.len() - 1
    }
}

/// Length of the longest prefix shared by all keys of a sorted group.
fn common_prefix(group: &[(Vec<u8>, &[u32])]) -> usize {
    let first = &group[0].0;
    let last = &group[group.len() - 1].0;
    first
        .iter()
        .zip(last.iter())
        .take_while(|(a, b)| a == b)
        .count()
}

fn numeric_label(label: &[u8]) -> Option<u32> {
    if label.is_empty()
        || label.len() > MAX_NUMERIC_DIGITS
        || !label.iter().all(u8::is_ascii_digit)
    {
        return None;
    }
    std::str::from_utf8(label).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest(items: &[(usize, &str, &[u32])]) -> Forest {
        let fragments = items
            .iter()
            .map(|(end, fragment, ranks)| ((*end, fragment.as_bytes().to_vec()), ranks.to_vec()))
            .collect();
        Forest::build(&fragments)
    }

    #[test]
    fn shared_suffix_becomes_internal_node() {
        let forest = forest(&[(10, "120", &[0]), (10, "20", &[1]), (10, "Chrome", &[2])]);
        let root = forest.roots[&10];
        let root_node = &forest.nodes[root];
        assert!(root_node.characters.is_empty());
        assert_eq!(root_node.children.len(), 2);
        assert_eq!(root_node.children[0].0, b'0');

        let twenty = forest.fragment(10, b"20").unwrap();
        assert_eq!(forest.nodes[twenty].ranked, [1]);
        assert_eq!(forest.nodes[twenty].position(), 8);
        assert_eq!(root_node.numeric_children, [(20, twenty)]);

        let hundred = forest.fragment(10, b"120").unwrap();
        assert_eq!(forest.nodes[hundred].parent, Some(twenty));
        assert_eq!(forest.nodes[twenty].children, [(b'1', hundred)]);
        assert_eq!(forest.nodes[twenty].numeric_children, [(1, hundred)]);
    }

    #[test]
    fn common_suffix_without_fragment_is_incomplete() {
        let forest = forest(&[(8, "Android ", &[0, 2]), (8, "Windows ", &[1])]);
        let root = &forest.nodes[forest.roots[&8]];
        assert_eq!(root.children.len(), 1);
        let shared = &forest.nodes[root.children[0].1];
        assert_eq!(shared.characters, b" ");
        assert!(shared.ranked.is_empty());
        assert_eq!(shared.children.len(), 2);

        let android = forest.fragment(8, b"Android ").unwrap();
        assert_eq!(forest.nodes[android].ranked, [0, 2]);
        assert_eq!(forest.nodes[android].position(), 0);
        assert!(forest.fragment(8, b" ").is_none());
        assert!(forest.fragment(7, b"Android ").is_none());
    }
}
