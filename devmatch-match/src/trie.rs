//! Right to left scan of a target string over the node trie.

use devmatch_data::{DataSet, DataSetError, entity::Node, index::NodeOffset};
use std::sync::Arc;

/// Nodes found by one scan over a target string.
#[derive(Debug, Default)]
pub(crate) struct Scan {
    /// Found nodes ordered from the end of the target to its start.
    pub(crate) nodes: Vec<Arc<Node>>,
    /// Summed numeric distance of the numeric children taken.
    pub(crate) difference: usize,
    /// Amount of nodes read while walking the trie.
    pub(crate) evaluated: usize,
}

impl Scan {
    /// Offsets of the found nodes, sorted ascending.
    pub(crate) fn sorted_offsets(&self) -> Vec<NodeOffset> {
        let mut offsets: Vec<_> = self.nodes.iter().map(|node| node.offset()).collect();
        offsets.sort_unstable();
        offsets
    }
}

/// Scan `target` from its end toward its start.
///
/// At every cursor the deepest complete node ending there is taken and the
/// cursor jumps to its first character. When `numeric` is set, an edge whose
/// label does not match may still be followed through the numeric child
/// closest in value to the digits found in the target.
pub(crate) fn scan(data_set: &DataSet, target: &[u8], numeric: bool) -> Result<Scan, DataSetError> {
    let mut scan = Scan::default();
    let mut end = target.len().min(data_set.max_signature_length());
    while end > 0 {
        match longest_at(data_set, target, end, numeric, &mut scan.evaluated)? {
            Some((node, difference)) => {
                end = node.position();
                scan.difference += difference;
                scan.nodes.push(node);
            }
            None => end -= 1,
        }
    }
    Ok(scan)
}

fn longest_at(
    data_set: &DataSet,
    target: &[u8],
    end: usize,
    numeric: bool,
    evaluated: &mut usize,
) -> Result<Option<(Arc<Node>, usize)>, DataSetError> {
    let Some(root) = data_set.root_node(end) else {
        return Ok(None);
    };
    let mut current = data_set.node(root)?;
    *evaluated += 1;
    let mut difference = 0;
    let mut best = None;

    loop {
        let start = current.position();
        if start == 0 {
            break;
        }
        let Some(&key) = target.get(start - 1) else {
            break;
        };

        let exact = match current.child(key) {
            Some(offset) => {
                let child = data_set.node(offset)?;
                *evaluated += 1;
                label_matches(&child, &current, target).then_some(child)
            }
            None => None,
        };
        let next = match exact {
            Some(child) => Some((child, 0)),
            None if numeric => closest_numeric(data_set, &current, target, evaluated)?,
            None => None,
        };

        let Some((child, distance)) = next else {
            break;
        };
        difference += distance;
        if child.is_complete() {
            best = Some((child.clone(), difference));
        }
        current = child;
    }

    if let Some((node, _)) = &best {
        tracing::trace!(
            "trie scan: node at {}..{} for end {end}",
            node.position(),
            node.end()
        );
    }
    Ok(best)
}

/// Characters a child prepends to its parent's string.
fn label<'a>(child: &'a Node, parent: &Node) -> &'a [u8] {
    let width = child.len().saturating_sub(parent.len());
    child.characters().get(..width).unwrap_or_default()
}

fn label_matches(child: &Node, parent: &Node, target: &[u8]) -> bool {
    target
        .get(child.position()..parent.position())
        .is_some_and(|window| window == label(child, parent))
}

fn closest_numeric(
    data_set: &DataSet,
    parent: &Node,
    target: &[u8],
    evaluated: &mut usize,
) -> Result<Option<(Arc<Node>, usize)>, DataSetError> {
    let mut best: Option<(Arc<Node>, usize)> = None;
    for numeric in parent.numeric_children() {
        let child = data_set.node(numeric.node)?;
        *evaluated += 1;
        let Some(window) = target.get(child.position()..parent.position()) else {
            continue;
        };
        let Some(found) = parse_digits(window) else {
            continue;
        };
        let distance = found.abs_diff(u64::from(numeric.value));
        let distance = usize::try_from(distance).unwrap_or(usize::MAX);
        // numeric children are sorted by value, the first of equals wins
        if best.as_ref().is_none_or(|(_, d)| distance < *d) {
            best = Some((child, distance));
        }
    }
    Ok(best)
}

fn parse_digits(window: &[u8]) -> Option<u64> {
    if window.is_empty() || !window.iter().all(u8::is_ascii_digit) {
        return None;
    }
    window.iter().try_fold(0u64, |acc, digit| {
        acc.checked_mul(10)?.checked_add(u64::from(digit - b'0'))
    })
}
