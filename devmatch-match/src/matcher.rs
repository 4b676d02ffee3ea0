//! Matching stages turning the nodes of a target string into a signature.
//!
//! The stages run in order and the first one producing a signature wins:
//!
//! 1. [`Exact`]: the nodes found by a plain scan are exactly the nodes of
//!    a signature as long as the target.
//! 2. [`Numeric`]: a rescan tolerating different numbers at numeric nodes
//!    yields the nodes of such a signature.
//! 3. [`Nearest`]: among the most frequent candidates implied by the found
//!    nodes, the one whose nodes were all found and cover most of the target.
//! 4. [`Closest`]: among the same candidates, the one with the smallest edit
//!    distance to the target.
//!
//! Candidates are visited in rank order, so a more popular signature wins
//! every tie.
//!
//! [`Exact`]: Method::Exact
//! [`Numeric`]: Method::Numeric
//! [`Nearest`]: Method::Nearest
//! [`Closest`]: Method::Closest

use crate::{
    ProviderConfig,
    trie::{self, Scan},
};
use devmatch_core::{
    Method,
    algo::{DISTANCE_OVER_LIMIT, edit_distance, most_frequent_with_count},
};
use devmatch_data::{
    DataSet, DataSetError,
    entity::{Node, Signature},
    index::NodeOffset,
};
use std::sync::Arc;

/// Outcome of running the stages over one target string.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub(crate) method: Method,
    pub(crate) difference: usize,
    pub(crate) signature: Option<Arc<Signature>>,
    pub(crate) nodes: Vec<Arc<Node>>,
    pub(crate) nodes_evaluated: usize,
    pub(crate) signatures_compared: usize,
}

impl Outcome {
    fn none(nodes: Vec<Arc<Node>>, nodes_evaluated: usize, signatures_compared: usize) -> Self {
        Self {
            method: Method::None,
            difference: 0,
            signature: None,
            nodes,
            nodes_evaluated,
            signatures_compared,
        }
    }
}

pub(crate) struct Matcher<'a> {
    data_set: &'a DataSet,
    config: &'a ProviderConfig,
}

impl<'a> Matcher<'a> {
    pub(crate) fn new(data_set: &'a DataSet, config: &'a ProviderConfig) -> Self {
        Self { data_set, config }
    }

    pub(crate) fn run(&self, target: &[u8]) -> Result<Outcome, DataSetError> {
        if target.is_empty() {
            return Ok(Outcome::none(Vec::new(), 0, 0));
        }

        let exact = trie::scan(self.data_set, target, false)?;
        let mut evaluated = exact.evaluated;
        let offsets = exact.sorted_offsets();
        if let Some(signature) = self
            .data_set
            .find_signature(&offsets)?
            .filter(|signature| signature.length() == target.len())
        {
            tracing::trace!("matcher: exact signature {}", signature.rank());
            return Ok(Outcome {
                method: Method::Exact,
                difference: 0,
                signature: Some(signature),
                nodes: exact.nodes,
                nodes_evaluated: evaluated,
                signatures_compared: 1,
            });
        }

        let numeric = trie::scan(self.data_set, target, true)?;
        evaluated += numeric.evaluated;
        if numeric.difference > 0 {
            let offsets = numeric.sorted_offsets();
            if let Some(signature) = self
                .data_set
                .find_signature(&offsets)?
                .filter(|signature| signature.length() == target.len())
            {
                tracing::trace!(
                    "matcher: numeric signature {} (difference: {})",
                    signature.rank(),
                    numeric.difference
                );
                return Ok(Outcome {
                    method: Method::Numeric,
                    difference: numeric.difference,
                    signature: Some(signature),
                    nodes: numeric.nodes,
                    nodes_evaluated: evaluated,
                    signatures_compared: 2,
                });
            }
        }

        let lists: Vec<&[u32]> = exact
            .nodes
            .iter()
            .map(|node| node.ranked_signatures())
            .collect();
        let (candidates, count) = most_frequent_with_count(&lists, self.config.max_signatures());
        tracing::trace!(
            "matcher: {} candidates found in {count} of {} node lists",
            candidates.len(),
            lists.len()
        );
        if candidates.is_empty() {
            return Ok(Outcome::none(exact.nodes, evaluated, 0));
        }

        let signatures = candidates
            .iter()
            .map(|rank| self.data_set.ranked_signature(*rank))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some((signature, difference)) = nearest(&signatures, &exact, &offsets, target.len())
        {
            tracing::trace!(
                "matcher: nearest signature {} (difference: {difference})",
                signature.rank()
            );
            return Ok(Outcome {
                method: Method::Nearest,
                difference,
                signature: Some(signature),
                nodes: exact.nodes,
                nodes_evaluated: evaluated,
                signatures_compared: signatures.len(),
            });
        }

        match self.closest(&signatures, target)? {
            Some((signature, difference)) => {
                tracing::trace!(
                    "matcher: closest signature {} (difference: {difference})",
                    signature.rank()
                );
                Ok(Outcome {
                    method: Method::Closest,
                    difference,
                    signature: Some(signature),
                    nodes: exact.nodes,
                    nodes_evaluated: evaluated,
                    signatures_compared: signatures.len(),
                })
            }
            None => Ok(Outcome::none(exact.nodes, evaluated, signatures.len())),
        }
    }

    fn closest(
        &self,
        signatures: &[Arc<Signature>],
        target: &[u8],
    ) -> Result<Option<(Arc<Signature>, usize)>, DataSetError> {
        let mut limit = self
            .config
            .closest_max_distance()
            .unwrap_or(DISTANCE_OVER_LIMIT - 1);
        let mut best = None;
        for signature in signatures {
            let pattern = self.data_set.signature_pattern(signature)?;
            let distance = edit_distance(target, &pattern, limit);
            if distance == DISTANCE_OVER_LIMIT {
                continue;
            }
            if best.is_none() || distance < limit {
                limit = distance;
                best = Some(signature.clone());
            }
        }
        Ok(best.map(|signature| (signature, limit)))
    }
}

fn nearest(
    signatures: &[Arc<Signature>],
    scan: &Scan,
    offsets: &[NodeOffset],
    target_len: usize,
) -> Option<(Arc<Signature>, usize)> {
    let mut best: Option<(Arc<Signature>, usize)> = None;
    for signature in signatures {
        if !signature.is_covered_by(offsets) {
            continue;
        }
        let covered: usize = scan
            .nodes
            .iter()
            .filter(|node| signature.nodes().binary_search(&node.offset()).is_ok())
            .map(|node| node.len())
            .sum();
        let difference = target_len.saturating_sub(covered);
        if best.as_ref().is_none_or(|(_, d)| difference < *d) {
            best = Some((signature.clone(), difference));
        }
    }
    best
}
