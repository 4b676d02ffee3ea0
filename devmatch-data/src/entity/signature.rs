use crate::index::{NodeOffset, ProfileIndex, SignatureIndex};

/// One known target string pattern, made of a sequence of nodes.
#[derive(Debug, Clone)]
pub struct Signature {
    pub(crate) index: SignatureIndex,
    pub(crate) rank: u32,
    pub(crate) length: u16,
    pub(crate) nodes: Vec<NodeOffset>,
    pub(crate) profiles: Vec<ProfileIndex>,
}

impl Signature {
    #[must_use]
    pub fn index(&self) -> SignatureIndex {
        self.index
    }

    /// Popularity rank, `0` being the most popular signature.
    #[must_use]
    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// Length of the reconstructed pattern.
    #[must_use]
    pub fn length(&self) -> usize {
        usize::from(self.length)
    }

    /// Nodes of the signature, sorted by offset.
    #[must_use]
    pub fn nodes(&self) -> &[NodeOffset] {
        &self.nodes
    }

    /// One profile per component, in component order.
    #[must_use]
    pub fn profiles(&self) -> &[ProfileIndex] {
        &self.profiles
    }

    /// `true` if every node of the signature is in `found`,
    /// which has to be sorted.
    #[must_use]
    pub fn is_covered_by(&self, found: &[NodeOffset]) -> bool {
        self.nodes.iter().all(|node| found.binary_search(node).is_ok())
    }
}
