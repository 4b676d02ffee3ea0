use super::{EntitySource, SectionReader};
use crate::{
    entity::{Node, Profile, Signature, Value},
    error::DataSetError,
    format::{PatternLayout, PatternSection, decode::NODE_MIN_LEN},
    index::{NodeOffset, ProfileIndex, SignatureIndex, StringOffset, ValueIndex},
};
use std::{io::Cursor, sync::Arc};

/// Backend holding every entity, constructed when loading.
#[derive(Debug)]
pub(crate) struct MemorySource {
    strings: Vec<(StringOffset, Arc<[u8]>)>,
    values: Vec<Arc<Value>>,
    profiles: Vec<Arc<Profile>>,
    signatures: Vec<Arc<Signature>>,
    nodes: Vec<Arc<Node>>,
}

impl MemorySource {
    /// Decode every entity of the pattern file in `bytes`.
    pub(crate) fn load(bytes: &[u8], layout: &PatternLayout) -> Result<Self, DataSetError> {
        let mut cursor = Cursor::new(bytes);
        let mut reader = SectionReader::new(&mut cursor, layout);

        let strings_section = layout.section(PatternSection::Strings);
        // a string record is at least its two byte length prefix
        let mut strings = Vec::with_capacity(
            strings_section
                .count
                .min(strings_section.byte_len / 2)
                .try_into()
                .unwrap_or_default(),
        );
        let mut offset = 0;
        while offset < strings_section.byte_len {
            let string_offset = StringOffset::new(offset);
            let (bytes, next) = reader.string_with_next(string_offset)?;
            strings.push((string_offset, bytes));
            offset = next;
        }
        if strings.len() != strings_section.count as usize {
            return Err(DataSetError::parse(
                "strings",
                format!(
                    "section declares {} strings, found {}",
                    strings_section.count,
                    strings.len()
                ),
            ));
        }
        tracing::debug!("loaded {} strings", strings.len());

        let values = (0..layout.section(PatternSection::Values).count)
            .map(|idx| reader.value(ValueIndex::new(idx)).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        let profiles = (0..layout.section(PatternSection::Profiles).count)
            .map(|idx| reader.profile(ProfileIndex::new(idx)).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        let signatures = (0..layout.section(PatternSection::Signatures).count)
            .map(|idx| reader.signature(SignatureIndex::new(idx)).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(
            "loaded {} values, {} profiles and {} signatures",
            values.len(),
            profiles.len(),
            signatures.len()
        );

        let nodes_section = layout.section(PatternSection::Nodes);
        let mut nodes = Vec::with_capacity(
            nodes_section
                .count
                .min(nodes_section.byte_len / NODE_MIN_LEN)
                .try_into()
                .unwrap_or_default(),
        );
        let mut offset = 0;
        while offset < nodes_section.byte_len {
            let (node, next) = reader.node(NodeOffset::new(offset))?;
            nodes.push(Arc::new(node));
            offset = next;
        }
        if nodes.len() != nodes_section.count as usize {
            return Err(DataSetError::parse(
                "nodes",
                format!(
                    "section declares {} nodes, found {}",
                    nodes_section.count,
                    nodes.len()
                ),
            ));
        }
        tracing::debug!("loaded {} nodes", nodes.len());

        let source = Self {
            strings,
            values,
            profiles,
            signatures,
            nodes,
        };
        source.check_references()?;
        Ok(source)
    }

    /// Every offset and index an entity holds must resolve to an entity of
    /// this source, so nothing can fail to load once matching starts.
    fn check_references(&self) -> Result<(), DataSetError> {
        for node in &self.nodes {
            let offset = node.offset();
            let linked = node
                .parent()
                .into_iter()
                .chain(node.children().iter().map(|child| child.node))
                .chain(node.numeric_children().iter().map(|child| child.node));
            for linked in linked {
                self.check_node(linked, || format!("node {offset}"))?;
            }
            if let Some(rank) = node
                .ranked_signatures()
                .iter()
                .find(|rank| **rank as usize >= self.signatures.len())
            {
                return Err(dangling(format!("node {offset}"), "signature rank", *rank));
            }
        }

        for signature in &self.signatures {
            let what = || format!("signature {}", signature.index());
            for node in signature.nodes() {
                self.check_node(*node, what)?;
            }
            for profile in signature.profiles() {
                self.check_profile(*profile, what)?;
            }
        }

        for profile in &self.profiles {
            let what = || format!("profile {}", profile.profile_id());
            if let Some(parent) = profile.parent() {
                self.check_profile(parent, what)?;
            }
            if let Some(value) = profile
                .values()
                .iter()
                .find(|value| value.as_usize() >= self.values.len())
            {
                return Err(dangling(what(), "value", value.get()));
            }
            if let Some(signature) = profile
                .signatures()
                .iter()
                .find(|signature| signature.as_usize() >= self.signatures.len())
            {
                return Err(dangling(what(), "signature", signature.get()));
            }
        }

        for value in &self.values {
            for profile in value.profiles() {
                self.check_profile(*profile, || format!("value {}", value.index()))?;
            }
        }
        Ok(())
    }

    /// Check the tables loaded next to this source against it.
    pub(crate) fn check_tables(
        &self,
        root_nodes: &[Option<NodeOffset>],
        default_profiles: impl IntoIterator<Item = ProfileIndex>,
    ) -> Result<(), DataSetError> {
        for root in root_nodes.iter().flatten() {
            self.check_node(*root, || "root nodes".to_owned())?;
        }
        for profile in default_profiles {
            self.check_profile(profile, || "components".to_owned())?;
        }
        Ok(())
    }

    fn check_node(
        &self,
        offset: NodeOffset,
        what: impl FnOnce() -> String,
    ) -> Result<(), DataSetError> {
        match self.nodes.binary_search_by_key(&offset, |node| node.offset()) {
            Ok(_) => Ok(()),
            Err(_) => Err(dangling(what(), "node", offset.get())),
        }
    }

    fn check_profile(
        &self,
        index: ProfileIndex,
        what: impl FnOnce() -> String,
    ) -> Result<(), DataSetError> {
        if index.as_usize() < self.profiles.len() {
            Ok(())
        } else {
            Err(dangling(what(), "profile", index.get()))
        }
    }
}

fn dangling(what: String, entity: &str, key: u32) -> DataSetError {
    DataSetError::parse(what, format!("refers to missing {entity} {key}"))
}

impl EntitySource for MemorySource {
    fn string(&self, offset: StringOffset) -> Result<Arc<[u8]>, DataSetError> {
        self.strings
            .binary_search_by_key(&offset, |(offset, _)| *offset)
            .map(|idx| self.strings[idx].1.clone())
            .map_err(|_ignored| DataSetError::not_found("string", offset.get()))
    }

    fn node(&self, offset: NodeOffset) -> Result<Arc<Node>, DataSetError> {
        self.nodes
            .binary_search_by_key(&offset, |node| node.offset())
            .map(|idx| self.nodes[idx].clone())
            .map_err(|_ignored| DataSetError::not_found("node", offset.get()))
    }

    fn value(&self, index: ValueIndex) -> Result<Arc<Value>, DataSetError> {
        self.values
            .get(index.as_usize())
            .cloned()
            .ok_or_else(|| DataSetError::not_found("value", index.get()))
    }

    fn profile(&self, index: ProfileIndex) -> Result<Arc<Profile>, DataSetError> {
        self.profiles
            .get(index.as_usize())
            .cloned()
            .ok_or_else(|| DataSetError::not_found("profile", index.get()))
    }

    fn signature(&self, index: SignatureIndex) -> Result<Arc<Signature>, DataSetError> {
        self.signatures
            .get(index.as_usize())
            .cloned()
            .ok_or_else(|| DataSetError::not_found("signature", index.get()))
    }
}
