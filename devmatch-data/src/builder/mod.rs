//! Construction of pattern data sets from a declarative [`DataSetSource`].

use crate::{
    dataset::{DataSet, DataSetConfig},
    entity::{NodeChild, NumericChild},
    error::DataSetError,
    format::{
        FormatVersion, HeaderRecord,
        decode::{
            FLAG_LIST, FLAG_MANDATORY, RawComponent, RawNode, RawProfile, RawProperty, RawRanked,
            RawSignature, RawValue, Slice,
        },
        encode::{self, PatternTables, node_len},
    },
    index::{NONE_REF, NodeOffset},
};
use ahash::{HashMap, HashMapExt as _, HashSet, HashSetExt as _};
use devmatch_core::ComponentKind;
use itertools::Itertools;
use std::{collections::BTreeMap, fmt, io, path::Path};

mod source;
pub use source::{
    ComponentSource, DataSetSource, ProfileSource, PropertySource, SignatureSource, ValueList,
};

mod tokenize;
pub use tokenize::{SEPARATORS, fragments};

mod trie;
use trie::Forest;

/// Error raised while building a data set.
#[derive(Debug)]
pub enum BuildError {
    /// The source is inconsistent.
    Invalid(String),
    /// The data set could not be written.
    Io(io::Error),
    /// The written data set could not be loaded back.
    Load(DataSetError),
}

impl BuildError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(msg) => write!(f, "invalid data set source: {msg}"),
            Self::Io(err) => write!(f, "write data set: {err}"),
            Self::Load(err) => write!(f, "load built data set: {err}"),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Invalid(_) => None,
            Self::Io(err) => Some(err),
            Self::Load(err) => Some(err),
        }
    }
}

impl From<io::Error> for BuildError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Builds pattern data sets.
///
/// Target strings are split into fragments, which become the complete
/// nodes of the tries. Signatures are ranked by descending popularity and
/// ordered by their node offsets.
#[derive(Debug, Clone)]
pub struct DataSetBuilder {
    source: DataSetSource,
}

impl DataSetBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>, published: jiff::civil::Date) -> Self {
        Self {
            source: DataSetSource {
                name: name.into(),
                published,
                components: Vec::new(),
                properties: Vec::new(),
                profiles: Vec::new(),
                signatures: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn from_source(source: DataSetSource) -> Self {
        Self { source }
    }

    /// Parse a JSON encoded [`DataSetSource`].
    pub fn from_json(json: &str) -> Result<Self, BuildError> {
        serde_json::from_str(json)
            .map(Self::from_source)
            .map_err(|err| BuildError::invalid(err.to_string()))
    }

    #[must_use]
    pub fn source(&self) -> &DataSetSource {
        &self.source
    }

    #[must_use]
    pub fn with_component(mut self, kind: ComponentKind, default_profile: u32) -> Self {
        self.source.components.push(ComponentSource {
            kind,
            name: None,
            default_profile,
        });
        self
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, component: ComponentKind) -> Self {
        self.source.properties.push(PropertySource {
            name: name.into(),
            component,
            description: None,
            mandatory: false,
            list: false,
            default_value: None,
        });
        self
    }

    #[must_use]
    pub fn with_property_source(mut self, property: PropertySource) -> Self {
        self.source.properties.push(property);
        self
    }

    #[must_use]
    pub fn with_profile<'a>(
        mut self,
        id: u32,
        component: ComponentKind,
        parent: Option<u32>,
        values: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (property, value) in values {
            grouped
                .entry(property.to_owned())
                .or_default()
                .push(value.to_owned());
        }
        let map = grouped
            .into_iter()
            .map(|(property, mut list)| {
                let values = if list.len() == 1 {
                    ValueList::One(list.remove(0))
                } else {
                    ValueList::Many(list)
                };
                (property, values)
            })
            .collect();
        self.source.profiles.push(ProfileSource {
            id,
            component,
            parent,
            values: map,
        });
        self
    }

    #[must_use]
    pub fn with_signature(
        mut self,
        target: impl Into<String>,
        profiles: impl IntoIterator<Item = u32>,
        popularity: u64,
    ) -> Self {
        self.source.signatures.push(SignatureSource {
            target: target.into(),
            profiles: profiles.into_iter().collect(),
            popularity,
        });
        self
    }

    /// Encode the data set in the given pattern `version`.
    pub fn build(&self, version: FormatVersion) -> Result<Vec<u8>, BuildError> {
        if !version.is_pattern() {
            return Err(BuildError::invalid(format!("{version} is not a pattern format")));
        }
        let tables = Assembly::new(&self.source)?.finish(version)?;
        let mut buf = Vec::new();
        tables.write(version, &mut buf)?;
        tracing::debug!(
            "built data set {} as {version}: {} bytes, {} signatures, {} nodes",
            self.source.name,
            buf.len(),
            tables.signatures.len(),
            tables.nodes.len()
        );
        Ok(buf)
    }

    /// Encode the data set and write it to `path`.
    pub fn write_to(
        &self,
        path: impl AsRef<Path>,
        version: FormatVersion,
    ) -> Result<(), BuildError> {
        let bytes = self.build(version)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Encode the data set and load it back.
    pub fn build_data_set(
        &self,
        version: FormatVersion,
        config: &DataSetConfig,
    ) -> Result<DataSet, BuildError> {
        let bytes = self.build(version)?;
        DataSet::from_bytes(bytes, config).map_err(BuildError::Load)
    }
}

/// Deduplicating string heap.
#[derive(Debug, Default)]
struct Interner {
    heap: Vec<u8>,
    offsets: HashMap<Vec<u8>, u32>,
}

impl Interner {
    fn intern(&mut self, bytes: &[u8]) -> Result<u32, BuildError> {
        if let Some(offset) = self.offsets.get(bytes) {
            return Ok(*offset);
        }
        let offset = encode::len_u32(self.heap.len())?;
        encode::write_string(&mut self.heap, bytes)?;
        self.offsets.insert(bytes.to_vec(), offset);
        Ok(offset)
    }

    fn count(&self) -> Result<u32, BuildError> {
        Ok(encode::len_u32(self.offsets.len())?)
    }
}

/// Validated source, sorted the way it is written.
struct Assembly<'a> {
    source: &'a DataSetSource,
    components: Vec<&'a ComponentSource>,
    properties: Vec<&'a PropertySource>,
    profiles: Vec<&'a ProfileSource>,
    profile_index: HashMap<u32, u32>,
    /// Signature source indexes in rank order.
    ranked: Vec<usize>,
    /// Profile ids of every signature, one per component, component order.
    signature_profiles: Vec<Vec<u32>>,
}

impl<'a> Assembly<'a> {
    fn new(source: &'a DataSetSource) -> Result<Self, BuildError> {
        let components: Vec<_> = source
            .components
            .iter()
            .sorted_by_key(|component| component.kind)
            .collect();
        if let Some((a, _)) = components
            .iter()
            .tuple_windows()
            .find(|(a, b)| a.kind == b.kind)
        {
            return Err(BuildError::invalid(format!("duplicate component {}", a.kind)));
        }
        let known_component = |kind: ComponentKind| components.iter().any(|c| c.kind == kind);

        let properties: Vec<_> = source
            .properties
            .iter()
            .sorted_by(|a, b| (a.component, &a.name).cmp(&(b.component, &b.name)))
            .collect();
        let mut property_names = HashSet::new();
        for property in &properties {
            if !property_names.insert(property.name.as_str()) {
                return Err(BuildError::invalid(format!(
                    "duplicate property {}",
                    property.name
                )));
            }
            if !known_component(property.component) {
                return Err(BuildError::invalid(format!(
                    "property {} belongs to missing component {}",
                    property.name, property.component
                )));
            }
        }

        let profiles: Vec<_> = source.profiles.iter().sorted_by_key(|p| p.id).collect();
        let mut profile_index = HashMap::with_capacity(profiles.len());
        for (idx, profile) in profiles.iter().enumerate() {
            if profile_index.insert(profile.id, idx as u32).is_some() {
                return Err(BuildError::invalid(format!("duplicate profile {}", profile.id)));
            }
            if !known_component(profile.component) {
                return Err(BuildError::invalid(format!(
                    "profile {} belongs to missing component {}",
                    profile.id, profile.component
                )));
            }
        }
        let by_id = |id: u32| profile_index.get(&id).map(|idx| profiles[*idx as usize]);

        for profile in &profiles {
            for property_name in profile.values.keys() {
                let property = properties
                    .iter()
                    .find(|p| &p.name == property_name)
                    .ok_or_else(|| {
                        BuildError::invalid(format!(
                            "profile {} sets unknown property {property_name}",
                            profile.id
                        ))
                    })?;
                if property.component != profile.component {
                    return Err(BuildError::invalid(format!(
                        "profile {} of {} sets property {property_name} of {}",
                        profile.id, profile.component, property.component
                    )));
                }
            }

            let mut seen = vec![profile.id];
            let mut current = *profile;
            while let Some(parent_id) = current.parent {
                let parent = by_id(parent_id).ok_or_else(|| {
                    BuildError::invalid(format!(
                        "profile {} has missing parent {parent_id}",
                        current.id
                    ))
                })?;
                if parent.component != profile.component {
                    return Err(BuildError::invalid(format!(
                        "profile {} inherits from profile {parent_id} of another component",
                        current.id
                    )));
                }
                if seen.contains(&parent_id) {
                    return Err(BuildError::invalid(format!(
                        "parent chain of profile {} is cyclic",
                        profile.id
                    )));
                }
                seen.push(parent_id);
                current = parent;
            }
        }

        for component in &components {
            match by_id(component.default_profile) {
                Some(profile) if profile.component == component.kind => {}
                _ => {
                    return Err(BuildError::invalid(format!(
                        "default profile {} of {} is missing or of another component",
                        component.default_profile, component.kind
                    )));
                }
            }
        }

        let mut targets = HashSet::with_capacity(source.signatures.len());
        let mut signature_profiles = Vec::with_capacity(source.signatures.len());
        for signature in &source.signatures {
            if signature.target.is_empty() || signature.target.len() > i16::MAX as usize {
                return Err(BuildError::invalid(format!(
                    "signature target of {} bytes is out of range",
                    signature.target.len()
                )));
            }
            if !targets.insert(signature.target.as_str()) {
                return Err(BuildError::invalid(format!(
                    "duplicate signature {}",
                    signature.target
                )));
            }
            let mut ids = Vec::with_capacity(components.len());
            for component in &components {
                let mut found = signature
                    .profiles
                    .iter()
                    .filter(|id| by_id(**id).is_some_and(|p| p.component == component.kind));
                let id = found.next().copied().unwrap_or(component.default_profile);
                if found.next().is_some() {
                    return Err(BuildError::invalid(format!(
                        "signature {} has several {} profiles",
                        signature.target, component.kind
                    )));
                }
                ids.push(id);
            }
            if let Some(unknown) = signature.profiles.iter().find(|id| by_id(**id).is_none()) {
                return Err(BuildError::invalid(format!(
                    "signature {} references missing profile {unknown}",
                    signature.target
                )));
            }
            signature_profiles.push(ids);
        }

        let ranked = (0..source.signatures.len())
            .sorted_by(|a, b| {
                let (sa, sb) = (&source.signatures[*a], &source.signatures[*b]);
                sb.popularity
                    .cmp(&sa.popularity)
                    .then_with(|| signature_profiles[*a].cmp(&signature_profiles[*b]))
                    .then_with(|| sa.target.cmp(&sb.target))
            })
            .collect();

        Ok(Self {
            source,
            components,
            properties,
            profiles,
            profile_index,
            ranked,
            signature_profiles,
        })
    }

    fn finish(self, version: FormatVersion) -> Result<PatternTables, BuildError> {
        let mut strings = Interner::default();
        let mut pool: Vec<u32> = Vec::new();

        // Values: per property, sorted by name.
        let mut values: Vec<(u32, &str)> = Vec::new();
        let mut value_index: HashMap<(u32, &str), u32> = HashMap::new();
        let mut raw_properties = Vec::with_capacity(self.properties.len());
        for (property_idx, property) in self.properties.iter().enumerate() {
            let property_idx = property_idx as u32;
            let names: Vec<&str> = self
                .profiles
                .iter()
                .filter_map(|profile| profile.values.get(&property.name))
                .flat_map(ValueList::iter)
                .chain(property.default_value.as_deref())
                .sorted()
                .dedup()
                .collect();
            let first_value = encode::len_u32(values.len())?;
            for name in &names {
                value_index.insert((property_idx, *name), encode::len_u32(values.len())?);
                values.push((property_idx, *name));
            }
            let mut flags = 0;
            if property.mandatory {
                flags |= FLAG_MANDATORY;
            }
            if property.list {
                flags |= FLAG_LIST;
            }
            raw_properties.push(RawProperty {
                component: property.component.id(),
                flags,
                name: strings.intern(property.name.as_bytes())?,
                description: match &property.description {
                    Some(description) => strings.intern(description.as_bytes())?,
                    None => NONE_REF,
                },
                default_value: property
                    .default_value
                    .as_deref()
                    .and_then(|name| value_index.get(&(property_idx, name)).copied())
                    .unwrap_or(NONE_REF),
                first_value,
                value_count: encode::len_u32(names.len())?,
            });
        }

        // Own values of every profile, and the profiles of every value.
        let mut profile_values: Vec<Vec<u32>> = Vec::with_capacity(self.profiles.len());
        let mut value_profiles: Vec<Vec<u32>> = vec![Vec::new(); values.len()];
        for (profile_idx, profile) in self.profiles.iter().enumerate() {
            let mut own = Vec::new();
            for (property_name, list) in &profile.values {
                let Some(property_idx) = self
                    .properties
                    .iter()
                    .position(|p| &p.name == property_name)
                else {
                    continue;
                };
                for name in list.iter() {
                    if let Some(value) = value_index.get(&(property_idx as u32, name)) {
                        own.push(*value);
                    }
                }
            }
            own.sort_unstable();
            own.dedup();
            for value in &own {
                value_profiles[*value as usize].push(profile_idx as u32);
            }
            profile_values.push(own);
        }

        // Fragments of every signature, by rank.
        let mut fragments: BTreeMap<(usize, Vec<u8>), Vec<u32>> = BTreeMap::new();
        let mut lowest_character = u8::MAX;
        let mut highest_character = u8::MIN;
        let mut max_signature_length = 0;
        for (rank, source_idx) in self.ranked.iter().enumerate() {
            let target = self.source.signatures[*source_idx].target.as_bytes();
            for range in tokenize::fragments(target) {
                fragments
                    .entry((range.end, target[range].to_vec()))
                    .or_default()
                    .push(rank as u32);
            }
            for byte in target {
                lowest_character = lowest_character.min(*byte);
                highest_character = highest_character.max(*byte);
            }
            max_signature_length = max_signature_length.max(target.len());
        }
        if self.ranked.is_empty() {
            lowest_character = 0;
        }
        let forest = Forest::build(&fragments);

        // Node offsets follow from the record lengths of `version`.
        let mut offsets = Vec::with_capacity(forest.nodes.len());
        let mut next: u64 = 0;
        for node in &forest.nodes {
            offsets.push(
                u32::try_from(next)
                    .map_err(|_ignored| BuildError::invalid("node section exceeds 4GiB"))?,
            );
            next += node_len(
                version,
                node.ranked.len(),
                node.children.len(),
                node.numeric_children.len(),
            );
        }
        let mut nodes = Vec::with_capacity(forest.nodes.len());
        for node in &forest.nodes {
            nodes.push(RawNode {
                position: i16::try_from(node.position())
                    .map_err(|_ignored| BuildError::invalid("node position out of range"))?,
                parent: node.parent.map_or(NONE_REF, |idx| offsets[idx]),
                characters: if node.characters.is_empty() {
                    NONE_REF
                } else {
                    strings.intern(&node.characters)?
                },
                ranked: RawRanked::Inline(node.ranked.clone()),
                children: node
                    .children
                    .iter()
                    .map(|(key, idx)| NodeChild {
                        key: *key,
                        node: NodeOffset::new(offsets[*idx]),
                    })
                    .collect(),
                numeric_children: node
                    .numeric_children
                    .iter()
                    .map(|(value, idx)| NumericChild {
                        value: *value,
                        node: NodeOffset::new(offsets[*idx]),
                    })
                    .collect(),
            });
        }
        let mut root_nodes = vec![NONE_REF; max_signature_length + 1];
        for (end, idx) in &forest.roots {
            root_nodes[*end] = offsets[*idx];
        }

        // Signatures ordered by their node offsets.
        let mut signature_nodes: Vec<Vec<u32>> = Vec::with_capacity(self.ranked.len());
        for source_idx in &self.ranked {
            let target = self.source.signatures[*source_idx].target.as_bytes();
            let mut list = Vec::new();
            for range in tokenize::fragments(target) {
                let end = range.end;
                let idx = forest.fragment(end, &target[range]).ok_or_else(|| {
                    BuildError::invalid(format!("fragment ending at {end} missing from trie"))
                })?;
                list.push(offsets[idx]);
            }
            list.sort_unstable();
            signature_nodes.push(list);
        }
        let order: Vec<usize> = (0..self.ranked.len())
            .sorted_by(|a, b| signature_nodes[*a].cmp(&signature_nodes[*b]))
            .collect();
        let mut ranked_signatures = vec![0u32; order.len()];
        for (signature_idx, rank) in order.iter().enumerate() {
            ranked_signatures[*rank] = signature_idx as u32;
        }

        let mut profile_signatures: Vec<Vec<u32>> = vec![Vec::new(); self.profiles.len()];
        let mut signature_profile_indexes = Vec::with_capacity(order.len());
        for (signature_idx, rank) in order.iter().enumerate() {
            let ids = &self.signature_profiles[self.ranked[*rank]];
            let indexes: Vec<u32> = ids
                .iter()
                .filter_map(|id| self.profile_index.get(id).copied())
                .collect();
            for profile in &indexes {
                profile_signatures[*profile as usize].push(signature_idx as u32);
            }
            signature_profile_indexes.push(indexes);
        }

        let mut raw_values = Vec::with_capacity(values.len());
        for ((property, name), profiles) in values.iter().zip(&value_profiles) {
            raw_values.push(RawValue {
                property: *property,
                name: strings.intern(name.as_bytes())?,
                profiles: push_slice(&mut pool, profiles)?,
            });
        }

        let mut raw_profiles = Vec::with_capacity(self.profiles.len());
        for ((profile, own), signatures) in self
            .profiles
            .iter()
            .zip(&profile_values)
            .zip(&profile_signatures)
        {
            raw_profiles.push(RawProfile {
                profile_id: profile.id,
                component: profile.component.id(),
                parent: profile
                    .parent
                    .and_then(|id| self.profile_index.get(&id).copied())
                    .unwrap_or(NONE_REF),
                values: push_slice(&mut pool, own)?,
                signatures: push_slice(&mut pool, signatures)?,
            });
        }

        let mut raw_signatures = Vec::with_capacity(order.len());
        for (rank, profiles) in order.iter().zip(&signature_profile_indexes) {
            let target = &self.source.signatures[self.ranked[*rank]].target;
            raw_signatures.push(RawSignature {
                rank: *rank as u32,
                length: u16::try_from(target.len())
                    .map_err(|_ignored| BuildError::invalid("signature too long"))?,
                nodes: push_slice(&mut pool, &signature_nodes[*rank])?,
                profiles: push_slice(&mut pool, profiles)?,
            });
        }

        let mut raw_components = Vec::with_capacity(self.components.len());
        for component in &self.components {
            let name = component.name.as_deref().unwrap_or(component.kind.as_str());
            raw_components.push(RawComponent {
                id: component.kind.id(),
                name: strings.intern(name.as_bytes())?,
                default_profile: self
                    .profile_index
                    .get(&component.default_profile)
                    .copied()
                    .ok_or_else(|| BuildError::invalid("missing default profile"))?,
            });
        }

        let header = HeaderRecord {
            name: strings.intern(self.source.name.as_bytes())?,
            published: strings.intern(self.source.published.to_string().as_bytes())?,
            lowest_character,
            highest_character,
            max_signature_length: u16::try_from(max_signature_length)
                .map_err(|_ignored| BuildError::invalid("signature too long"))?,
        };

        Ok(PatternTables {
            header,
            string_count: strings.count()?,
            strings: strings.heap,
            components: raw_components,
            properties: raw_properties,
            values: raw_values,
            profiles: raw_profiles,
            signatures: raw_signatures,
            ranked_signatures,
            nodes,
            root_nodes,
            pool,
        })
    }
}

fn push_slice(pool: &mut Vec<u32>, items: &[u32]) -> Result<Slice, BuildError> {
    let slice = Slice {
        start: encode::len_u32(pool.len())?,
        count: encode::len_u32(items.len())?,
    };
    pool.extend_from_slice(items);
    Ok(slice)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{BackendKind, CacheConfig};
    use devmatch_core::ComponentKind::{Browser, Hardware, Software};
    use std::sync::Arc;

    pub(crate) const ANDROID: &str = "Mozilla/5.0 (Linux; Android 14; SM-G991B) Chrome/120";
    pub(crate) const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17) Safari/605";
    pub(crate) const WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0) Chrome/120";

    pub(crate) fn sample() -> DataSetBuilder {
        DataSetBuilder::new("sample", jiff::civil::date(2026, 10, 1))
            .with_component(Hardware, 1)
            .with_component(Software, 10)
            .with_component(Browser, 20)
            .with_property("HardwareVendor", Hardware)
            .with_property("HardwareModel", Hardware)
            .with_property_source(PropertySource {
                name: "IsMobile".to_owned(),
                component: Hardware,
                description: Some("Device is a phone or a tablet".to_owned()),
                mandatory: true,
                list: false,
                default_value: Some("False".to_owned()),
            })
            .with_property("PlatformName", Software)
            .with_property("PlatformVersion", Software)
            .with_property("BrowserName", Browser)
            .with_property("BrowserVersion", Browser)
            .with_profile(1, Hardware, None, [("IsMobile", "False")])
            .with_profile(2, Hardware, None, [("HardwareVendor", "Samsung"), ("IsMobile", "True")])
            .with_profile(3, Hardware, Some(2), [("HardwareModel", "SM-G991B")])
            .with_profile(4, Hardware, Some(3), [])
            .with_profile(
                6,
                Hardware,
                None,
                [("HardwareVendor", "Apple"), ("HardwareModel", "iPhone"), ("IsMobile", "True")],
            )
            .with_profile(10, Software, None, [])
            .with_profile(
                11,
                Software,
                None,
                [("PlatformName", "Android"), ("PlatformVersion", "14")],
            )
            .with_profile(12, Software, None, [("PlatformName", "iOS"), ("PlatformVersion", "17")])
            .with_profile(
                13,
                Software,
                None,
                [("PlatformName", "Windows"), ("PlatformVersion", "10")],
            )
            .with_profile(20, Browser, None, [])
            .with_profile(21, Browser, None, [("BrowserName", "Chrome"), ("BrowserVersion", "120")])
            .with_profile(22, Browser, None, [("BrowserName", "Safari"), ("BrowserVersion", "17")])
            .with_signature(ANDROID, [4, 11, 21], 100)
            .with_signature(IPHONE, [6, 12, 22], 80)
            .with_signature(WINDOWS, [13, 21], 90)
    }

    fn load(version: FormatVersion, backend: BackendKind) -> DataSet {
        let config = DataSetConfig::new()
            .with_backend(backend)
            .with_caches(CacheConfig::uniform(16))
            .with_pool_size(2);
        sample().build_data_set(version, &config).unwrap()
    }

    #[test]
    fn patterns_reconstruct_targets() {
        for version in [FormatVersion::PatternV31, FormatVersion::PatternV32] {
            for backend in [BackendKind::Memory, BackendKind::Stream] {
                let data_set = load(version, backend);
                assert_eq!(data_set.version(), version);
                assert_eq!(data_set.signature_count(), 3);
                let mut patterns = Vec::new();
                for rank in 0..3 {
                    let signature = data_set.ranked_signature(rank).unwrap();
                    assert_eq!(signature.rank(), rank);
                    assert!(signature.nodes().is_sorted());
                    let pattern = data_set.signature_pattern(&signature).unwrap();
                    patterns.push(String::from_utf8(pattern).unwrap());

                    let found = data_set.find_signature(signature.nodes()).unwrap().unwrap();
                    assert_eq!(found.index(), signature.index());
                }
                assert_eq!(patterns, [ANDROID, WINDOWS, IPHONE], "{version} {backend}");
            }
        }
    }

    #[test]
    fn header_and_lookups() {
        let data_set = load(FormatVersion::PatternV32, BackendKind::Memory);
        assert_eq!(data_set.name(), "sample");
        assert_eq!(data_set.published(), jiff::civil::date(2026, 10, 1));
        assert_eq!(data_set.max_signature_length(), ANDROID.len());
        assert_eq!(data_set.lowest_character(), b' ');
        assert_eq!(data_set.highest_character(), b'z');
        assert!(data_set.root_node(ANDROID.len()).is_some());
        assert!(data_set.root_node(ANDROID.len() + 1).is_none());

        let vendor = data_set.property("HardwareVendor").unwrap();
        assert_eq!(vendor.component(), Hardware);
        assert!(data_set.property("Vendor").is_none());

        let is_mobile = data_set.property("IsMobile").unwrap();
        assert!(is_mobile.is_mandatory());
        assert_eq!(is_mobile.description(), Some("Device is a phone or a tablet"));
        assert_eq!(
            data_set.default_value(is_mobile).unwrap().as_deref(),
            Some("False")
        );

        let samsung = data_set.find_profile(2).unwrap().unwrap();
        assert_eq!(
            data_set.profile_values(&samsung, vendor).unwrap(),
            [Arc::<str>::from("Samsung")]
        );
        let grandchild = data_set.find_profile(4).unwrap().unwrap();
        assert!(data_set.profile_values(&grandchild, vendor).unwrap().is_empty());
        let child = data_set.profile(grandchild.parent().unwrap()).unwrap();
        assert_eq!(child.profile_id(), 3);
        assert!(data_set.find_profile(5).unwrap().is_none());

        let android: Vec<u32> = data_set
            .find_profiles("PlatformName", "Android")
            .unwrap()
            .iter()
            .map(|profile| profile.profile_id())
            .collect();
        assert_eq!(android, [11]);
        assert!(data_set.find_profiles("PlatformName", "BeOS").unwrap().is_empty());

        let hardware = data_set.component(Hardware).unwrap();
        assert_eq!(hardware.name(), "HardwarePlatform");
        let default = data_set.profile(hardware.default_profile()).unwrap();
        assert_eq!(default.profile_id(), 1);
    }

    #[test]
    fn missing_components_use_default_profile() {
        let data_set = load(FormatVersion::PatternV31, BackendKind::Memory);
        let windows = data_set.ranked_signature(1).unwrap();
        let ids: Vec<u32> = windows
            .profiles()
            .iter()
            .map(|index| data_set.profile(*index).unwrap().profile_id())
            .collect();
        assert_eq!(ids, [1, 13, 21]);
        let chrome = data_set.find_profile(21).unwrap().unwrap();
        assert_eq!(chrome.signatures().len(), 2);
    }

    #[test]
    fn complete_nodes_list_their_signatures() {
        let data_set = load(FormatVersion::PatternV32, BackendKind::Stream);
        let signature = data_set.ranked_signature(0).unwrap();
        for offset in signature.nodes() {
            let node = data_set.node(*offset).unwrap();
            assert!(node.is_complete());
            assert!(node.ranked_signatures().contains(&0));
            assert!(node.matches(ANDROID.as_bytes()));
        }
        let mozilla = signature.nodes().iter().find_map(|offset| {
            let node = data_set.node(*offset).unwrap();
            (node.characters() == b"Mozilla/").then_some(node)
        });
        assert_eq!(mozilla.unwrap().ranked_signatures(), [0, 1, 2]);
    }

    #[test]
    fn invalid_sources_are_rejected() {
        let cyclic = sample()
            .with_profile(7, Hardware, Some(8), [])
            .with_profile(8, Hardware, Some(7), []);
        assert!(matches!(
            cyclic.build(FormatVersion::PatternV32),
            Err(BuildError::Invalid(msg)) if msg.contains("cyclic")
        ));

        let duplicate = sample().with_signature(ANDROID, [2], 1);
        assert!(matches!(
            duplicate.build(FormatVersion::PatternV32),
            Err(BuildError::Invalid(msg)) if msg.contains("duplicate signature")
        ));

        let missing = sample().with_signature("Other/1.0", [99], 1);
        assert!(missing.build(FormatVersion::PatternV32).is_err());

        let wrong_component = sample().with_profile(9, Hardware, Some(11), []);
        assert!(wrong_component.build(FormatVersion::PatternV31).is_err());

        let unknown_property = sample().with_profile(9, Hardware, None, [("Colour", "Red")]);
        assert!(unknown_property.build(FormatVersion::PatternV31).is_err());

        assert!(sample().build(FormatVersion::TrieV32).is_err());
    }

    #[test]
    fn json_source_roundtrip() {
        let json = serde_json::to_string(sample().source()).unwrap();
        let builder = DataSetBuilder::from_json(&json).unwrap();
        assert_eq!(
            builder.build(FormatVersion::PatternV32).unwrap(),
            sample().build(FormatVersion::PatternV32).unwrap()
        );
        assert!(DataSetBuilder::from_json("{").is_err());
    }
}
