use crate::{
    entity::{Component, Node, Profile, Property, Signature, Value},
    error::DataSetError,
    format::{FormatVersion, PatternLayout, PatternSection, decode::Resolve},
    index::{
        NodeOffset, ProfileIndex, PropertyIndex, SignatureIndex, StringOffset, ValueIndex,
        optional,
    },
    source::{
        Backend, CacheConfig, CachedSource, EntityCacheStats, EntitySource, MemorySource,
        ReadSeek, ReaderFactory, SectionReader, StreamSource,
    },
};
use ahash::HashMap;
use devmatch_core::{
    ComponentKind,
    resolve::{ProfileGraph, Values},
};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    fs::File,
    io::{BufReader, Cursor},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

/// Storage backend used by a [`DataSet`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Every entity is constructed while loading.
    #[default]
    Memory,
    /// Entities are read on demand from a pool of readers.
    Stream,
}

impl BackendKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Stream => "stream",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

/// Options used to load a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSetConfig {
    backend: BackendKind,
    caches: CacheConfig,
    pool_size: usize,
    pool_timeout_ms: u64,
}

impl Default for DataSetConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            caches: CacheConfig::default(),
            pool_size: std::thread::available_parallelism().map_or(4, usize::from),
            pool_timeout_ms: 1_000,
        }
    }
}

impl DataSetConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    #[must_use]
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn set_backend(&mut self, backend: BackendKind) -> &mut Self {
        self.backend = backend;
        self
    }

    #[must_use]
    pub fn caches(&self) -> CacheConfig {
        self.caches
    }

    #[must_use]
    pub fn with_caches(mut self, caches: CacheConfig) -> Self {
        self.caches = caches;
        self
    }

    pub fn set_caches(&mut self, caches: CacheConfig) -> &mut Self {
        self.caches = caches;
        self
    }

    /// Maximum amount of readers of the stream backend.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    #[must_use]
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    pub fn set_pool_size(&mut self, size: usize) -> &mut Self {
        self.pool_size = size;
        self
    }

    /// How long a read waits for a reader of the stream backend.
    #[must_use]
    pub fn pool_timeout(&self) -> Duration {
        Duration::from_millis(self.pool_timeout_ms)
    }

    #[must_use]
    pub fn with_pool_timeout(mut self, timeout: Duration) -> Self {
        self.set_pool_timeout(timeout);
        self
    }

    pub fn set_pool_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.pool_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

/// Read-only signature data set.
///
/// Small and frequently used tables (components, properties, ranks and
/// root nodes) are loaded up front. All other entities are served by the
/// configured [`BackendKind`], behind one LRU cache per entity kind.
pub struct DataSet {
    version: FormatVersion,
    name: Arc<str>,
    published: jiff::civil::Date,
    lowest_character: u8,
    highest_character: u8,
    max_signature_length: usize,
    components: Vec<Arc<Component>>,
    properties: Vec<Arc<Property>>,
    registry: HashMap<Arc<str>, PropertyIndex>,
    ranked_signatures: Vec<SignatureIndex>,
    root_nodes: Vec<Option<NodeOffset>>,
    profile_ids: Vec<u32>,
    value_count: u32,
    node_count: u32,
    string_count: u32,
    backend_kind: BackendKind,
    source: CachedSource,
}

impl fmt::Debug for DataSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSet")
            .field("version", &self.version)
            .field("name", &self.name)
            .field("published", &self.published)
            .field("backend", &self.backend_kind)
            .field("profiles", &self.profile_ids.len())
            .field("signatures", &self.ranked_signatures.len())
            .field("nodes", &self.node_count)
            .finish_non_exhaustive()
    }
}

impl DataSet {
    /// Open the pattern file at `path`.
    ///
    /// The memory backend maps the file and decodes it completely, the
    /// stream backend keeps opening readers over it.
    pub fn open(path: impl AsRef<Path>, config: &DataSetConfig) -> Result<Self, DataSetError> {
        let path = path.as_ref();
        tracing::debug!(
            "open data set {} with {} backend",
            path.display(),
            config.backend
        );
        match config.backend {
            BackendKind::Memory => {
                let file = File::open(path).map_err(DataSetError::Io)?;
                // SAFETY: the map is only read while decoding and dropped
                // before returning. Truncation of the file while loading
                // surfaces as a bus error, as for any mapped file.
                let map = unsafe { memmap2::Mmap::map(&file) }.map_err(DataSetError::Io)?;
                Self::load_memory(&map, config)
            }
            BackendKind::Stream => {
                let path: PathBuf = path.to_owned();
                let factory: ReaderFactory = Box::new(move || {
                    let file = File::open(&path)?;
                    Ok(Box::new(BufReader::new(file)) as Box<dyn ReadSeek>)
                });
                Self::load_stream(factory, config)
            }
        }
    }

    /// Load a data set from the bytes of a pattern file.
    pub fn from_bytes(
        bytes: impl Into<Arc<[u8]>>,
        config: &DataSetConfig,
    ) -> Result<Self, DataSetError> {
        let bytes: Arc<[u8]> = bytes.into();
        match config.backend {
            BackendKind::Memory => Self::load_memory(&bytes, config),
            BackendKind::Stream => {
                let factory: ReaderFactory = Box::new(move || {
                    Ok(Box::new(Cursor::new(bytes.clone())) as Box<dyn ReadSeek>)
                });
                Self::load_stream(factory, config)
            }
        }
    }

    /// Load a data set streamed from readers created by `factory`.
    pub fn from_reader_factory(
        factory: ReaderFactory,
        config: &DataSetConfig,
    ) -> Result<Self, DataSetError> {
        Self::load_stream(factory, config)
    }

    fn load_memory(bytes: &[u8], config: &DataSetConfig) -> Result<Self, DataSetError> {
        let mut cursor = Cursor::new(bytes);
        let layout = PatternLayout::read(&mut cursor)?;
        let tables = Tables::read(&mut SectionReader::new(&mut cursor, &layout))?;
        let source = MemorySource::load(bytes, &layout)?;
        source.check_tables(
            &tables.root_nodes,
            tables
                .components
                .iter()
                .map(|component| component.default_profile()),
        )?;
        let backend = Backend::Memory(source);
        Ok(Self::assemble(layout, tables, backend, config))
    }

    fn load_stream(factory: ReaderFactory, config: &DataSetConfig) -> Result<Self, DataSetError> {
        let mut reader = factory().map_err(DataSetError::Io)?;
        let layout = PatternLayout::read(&mut *reader)?;
        let tables = Tables::read(&mut SectionReader::new(&mut *reader, &layout))?;
        drop(reader);
        let backend = Backend::Stream(StreamSource::new(
            factory,
            layout.clone(),
            config.pool_size,
            config.pool_timeout(),
        ));
        Ok(Self::assemble(layout, tables, backend, config))
    }

    fn assemble(
        layout: PatternLayout,
        tables: Tables,
        backend: Backend,
        config: &DataSetConfig,
    ) -> Self {
        let registry = tables
            .properties
            .iter()
            .map(|property| (property.name.clone(), property.index))
            .collect();
        let data_set = Self {
            version: layout.version,
            name: tables.name,
            published: tables.published,
            lowest_character: layout.header.lowest_character,
            highest_character: layout.header.highest_character,
            max_signature_length: usize::from(layout.header.max_signature_length),
            components: tables.components,
            properties: tables.properties,
            registry,
            ranked_signatures: tables.ranked_signatures,
            root_nodes: tables.root_nodes,
            profile_ids: tables.profile_ids,
            value_count: layout.section(PatternSection::Values).count,
            node_count: layout.section(PatternSection::Nodes).count,
            string_count: layout.section(PatternSection::Strings).count,
            backend_kind: config.backend,
            source: CachedSource::new(backend, config.caches),
        };
        tracing::debug!(
            "loaded data set {} ({}, published {}): {} profiles, {} signatures, {} nodes",
            data_set.name,
            data_set.version,
            data_set.published,
            data_set.profile_ids.len(),
            data_set.ranked_signatures.len(),
            data_set.node_count
        );
        data_set
    }

    #[must_use]
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn published(&self) -> jiff::civil::Date {
        self.published
    }

    /// Lowest character found in any signature.
    #[must_use]
    pub fn lowest_character(&self) -> u8 {
        self.lowest_character
    }

    /// Highest character found in any signature.
    #[must_use]
    pub fn highest_character(&self) -> u8 {
        self.highest_character
    }

    /// Length of the longest signature pattern.
    #[must_use]
    pub fn max_signature_length(&self) -> usize {
        self.max_signature_length
    }

    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        self.backend_kind
    }

    /// Size of the reader pool and amount of readers created so far,
    /// `None` for the memory backend.
    #[must_use]
    pub fn reader_pool_usage(&self) -> Option<(usize, usize)> {
        match self.source.backend() {
            Backend::Memory(_) => None,
            Backend::Stream(source) => Some((source.pool_size(), source.readers_created())),
        }
    }

    #[must_use]
    pub fn components(&self) -> &[Arc<Component>] {
        &self.components
    }

    #[must_use]
    pub fn component(&self, kind: ComponentKind) -> Option<&Arc<Component>> {
        self.components.iter().find(|component| component.kind == kind)
    }

    /// Properties, sorted by component and name.
    #[must_use]
    pub fn properties(&self) -> &[Arc<Property>] {
        &self.properties
    }

    /// Look up a property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Arc<Property>> {
        self.registry
            .get(name)
            .and_then(|index| self.properties.get(index.as_usize()))
    }

    #[must_use]
    pub fn property_at(&self, index: PropertyIndex) -> Option<&Arc<Property>> {
        self.properties.get(index.as_usize())
    }

    #[must_use]
    pub fn profile_count(&self) -> usize {
        self.profile_ids.len()
    }

    #[must_use]
    pub fn signature_count(&self) -> usize {
        self.ranked_signatures.len()
    }

    #[must_use]
    pub fn value_count(&self) -> usize {
        self.value_count as usize
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_count as usize
    }

    #[must_use]
    pub fn string_count(&self) -> usize {
        self.string_count as usize
    }

    pub fn string(&self, offset: StringOffset) -> Result<Arc<[u8]>, DataSetError> {
        self.source.string(offset)
    }

    pub fn node(&self, offset: NodeOffset) -> Result<Arc<Node>, DataSetError> {
        self.source.node(offset)
    }

    pub fn value(&self, index: ValueIndex) -> Result<Arc<Value>, DataSetError> {
        self.source.value(index)
    }

    pub fn profile(&self, index: ProfileIndex) -> Result<Arc<Profile>, DataSetError> {
        self.source.profile(index)
    }

    pub fn signature(&self, index: SignatureIndex) -> Result<Arc<Signature>, DataSetError> {
        self.source.signature(index)
    }

    /// Signature at position `rank` of the popularity order.
    pub fn ranked_signature(&self, rank: u32) -> Result<Arc<Signature>, DataSetError> {
        let index = self
            .ranked_signatures
            .get(rank as usize)
            .copied()
            .ok_or_else(|| DataSetError::not_found("ranked signature", rank))?;
        self.signature(index)
    }

    /// Root of the nodes ending right before position `end`.
    #[must_use]
    pub fn root_node(&self, end: usize) -> Option<NodeOffset> {
        self.root_nodes.get(end).copied().flatten()
    }

    /// Look up a profile by its public identifier.
    pub fn find_profile(&self, profile_id: u32) -> Result<Option<Arc<Profile>>, DataSetError> {
        match self.profile_ids.binary_search(&profile_id) {
            Ok(idx) => self.profile(ProfileIndex::new(idx as u32)).map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Named value of a property, found by binary search over its values.
    pub fn find_value(
        &self,
        property: &Property,
        name: &str,
    ) -> Result<Option<Arc<Value>>, DataSetError> {
        let range = property.value_range();
        let (mut low, mut high) = (range.start, range.end);
        while low < high {
            let mid = low + (high - low) / 2;
            let value = self.value(ValueIndex::new(mid))?;
            match value.name().cmp(name) {
                std::cmp::Ordering::Less => low = mid + 1,
                std::cmp::Ordering::Greater => high = mid,
                std::cmp::Ordering::Equal => return Ok(Some(value)),
            }
        }
        Ok(None)
    }

    /// Profiles having `value` for the property named `property`.
    pub fn find_profiles(
        &self,
        property: &str,
        value: &str,
    ) -> Result<Vec<Arc<Profile>>, DataSetError> {
        let Some(property) = self.property(property) else {
            return Ok(Vec::new());
        };
        let Some(value) = self.find_value(property, value)? else {
            return Ok(Vec::new());
        };
        value
            .profiles()
            .iter()
            .map(|index| self.profile(*index))
            .collect()
    }

    /// Value names `profile` defines itself for `property`.
    pub fn profile_values(
        &self,
        profile: &Profile,
        property: &Property,
    ) -> Result<Vec<Arc<str>>, DataSetError> {
        profile
            .values_of(property)
            .iter()
            .map(|index| self.value(*index).map(|value| value.name_arc().clone()))
            .collect()
    }

    /// Default value name of `property`, if it has one.
    pub fn default_value(&self, property: &Property) -> Result<Option<Arc<str>>, DataSetError> {
        match property.default_value() {
            Some(index) => Ok(Some(self.value(index)?.name_arc().clone())),
            None => Ok(None),
        }
    }

    /// Signature whose nodes are exactly `nodes`, which has to be sorted.
    ///
    /// Signatures are ordered by their node lists, so this is a binary
    /// search over the signature list.
    pub fn find_signature(
        &self,
        nodes: &[NodeOffset],
    ) -> Result<Option<Arc<Signature>>, DataSetError> {
        let (mut low, mut high) = (0u32, self.ranked_signatures.len() as u32);
        while low < high {
            let mid = low + (high - low) / 2;
            let signature = self.signature(SignatureIndex::new(mid))?;
            match signature.nodes().cmp(nodes) {
                std::cmp::Ordering::Less => low = mid + 1,
                std::cmp::Ordering::Greater => high = mid,
                std::cmp::Ordering::Equal => return Ok(Some(signature)),
            }
        }
        Ok(None)
    }

    /// Pattern of a signature, with `_` at positions no node covers.
    pub fn signature_pattern(&self, signature: &Signature) -> Result<Vec<u8>, DataSetError> {
        let mut pattern = vec![b'_'; signature.length()];
        for offset in signature.nodes() {
            let node = self.node(*offset)?;
            if let Some(window) = pattern.get_mut(node.position()..node.end()) {
                window.copy_from_slice(node.characters());
            }
        }
        Ok(pattern)
    }

    pub fn cache_stats(&self) -> EntityCacheStats {
        self.source.stats()
    }

    /// Clear every entity cache and its statistics.
    pub fn reset_caches(&self) {
        self.source.reset();
    }

    /// Drop cached entities not used for `max_idle`, returning how many.
    pub fn purge_idle(&self, max_idle: Duration) -> usize {
        self.source.purge_idle(max_idle)
    }
}

impl ProfileGraph for DataSet {
    type Profile = Arc<Profile>;
    type Property = Property;
    type Error = DataSetError;

    fn own_values(
        &self,
        profile: &Arc<Profile>,
        property: &Property,
    ) -> Result<Option<Values>, DataSetError> {
        let names = self.profile_values(profile, property)?;
        Ok((!names.is_empty()).then(|| Values::new(names)))
    }

    fn parent(&self, profile: &Arc<Profile>) -> Result<Option<Arc<Profile>>, DataSetError> {
        profile.parent().map(|index| self.profile(index)).transpose()
    }
}

/// Tables loaded up front, identical for both backends.
struct Tables {
    name: Arc<str>,
    published: jiff::civil::Date,
    components: Vec<Arc<Component>>,
    properties: Vec<Arc<Property>>,
    ranked_signatures: Vec<SignatureIndex>,
    root_nodes: Vec<Option<NodeOffset>>,
    profile_ids: Vec<u32>,
}

impl Tables {
    fn read<R>(reader: &mut SectionReader<'_, R>) -> Result<Self, DataSetError>
    where
        R: std::io::Read + std::io::Seek + ?Sized,
    {
        let layout_header = reader.header();
        let name = reader.text(StringOffset::new(layout_header.name))?;
        let published_text = reader.text(StringOffset::new(layout_header.published))?;
        let published = published_text.parse::<jiff::civil::Date>().map_err(|err| {
            DataSetError::parse("header", format!("invalid published date: {err}"))
        })?;

        let components = (0..reader.count(PatternSection::Components))
            .map(|idx| reader.component(idx).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        let properties = (0..reader.count(PatternSection::Properties))
            .map(|idx| reader.property(PropertyIndex::new(idx)).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        let signature_count = reader.count(PatternSection::Signatures);
        let ranked_signatures: Vec<SignatureIndex> = reader
            .integer_list(PatternSection::RankedSignatures)?
            .into_iter()
            .map(SignatureIndex::new)
            .collect();
        if ranked_signatures.len() != signature_count as usize
            || ranked_signatures.iter().any(|idx| idx.get() >= signature_count)
        {
            return Err(DataSetError::parse(
                "ranked signatures",
                "ranks do not cover the signature list",
            ));
        }

        let root_nodes = reader
            .integer_list(PatternSection::RootNodes)?
            .into_iter()
            .map(|raw| optional(raw, NodeOffset::new))
            .collect();

        let profile_ids = (0..reader.count(PatternSection::Profiles))
            .map(|idx| reader.profile_id(ProfileIndex::new(idx)))
            .collect::<Result<Vec<_>, _>>()?;
        if !profile_ids.is_sorted_by(|a, b| a < b) {
            return Err(DataSetError::parse(
                "profiles",
                "profiles not sorted by unique id",
            ));
        }

        Ok(Self {
            name,
            published,
            components,
            properties,
            ranked_signatures,
            root_nodes,
            profile_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::tests::{ANDROID, sample},
        format::{
            decode::{self, RawNode, RawRanked},
            encode::node_len,
        },
    };

    fn built(version: FormatVersion) -> Vec<u8> {
        sample().build(version).unwrap()
    }

    #[test]
    fn unsupported_version_fails_before_reading_entities() {
        let mut bytes = built(FormatVersion::PatternV32);
        bytes[6] = 7;
        bytes.truncate(16);
        for backend in [BackendKind::Memory, BackendKind::Stream] {
            let config = DataSetConfig::new().with_backend(backend);
            match DataSet::from_bytes(bytes.clone(), &config) {
                Err(DataSetError::UnsupportedVersion(err)) => {
                    assert_eq!(err.to_string(), "unsupported data set format version: PatternV3.7");
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[test]
    fn trie_file_is_not_a_pattern_data_set() {
        let mut bytes = built(FormatVersion::PatternV32);
        bytes[4] = FormatVersion::TrieV32.tag();
        let err = DataSet::from_bytes(bytes, &DataSetConfig::new()).unwrap_err();
        assert!(err.is_format());
    }

    #[test]
    fn truncated_file_fails_to_load() {
        let bytes = built(FormatVersion::PatternV31);
        for len in [3, 10, 30, bytes.len() / 2, bytes.len() - 1] {
            for backend in [BackendKind::Memory, BackendKind::Stream] {
                let config = DataSetConfig::new().with_backend(backend);
                let err = DataSet::from_bytes(bytes[..len].to_vec(), &config).unwrap_err();
                assert!(err.is_format(), "{len} {backend}: {err}");
            }
        }
    }

    #[test]
    fn oversized_string_count_is_a_format_error() {
        let mut bytes = built(FormatVersion::PatternV32);
        // count of the strings section, right after preamble and header
        bytes[20..24].copy_from_slice(&u32::MAX.to_le_bytes());
        for backend in [BackendKind::Memory, BackendKind::Stream] {
            let config = DataSetConfig::new().with_backend(backend);
            let err = DataSet::from_bytes(bytes.clone(), &config).unwrap_err();
            assert!(err.is_format(), "{backend}: {err}");
            assert!(err.to_string().contains("strings"), "{backend}: {err}");
        }
    }

    /// Position in `bytes` of the offset of the first child of any node.
    fn first_child_offset(bytes: &[u8]) -> usize {
        let layout = PatternLayout::read(&mut Cursor::new(bytes)).unwrap();
        let nodes = layout.section(PatternSection::Nodes);
        let pooled = layout.version.stores_ranked_in_pool();
        let mut position = nodes.start;
        while position < nodes.end() {
            let mut cursor = Cursor::new(bytes);
            cursor.set_position(position);
            let raw = RawNode::read(&mut cursor, pooled).unwrap();
            let ranked = match &raw.ranked {
                RawRanked::Inline(items) => items.len(),
                RawRanked::Pooled(_) => 0,
            };
            let header = node_len(layout.version, ranked, 0, 0);
            if !raw.children.is_empty() {
                // skip the key of the child
                return (position + header + 1) as usize;
            }
            position += node_len(
                layout.version,
                ranked,
                raw.children.len(),
                raw.numeric_children.len(),
            );
        }
        panic!("no node with children");
    }

    #[test]
    fn dangling_child_offset_fails_to_load() {
        for version in [FormatVersion::PatternV31, FormatVersion::PatternV32] {
            let mut bytes = built(version);
            let at = first_child_offset(&bytes);
            // one byte into a node record is never the start of a node
            let offset = u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap()) + 1;
            bytes[at..at + 4].copy_from_slice(&offset.to_le_bytes());

            let err = DataSet::from_bytes(bytes, &DataSetConfig::new()).unwrap_err();
            assert!(err.is_format(), "{version}: {err}");
            assert!(err.to_string().contains("missing node"), "{version}: {err}");
        }
    }

    #[test]
    fn dangling_profile_index_fails_to_load() {
        let mut bytes = built(FormatVersion::PatternV32);
        let layout = PatternLayout::read(&mut Cursor::new(&bytes)).unwrap();
        let components = layout.section(PatternSection::Components);
        let profile_count = layout.section(PatternSection::Profiles).count;
        // default profile index closes the first component record
        let at = (components.start + decode::COMPONENT_LEN - 4) as usize;
        bytes[at..at + 4].copy_from_slice(&profile_count.to_le_bytes());

        let err = DataSet::from_bytes(bytes, &DataSetConfig::new()).unwrap_err();
        assert!(err.is_format(), "{err}");
        assert!(err.to_string().contains("missing profile"), "{err}");
    }

    #[test]
    fn backends_serve_identical_entities() {
        let bytes = built(FormatVersion::PatternV32);
        let memory = DataSet::from_bytes(bytes.clone(), &DataSetConfig::new()).unwrap();
        let stream = DataSet::from_bytes(
            bytes,
            &DataSetConfig::new()
                .with_backend(BackendKind::Stream)
                .with_caches(CacheConfig::disabled()),
        )
        .unwrap();

        assert_eq!(memory.node_count(), stream.node_count());
        assert_eq!(memory.string_count(), stream.string_count());
        assert_eq!(memory.reader_pool_usage(), None);
        for idx in 0..memory.signature_count() as u32 {
            let a = memory.signature(SignatureIndex::new(idx)).unwrap();
            let b = stream.signature(SignatureIndex::new(idx)).unwrap();
            assert_eq!(a.nodes(), b.nodes());
            assert_eq!(a.profiles(), b.profiles());
            assert_eq!(
                memory.signature_pattern(&a).unwrap(),
                stream.signature_pattern(&b).unwrap()
            );
        }
        for idx in 0..memory.profile_count() as u32 {
            let a = memory.profile(ProfileIndex::new(idx)).unwrap();
            let b = stream.profile(ProfileIndex::new(idx)).unwrap();
            assert_eq!(a.profile_id(), b.profile_id());
            assert_eq!(a.values(), b.values());
            assert_eq!(a.parent(), b.parent());
        }
        let (size, created) = stream.reader_pool_usage().unwrap();
        assert!((1..=size).contains(&created));
    }

    #[test]
    fn entity_caches_count_misses() {
        let config = DataSetConfig::new().with_caches(CacheConfig::uniform(64));
        let data_set = DataSet::from_bytes(built(FormatVersion::PatternV32), &config).unwrap();
        let signature = data_set.ranked_signature(0).unwrap();
        data_set.signature_pattern(&signature).unwrap();
        data_set.signature_pattern(&signature).unwrap();

        let stats = data_set.cache_stats();
        let nodes = signature.nodes().len() as u64;
        assert_eq!(stats.nodes.requests, 2 * nodes);
        assert_eq!(stats.nodes.misses, nodes);

        data_set.reset_caches();
        assert_eq!(data_set.cache_stats().nodes.requests, 0);
        assert_eq!(data_set.purge_idle(Duration::ZERO), 0);
    }

    #[test]
    fn open_file_with_both_backends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.dmds");
        sample().write_to(&path, FormatVersion::PatternV31).unwrap();
        for backend in [BackendKind::Memory, BackendKind::Stream] {
            let data_set =
                DataSet::open(&path, &DataSetConfig::new().with_backend(backend)).unwrap();
            assert_eq!(data_set.backend_kind(), backend);
            assert_eq!(data_set.max_signature_length(), ANDROID.len());
        }
        let missing = DataSet::open(dir.path().join("missing"), &DataSetConfig::new());
        assert!(matches!(missing, Err(DataSetError::Io(_))));
    }

    #[test]
    fn config_from_json() {
        let config: DataSetConfig = serde_json::from_str(
            r#"{"backend": "stream", "pool_size": 3, "pool_timeout_ms": 250, "caches": {"nodes": 10}}"#,
        )
        .unwrap();
        assert_eq!(config.backend(), BackendKind::Stream);
        assert_eq!(config.pool_size(), 3);
        assert_eq!(config.pool_timeout(), Duration::from_millis(250));
        assert_eq!(config.caches().nodes, 10);
        assert_eq!(config.caches().strings, CacheConfig::default().strings);
    }
}
