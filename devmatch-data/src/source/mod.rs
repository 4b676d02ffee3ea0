//! Entity sources: the in-memory and the streamed backend, and the
//! per entity caches placed in front of both.

use crate::{
    entity::{Component, Node, Profile, Property, Signature, Value},
    error::DataSetError,
    format::{
        HeaderRecord, PatternLayout, PatternSection, Section,
        decode::{
            self, RawComponent, RawNode, RawProfile, RawProperty, RawSignature, RawValue,
            Resolve, Slice,
        },
    },
    index::{NodeOffset, ProfileIndex, PropertyIndex, SignatureIndex, StringOffset, ValueIndex},
};
use devmatch_core::cache::{CacheStats, LruCache};
use serde::Serialize;
use std::{
    io::{Read, Seek, SeekFrom},
    sync::Arc,
    time::Duration,
};

mod memory;
pub(crate) use memory::MemorySource;

mod pool;
pub use pool::{ReadSeek, ReaderFactory};

mod stream;
pub(crate) use stream::StreamSource;

/// Lookup of entities by index or offset.
pub(crate) trait EntitySource {
    fn string(&self, offset: StringOffset) -> Result<Arc<[u8]>, DataSetError>;
    fn node(&self, offset: NodeOffset) -> Result<Arc<Node>, DataSetError>;
    fn value(&self, index: ValueIndex) -> Result<Arc<Value>, DataSetError>;
    fn profile(&self, index: ProfileIndex) -> Result<Arc<Profile>, DataSetError>;
    fn signature(&self, index: SignatureIndex) -> Result<Arc<Signature>, DataSetError>;
}

/// Storage backend of a loaded data set.
#[derive(Debug)]
pub(crate) enum Backend {
    Memory(MemorySource),
    Stream(StreamSource),
}

macro_rules! dispatch {
    ($self:ident, $method:ident, $arg:ident) => {
        match $self {
            Self::Memory(source) => source.$method($arg),
            Self::Stream(source) => source.$method($arg),
        }
    };
}

impl EntitySource for Backend {
    fn string(&self, offset: StringOffset) -> Result<Arc<[u8]>, DataSetError> {
        dispatch!(self, string, offset)
    }

    fn node(&self, offset: NodeOffset) -> Result<Arc<Node>, DataSetError> {
        dispatch!(self, node, offset)
    }

    fn value(&self, index: ValueIndex) -> Result<Arc<Value>, DataSetError> {
        dispatch!(self, value, index)
    }

    fn profile(&self, index: ProfileIndex) -> Result<Arc<Profile>, DataSetError> {
        dispatch!(self, profile, index)
    }

    fn signature(&self, index: SignatureIndex) -> Result<Arc<Signature>, DataSetError> {
        dispatch!(self, signature, index)
    }
}

/// Capacities of the per entity caches.
///
/// A capacity of `0` disables the cache for that entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub strings: usize,
    pub nodes: usize,
    pub values: usize,
    pub profiles: usize,
    pub signatures: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            strings: 5_000,
            nodes: 15_000,
            values: 5_000,
            profiles: 600,
            signatures: 500,
        }
    }
}

impl CacheConfig {
    /// Configuration with every cache disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            strings: 0,
            nodes: 0,
            values: 0,
            profiles: 0,
            signatures: 0,
        }
    }

    /// Configuration with the same capacity for every entity.
    #[must_use]
    pub fn uniform(capacity: usize) -> Self {
        Self {
            strings: capacity,
            nodes: capacity,
            values: capacity,
            profiles: capacity,
            signatures: capacity,
        }
    }
}

/// Statistics of the per entity caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCacheStats {
    pub strings: CacheStats,
    pub nodes: CacheStats,
    pub values: CacheStats,
    pub profiles: CacheStats,
    pub signatures: CacheStats,
}

/// A [`Backend`] behind one [`LruCache`] per entity kind.
#[derive(Debug)]
pub(crate) struct CachedSource {
    backend: Backend,
    strings: LruCache<StringOffset, Arc<[u8]>>,
    nodes: LruCache<NodeOffset, Arc<Node>>,
    values: LruCache<ValueIndex, Arc<Value>>,
    profiles: LruCache<ProfileIndex, Arc<Profile>>,
    signatures: LruCache<SignatureIndex, Arc<Signature>>,
}

impl CachedSource {
    pub(crate) fn new(backend: Backend, config: CacheConfig) -> Self {
        Self {
            backend,
            strings: LruCache::new(config.strings),
            nodes: LruCache::new(config.nodes),
            values: LruCache::new(config.values),
            profiles: LruCache::new(config.profiles),
            signatures: LruCache::new(config.signatures),
        }
    }

    pub(crate) fn backend(&self) -> &Backend {
        &self.backend
    }

    pub(crate) fn stats(&self) -> EntityCacheStats {
        EntityCacheStats {
            strings: self.strings.stats(),
            nodes: self.nodes.stats(),
            values: self.values.stats(),
            profiles: self.profiles.stats(),
            signatures: self.signatures.stats(),
        }
    }

    pub(crate) fn reset(&self) {
        self.strings.reset();
        self.nodes.reset();
        self.values.reset();
        self.profiles.reset();
        self.signatures.reset();
    }

    pub(crate) fn purge_idle(&self, max_idle: Duration) -> usize {
        self.strings.purge_idle(max_idle)
            + self.nodes.purge_idle(max_idle)
            + self.values.purge_idle(max_idle)
            + self.profiles.purge_idle(max_idle)
            + self.signatures.purge_idle(max_idle)
    }
}

impl EntitySource for CachedSource {
    fn string(&self, offset: StringOffset) -> Result<Arc<[u8]>, DataSetError> {
        self.strings
            .get_or_load(&offset, |offset| self.backend.string(*offset))
    }

    fn node(&self, offset: NodeOffset) -> Result<Arc<Node>, DataSetError> {
        self.nodes
            .get_or_load(&offset, |offset| self.backend.node(*offset))
    }

    fn value(&self, index: ValueIndex) -> Result<Arc<Value>, DataSetError> {
        self.values
            .get_or_load(&index, |index| self.backend.value(*index))
    }

    fn profile(&self, index: ProfileIndex) -> Result<Arc<Profile>, DataSetError> {
        self.profiles
            .get_or_load(&index, |index| self.backend.profile(*index))
    }

    fn signature(&self, index: SignatureIndex) -> Result<Arc<Signature>, DataSetError> {
        self.signatures
            .get_or_load(&index, |index| self.backend.signature(*index))
    }
}

/// Reads records of a pattern file located by a [`PatternLayout`].
///
/// Strings and pooled integers referenced by a record are read with the
/// same reader, once the record itself has been read.
pub(crate) struct SectionReader<'a, R: ?Sized> {
    reader: &'a mut R,
    layout: &'a PatternLayout,
}

impl<'a, R: Read + Seek + ?Sized> SectionReader<'a, R> {
    pub(crate) fn new(reader: &'a mut R, layout: &'a PatternLayout) -> Self {
        Self { reader, layout }
    }

    pub(crate) fn header(&self) -> HeaderRecord {
        self.layout.header
    }

    pub(crate) fn count(&self, kind: PatternSection) -> u32 {
        self.layout.section(kind).count
    }

    fn seek(&mut self, position: u64) -> Result<(), DataSetError> {
        self.reader
            .seek(SeekFrom::Start(position))
            .map(|_position| ())
            .map_err(DataSetError::Io)
    }

    fn fixed<T>(
        &mut self,
        kind: PatternSection,
        index: u32,
        read: impl FnOnce(&mut R) -> std::io::Result<T>,
    ) -> Result<T, DataSetError> {
        let section = self.layout.section(kind);
        let record_len = kind.record_len().unwrap_or(1);
        let position = section
            .record(index, record_len)
            .ok_or_else(|| DataSetError::not_found(kind.as_str(), index))?;
        self.seek(position)?;
        read(&mut *self.reader).map_err(|err| DataSetError::truncated(kind.as_str(), err))
    }

    pub(crate) fn integer_list(&mut self, kind: PatternSection) -> Result<Vec<u32>, DataSetError> {
        let section = self.layout.section(kind);
        self.seek(section.start)?;
        (0..section.count)
            .map(|_| {
                decode::read_integer(&mut *self.reader)
                    .map_err(|err| DataSetError::truncated(kind.as_str(), err))
            })
            .collect()
    }

    pub(crate) fn component(&mut self, index: u32) -> Result<Component, DataSetError> {
        let raw = self.fixed(PatternSection::Components, index, |r| RawComponent::read(r))?;
        raw.resolve(self)
    }

    pub(crate) fn property(&mut self, index: PropertyIndex) -> Result<Property, DataSetError> {
        let raw = self.fixed(PatternSection::Properties, index.get(), |r| {
            RawProperty::read(r)
        })?;
        raw.resolve(index, self)
    }

    pub(crate) fn value(&mut self, index: ValueIndex) -> Result<Value, DataSetError> {
        let raw = self.fixed(PatternSection::Values, index.get(), |r| RawValue::read(r))?;
        raw.resolve(index, self)
    }

    pub(crate) fn profile(&mut self, index: ProfileIndex) -> Result<Profile, DataSetError> {
        let raw = self.fixed(PatternSection::Profiles, index.get(), |r| RawProfile::read(r))?;
        raw.resolve(index, self)
    }

    pub(crate) fn profile_id(&mut self, index: ProfileIndex) -> Result<u32, DataSetError> {
        let raw = self.fixed(PatternSection::Profiles, index.get(), |r| RawProfile::read(r))?;
        Ok(raw.profile_id)
    }

    pub(crate) fn signature(&mut self, index: SignatureIndex) -> Result<Signature, DataSetError> {
        let raw = self.fixed(PatternSection::Signatures, index.get(), |r| {
            RawSignature::read(r)
        })?;
        raw.resolve(index, self)
    }

    /// Read the node at `offset`, returning it with the offset of the
    /// record that follows it.
    pub(crate) fn node(&mut self, offset: NodeOffset) -> Result<(Node, u32), DataSetError> {
        let section = self.layout.section(PatternSection::Nodes);
        let position = section
            .at_offset(offset.get())
            .ok_or_else(|| DataSetError::not_found("node", offset.get()))?;
        self.seek(position)?;
        let raw = RawNode::read(&mut *self.reader, self.layout.version.stores_ranked_in_pool())
            .map_err(|err| DataSetError::truncated(format!("node {offset}"), err))?;
        let next = self
            .reader
            .stream_position()
            .map_err(DataSetError::Io)?
            .saturating_sub(section.start);
        let next = u32::try_from(next)
            .map_err(|_ignored| DataSetError::parse("nodes", "node section exceeds 4GiB"))?;
        Ok((raw.resolve(offset, self)?, next))
    }

    /// Read the string at `offset`, returning it with the offset of the
    /// string that follows it.
    pub(crate) fn string_with_next(
        &mut self,
        offset: StringOffset,
    ) -> Result<(Arc<[u8]>, u32), DataSetError> {
        let bytes = self.string(offset)?;
        let next = u32::try_from(bytes.len() + 2)
            .map(|len| offset.get() + len)
            .map_err(|_ignored| DataSetError::parse("strings", "string exceeds 4GiB"))?;
        Ok((bytes, next))
    }
}

impl<R: Read + Seek + ?Sized> Resolve for SectionReader<'_, R> {
    fn string(&mut self, offset: StringOffset) -> Result<Arc<[u8]>, DataSetError> {
        let section = self.layout.section(PatternSection::Strings);
        let position = section
            .at_offset(offset.get())
            .ok_or_else(|| DataSetError::not_found("string", offset.get()))?;
        self.seek(position)?;
        let bytes = decode::read_string(&mut *self.reader)
            .map_err(|err| DataSetError::truncated(format!("string at {offset}"), err))?;
        if position + 2 + bytes.len() as u64 > section.end() {
            return Err(DataSetError::parse(
                format!("string at {offset}"),
                "string crosses the end of its section",
            ));
        }
        Ok(bytes)
    }

    fn integers(&mut self, slice: Slice) -> Result<Vec<u32>, DataSetError> {
        let section: Section = self.layout.section(PatternSection::IntegerPool);
        if u64::from(slice.start) + u64::from(slice.count) > u64::from(section.count) {
            return Err(DataSetError::parse(
                "integer pool",
                format!(
                    "slice {}+{} exceeds pool of {}",
                    slice.start, slice.count, section.count
                ),
            ));
        }
        if slice.count == 0 {
            return Ok(Vec::new());
        }
        self.seek(section.start + 4 * u64::from(slice.start))?;
        let mut items = Vec::with_capacity(slice.count as usize);
        for _ in 0..slice.count {
            items.push(
                decode::read_integer(&mut *self.reader)
                    .map_err(|err| DataSetError::truncated("integer pool", err))?,
            );
        }
        Ok(items)
    }
}
