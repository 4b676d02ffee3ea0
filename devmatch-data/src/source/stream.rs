use super::{
    EntitySource, SectionReader,
    pool::{ReadSeek, ReaderFactory, ReaderPool},
};
use crate::{
    entity::{Node, Profile, Signature, Value},
    error::DataSetError,
    format::{PatternLayout, decode::Resolve},
    index::{NodeOffset, ProfileIndex, SignatureIndex, StringOffset, ValueIndex},
};
use std::{sync::Arc, time::Duration};

/// Backend constructing entities on demand from pooled readers.
#[derive(Debug)]
pub(crate) struct StreamSource {
    pool: ReaderPool,
    layout: PatternLayout,
}

impl StreamSource {
    pub(crate) fn new(
        factory: ReaderFactory,
        layout: PatternLayout,
        pool_size: usize,
        pool_timeout: Duration,
    ) -> Self {
        Self {
            pool: ReaderPool::new(factory, pool_size, pool_timeout),
            layout,
        }
    }

    pub(crate) fn pool_size(&self) -> usize {
        self.pool.size()
    }

    pub(crate) fn readers_created(&self) -> usize {
        self.pool.created()
    }

    fn with_reader<T>(
        &self,
        read: impl FnOnce(&mut SectionReader<'_, dyn ReadSeek>) -> Result<T, DataSetError>,
    ) -> Result<T, DataSetError> {
        let mut reader = self.pool.acquire()?;
        let mut section_reader = SectionReader::new(&mut *reader, &self.layout);
        read(&mut section_reader)
    }
}

impl EntitySource for StreamSource {
    fn string(&self, offset: StringOffset) -> Result<Arc<[u8]>, DataSetError> {
        self.with_reader(|reader| reader.string(offset))
    }

    fn node(&self, offset: NodeOffset) -> Result<Arc<Node>, DataSetError> {
        self.with_reader(|reader| reader.node(offset).map(|(node, _next)| Arc::new(node)))
    }

    fn value(&self, index: ValueIndex) -> Result<Arc<Value>, DataSetError> {
        self.with_reader(|reader| reader.value(index).map(Arc::new))
    }

    fn profile(&self, index: ProfileIndex) -> Result<Arc<Profile>, DataSetError> {
        self.with_reader(|reader| reader.profile(index).map(Arc::new))
    }

    fn signature(&self, index: SignatureIndex) -> Result<Arc<Signature>, DataSetError> {
        self.with_reader(|reader| reader.signature(index).map(Arc::new))
    }
}
