//! Record decoders shared by the memory and stream backends.
//!
//! Records are first read into their raw form, holding plain references.
//! Turning a raw record into an entity resolves its strings and integer
//! pool slices through a [`Resolve`] implementation, so the same reader
//! can be used for the record and the data it refers to.

use crate::{
    entity::{Component, Node, NodeChild, NumericChild, Profile, Property, Signature, Value},
    error::DataSetError,
    index::{
        NodeOffset, ProfileIndex, PropertyIndex, SignatureIndex, StringOffset, ValueIndex,
        optional,
    },
};
use byteorder::{LittleEndian, ReadBytesExt};
use devmatch_core::ComponentKind;
use std::{io::Read, sync::Arc};

pub(crate) const COMPONENT_LEN: u64 = 9;
pub(crate) const PROPERTY_LEN: u64 = 22;
pub(crate) const VALUE_LEN: u64 = 16;
pub(crate) const PROFILE_LEN: u64 = 25;
pub(crate) const SIGNATURE_LEN: u64 = 22;
/// Smallest encoded node: no characters, children or ranked signatures.
pub(crate) const NODE_MIN_LEN: u32 = 18;

pub(crate) const FLAG_MANDATORY: u8 = 0b01;
pub(crate) const FLAG_LIST: u8 = 0b10;

/// Range of integers within the integer pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Slice {
    pub(crate) start: u32,
    pub(crate) count: u32,
}

impl Slice {
    fn read<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            start: reader.read_u32::<LittleEndian>()?,
            count: reader.read_u32::<LittleEndian>()?,
        })
    }
}

/// Access to strings and pooled integers while building entities.
pub(crate) trait Resolve {
    fn string(&mut self, offset: StringOffset) -> Result<Arc<[u8]>, DataSetError>;

    fn integers(&mut self, slice: Slice) -> Result<Vec<u32>, DataSetError>;

    fn text(&mut self, offset: StringOffset) -> Result<Arc<str>, DataSetError> {
        let bytes = self.string(offset)?;
        match std::str::from_utf8(&bytes) {
            Ok(text) => Ok(Arc::from(text)),
            Err(err) => Err(DataSetError::parse(
                format!("string at {offset}"),
                err.to_string(),
            )),
        }
    }
}

pub(crate) fn read_string<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<Arc<[u8]>> {
    let len = reader.read_u16::<LittleEndian>()?;
    let mut bytes = vec![0u8; usize::from(len)];
    reader.read_exact(&mut bytes)?;
    Ok(bytes.into())
}

pub(crate) fn read_integer<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<u32> {
    reader.read_u32::<LittleEndian>()
}

fn component_kind(id: u8, context: &str) -> Result<ComponentKind, DataSetError> {
    ComponentKind::from_id(id)
        .ok_or_else(|| DataSetError::parse(context.to_owned(), format!("unknown component {id}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawComponent {
    pub(crate) id: u8,
    pub(crate) name: u32,
    pub(crate) default_profile: u32,
}

impl RawComponent {
    pub(crate) fn read<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            id: reader.read_u8()?,
            name: reader.read_u32::<LittleEndian>()?,
            default_profile: reader.read_u32::<LittleEndian>()?,
        })
    }

    pub(crate) fn resolve(self, strings: &mut impl Resolve) -> Result<Component, DataSetError> {
        Ok(Component {
            kind: component_kind(self.id, "component")?,
            name: strings.text(StringOffset::new(self.name))?,
            default_profile: ProfileIndex::new(self.default_profile),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawProperty {
    pub(crate) component: u8,
    pub(crate) flags: u8,
    pub(crate) name: u32,
    pub(crate) description: u32,
    pub(crate) default_value: u32,
    pub(crate) first_value: u32,
    pub(crate) value_count: u32,
}

impl RawProperty {
    pub(crate) fn read<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            component: reader.read_u8()?,
            flags: reader.read_u8()?,
            name: reader.read_u32::<LittleEndian>()?,
            description: reader.read_u32::<LittleEndian>()?,
            default_value: reader.read_u32::<LittleEndian>()?,
            first_value: reader.read_u32::<LittleEndian>()?,
            value_count: reader.read_u32::<LittleEndian>()?,
        })
    }

    pub(crate) fn resolve(
        self,
        index: PropertyIndex,
        strings: &mut impl Resolve,
    ) -> Result<Property, DataSetError> {
        let description = match optional(self.description, StringOffset::new) {
            Some(offset) => Some(strings.text(offset)?),
            None => None,
        };
        Ok(Property {
            index,
            name: strings.text(StringOffset::new(self.name))?,
            description,
            component: component_kind(self.component, "property")?,
            mandatory: self.flags & FLAG_MANDATORY != 0,
            list: self.flags & FLAG_LIST != 0,
            default_value: optional(self.default_value, ValueIndex::new),
            first_value: ValueIndex::new(self.first_value),
            value_count: self.value_count,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawValue {
    pub(crate) property: u32,
    pub(crate) name: u32,
    pub(crate) profiles: Slice,
}

impl RawValue {
    pub(crate) fn read<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            property: reader.read_u32::<LittleEndian>()?,
            name: reader.read_u32::<LittleEndian>()?,
            profiles: Slice::read(reader)?,
        })
    }

    pub(crate) fn resolve(
        self,
        index: ValueIndex,
        source: &mut impl Resolve,
    ) -> Result<Value, DataSetError> {
        Ok(Value {
            index,
            property: PropertyIndex::new(self.property),
            name: source.text(StringOffset::new(self.name))?,
            profiles: source
                .integers(self.profiles)?
                .into_iter()
                .map(ProfileIndex::new)
                .collect(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawProfile {
    pub(crate) profile_id: u32,
    pub(crate) component: u8,
    pub(crate) parent: u32,
    pub(crate) values: Slice,
    pub(crate) signatures: Slice,
}

impl RawProfile {
    pub(crate) fn read<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            profile_id: reader.read_u32::<LittleEndian>()?,
            component: reader.read_u8()?,
            parent: reader.read_u32::<LittleEndian>()?,
            values: Slice::read(reader)?,
            signatures: Slice::read(reader)?,
        })
    }

    pub(crate) fn resolve(
        self,
        index: ProfileIndex,
        source: &mut impl Resolve,
    ) -> Result<Profile, DataSetError> {
        Ok(Profile {
            index,
            profile_id: self.profile_id,
            component: component_kind(self.component, "profile")?,
            parent: optional(self.parent, ProfileIndex::new),
            values: source
                .integers(self.values)?
                .into_iter()
                .map(ValueIndex::new)
                .collect(),
            signatures: source
                .integers(self.signatures)?
                .into_iter()
                .map(SignatureIndex::new)
                .collect(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RawSignature {
    pub(crate) rank: u32,
    pub(crate) length: u16,
    pub(crate) nodes: Slice,
    pub(crate) profiles: Slice,
}

impl RawSignature {
    pub(crate) fn read<R: Read + ?Sized>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            rank: reader.read_u32::<LittleEndian>()?,
            length: reader.read_u16::<LittleEndian>()?,
            nodes: Slice::read(reader)?,
            profiles: Slice::read(reader)?,
        })
    }

    pub(crate) fn resolve(
        self,
        index: SignatureIndex,
        source: &mut impl Resolve,
    ) -> Result<Signature, DataSetError> {
        Ok(Signature {
            index,
            rank: self.rank,
            length: self.length,
            nodes: source
                .integers(self.nodes)?
                .into_iter()
                .map(NodeOffset::new)
                .collect(),
            profiles: source
                .integers(self.profiles)?
                .into_iter()
                .map(ProfileIndex::new)
                .collect(),
        })
    }
}

/// Ranked signature indexes of a node, stored inline or in the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawRanked {
    Inline(Vec<u32>),
    Pooled(Slice),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawNode {
    pub(crate) position: i16,
    pub(crate) parent: u32,
    pub(crate) characters: u32,
    pub(crate) ranked: RawRanked,
    pub(crate) children: Vec<NodeChild>,
    pub(crate) numeric_children: Vec<NumericChild>,
}

impl RawNode {
    pub(crate) fn read<R: Read + ?Sized>(reader: &mut R, pooled: bool) -> std::io::Result<Self> {
        let position = reader.read_i16::<LittleEndian>()?;
        let parent = reader.read_u32::<LittleEndian>()?;
        let characters = reader.read_u32::<LittleEndian>()?;
        let children_count = reader.read_u16::<LittleEndian>()?;
        let numeric_count = reader.read_u16::<LittleEndian>()?;

        let ranked = if pooled {
            RawRanked::Pooled(Slice::read(reader)?)
        } else {
            let count = reader.read_u32::<LittleEndian>()?;
            let mut items = Vec::with_capacity(count.min(4096) as usize);
            for _ in 0..count {
                items.push(reader.read_u32::<LittleEndian>()?);
            }
            RawRanked::Inline(items)
        };

        let mut children = Vec::with_capacity(usize::from(children_count));
        for _ in 0..children_count {
            children.push(NodeChild {
                key: reader.read_u8()?,
                node: NodeOffset::new(reader.read_u32::<LittleEndian>()?),
            });
        }
        let mut numeric_children = Vec::with_capacity(usize::from(numeric_count));
        for _ in 0..numeric_count {
            numeric_children.push(NumericChild {
                value: reader.read_u32::<LittleEndian>()?,
                node: NodeOffset::new(reader.read_u32::<LittleEndian>()?),
            });
        }

        Ok(Self {
            position,
            parent,
            characters,
            ranked,
            children,
            numeric_children,
        })
    }

    pub(crate) fn resolve(
        self,
        offset: NodeOffset,
        source: &mut impl Resolve,
    ) -> Result<Node, DataSetError> {
        let characters = match optional(self.characters, StringOffset::new) {
            Some(offset) => Some(source.string(offset)?),
            None => None,
        };
        let ranked_signatures = match self.ranked {
            RawRanked::Inline(items) => items,
            RawRanked::Pooled(slice) => source.integers(slice)?,
        };
        if self.position < 0 {
            return Err(DataSetError::parse(
                format!("node {offset}"),
                format!("negative position {}", self.position),
            ));
        }
        if !self.children.is_sorted_by_key(|child| child.key) {
            return Err(DataSetError::parse(
                format!("node {offset}"),
                "children not sorted by key",
            ));
        }
        Ok(Node {
            offset,
            position: self.position,
            parent: optional(self.parent, NodeOffset::new),
            characters,
            ranked_signatures,
            children: self.children,
            numeric_children: self.numeric_children,
        })
    }
}
